mod dfa;
mod syntax_tree;

pub use dfa::Dfa;
pub use dfa::DisplayState;
pub use dfa::State;
pub use syntax_tree::NodeId;
pub use syntax_tree::NodeKind;
pub use syntax_tree::Position;
pub use syntax_tree::PositionSet;
pub use syntax_tree::SyntaxNode;
pub use syntax_tree::SyntaxTree;
pub use syntax_tree::SyntaxTreeInfo;
pub use syntax_tree::TreeError;

use pattern::Pattern;
use pattern::SyntaxError;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    #[error("Malformed pattern: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Malformed syntax tree: {0}")]
    Tree(#[from] TreeError),
    #[error("Pattern needs more than {0} DFA states")]
    TooManyStates(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Upper bound on discovered DFA states. `None` means unbounded.
    pub state_limit: Option<usize>,
}

impl BuildOptions {
    pub fn with_state_limit(self, limit: usize) -> Self {
        Self {
            state_limit: Some(limit),
        }
    }

    fn check_state_count(&self, count: usize) -> Result<(), CompileError> {
        match self.state_limit {
            Some(limit) if count > limit => Err(CompileError::TooManyStates(limit)),
            _ => Ok(()),
        }
    }
}

impl Dfa {
    pub fn from_pattern(pattern: &Pattern, options: &BuildOptions) -> Result<Self, CompileError> {
        let tree = SyntaxTree::from_postfix(pattern.postfix())?;
        let info = SyntaxTreeInfo::new(tree)?;
        Dfa::build(&info, options)
    }
}

pub fn compile(pattern: &str) -> Result<Dfa, CompileError> {
    compile_with(pattern, &BuildOptions::default())
}

pub fn compile_with(pattern: &str, options: &BuildOptions) -> Result<Dfa, CompileError> {
    let pattern = Pattern::from_str(pattern)?;
    Dfa::from_pattern(&pattern, options)
}

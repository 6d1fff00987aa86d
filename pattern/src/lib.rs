mod lexer;
mod normalizer;
mod parser;

pub use lexer::TokenError;
pub use normalizer::normalize;
pub use normalizer::MAX_NORMALIZED_TOKENS;
pub use normalizer::Quantifier;
pub use normalizer::SyntaxError;
pub use parser::augment;
pub use parser::to_postfix;

use log::debug;
use std::fmt;
use std::str::FromStr;

/// An atomic alphabet element.
///
/// Symbols compare by value, so two symbols built from the same character are
/// interchangeable as tree leaves, alphabet members and transition keys. The
/// reserved markers never compare equal to a literal character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Char(char),
    /// The empty string. Only ever produced inside an alternation group.
    Epsilon,
    /// Appended to every pattern; its position marks acceptance.
    EndMarker,
}

impl Symbol {
    pub fn is_end_marker(&self) -> bool {
        matches!(self, Symbol::EndMarker)
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Symbol::Char(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{}", c.escape_debug()),
            Symbol::Epsilon => write!(f, "epsilon"),
            Symbol::EndMarker => write!(f, "#"),
        }
    }
}

/// An element of the normalized, augmented and postfix pattern streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Symbol(Symbol),
    LeftParen,
    RightParen,
    Pipe,
    /// Explicit concatenation, only present after augmentation.
    Concat,
    Star,
}

impl Token {
    /// Operator precedence used by the postfix conversion.
    pub fn precedence(&self) -> u8 {
        match self {
            Token::Star => 3,
            Token::Concat => 2,
            Token::Pipe => 1,
            Token::LeftParen | Token::RightParen | Token::Symbol(_) => 0,
        }
    }

    pub(crate) fn ends_operand(&self) -> bool {
        matches!(self, Token::Symbol(_) | Token::Star | Token::RightParen)
    }

    pub(crate) fn starts_operand(&self) -> bool {
        matches!(self, Token::Symbol(_) | Token::LeftParen)
    }
}

impl From<Symbol> for Token {
    fn from(symbol: Symbol) -> Self {
        Token::Symbol(symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(symbol) => symbol.fmt(f),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Pipe => write!(f, "|"),
            Token::Concat => write!(f, "."),
            Token::Star => write!(f, "*"),
        }
    }
}

/// A compiled pattern: the augmented token stream in postfix order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    postfix: Vec<Token>,
}

impl Pattern {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn postfix(&self) -> &[Token] {
        &self.postfix
    }
}

impl FromStr for Pattern {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s)?;
        debug!("normalized {s:?} into {}", render(&normalized));
        let augmented = augment(normalized);
        let postfix = to_postfix(augmented)?;
        debug!("postfix form of {s:?} is {}", render(&postfix));
        Ok(Pattern {
            source: s.to_string(),
            postfix,
        })
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

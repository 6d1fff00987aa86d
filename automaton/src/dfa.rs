use crate::syntax_tree::PositionSet;
use crate::syntax_tree::SyntaxTreeInfo;
use crate::BuildOptions;
use crate::CompileError;
use log::debug;
use log::trace;
use pattern::Symbol;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

/// A DFA state: the set of leaf positions that may be consumed next.
pub type State = PositionSet;

/// A deterministic automaton built directly from a pattern's syntax tree.
///
/// The transition function is partial: when no position of a state can
/// consume a symbol, the state has no edge for it. Every state stored here is
/// therefore non-empty, and every state has an entry in the transition table,
/// even if it has no outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    alphabets: BTreeSet<Symbol>,
    start_state: State,
    final_states: BTreeSet<State>,
    transitions: BTreeMap<State, BTreeMap<Symbol, State>>,
}

impl Dfa {
    pub fn build(info: &SyntaxTreeInfo, options: &BuildOptions) -> Result<Self, CompileError> {
        let start_state = info.root().firstpos.clone();
        let mut transitions = BTreeMap::from([(start_state.clone(), BTreeMap::new())]);
        options.check_state_count(transitions.len())?;
        let mut final_states = BTreeSet::new();
        let mut unmarked = vec![start_state.clone()];

        while let Some(state) = unmarked.pop() {
            trace!("processing state {}", DisplayState(&state));
            if state.contains(&info.final_state_pos()) {
                final_states.insert(state.clone());
            }

            let mut edges = BTreeMap::new();
            for symbol in info.alphabets() {
                let next: State = info
                    .positions(symbol)
                    .intersection(&state)
                    .flat_map(|position| info.followpos(*position))
                    .copied()
                    .collect();
                if next.is_empty() {
                    continue;
                }
                if !transitions.contains_key(&next) {
                    transitions.insert(next.clone(), BTreeMap::new());
                    options.check_state_count(transitions.len())?;
                    unmarked.push(next.clone());
                }
                edges.insert(symbol.clone(), next);
            }
            transitions.insert(state, edges);
        }

        debug!(
            "built DFA with {} states, {} accepting",
            transitions.len(),
            final_states.len()
        );
        Ok(Self {
            alphabets: info.alphabets().clone(),
            start_state,
            final_states,
            transitions,
        })
    }

    pub fn alphabets(&self) -> &BTreeSet<Symbol> {
        &self.alphabets
    }

    pub fn start_state(&self) -> &State {
        &self.start_state
    }

    pub fn final_states(&self) -> &BTreeSet<State> {
        &self.final_states
    }

    pub fn transitions(&self) -> &BTreeMap<State, BTreeMap<Symbol, State>> {
        &self.transitions
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.transitions.keys()
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_accepting(&self, state: &State) -> bool {
        self.final_states.contains(state)
    }

    /// `None` when `state` is unknown or has no edge on `symbol`.
    pub fn next_state(&self, state: &State, symbol: &Symbol) -> Option<&State> {
        self.transitions.get(state)?.get(symbol)
    }
}

/// Formats a state as `{1, 2, 3}`.
pub struct DisplayState<'a>(pub &'a State);

impl fmt::Display for DisplayState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, position) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{position}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alphabets: Vec<_> = self.alphabets.iter().map(Symbol::to_string).collect();
        writeln!(f, "alphabet: {{{}}}", alphabets.join(", "))?;
        writeln!(f, "start: {}", DisplayState(&self.start_state))?;
        let finals: Vec<_> = self
            .final_states
            .iter()
            .map(|state| DisplayState(state).to_string())
            .collect();
        writeln!(f, "final: [{}]", finals.join(", "))?;
        writeln!(f, "transitions:")?;
        for (from, edges) in &self.transitions {
            for (symbol, to) in edges {
                writeln!(
                    f,
                    "  {} --{}--> {}",
                    DisplayState(from),
                    symbol,
                    DisplayState(to)
                )?;
            }
        }
        Ok(())
    }
}

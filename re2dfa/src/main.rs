use automaton::BuildOptions;
use automaton::Dfa;
use automaton::DisplayState;
use automaton::State;
use clap::Parser;
use colored::Colorize;
use pattern::Pattern;
use std::process::ExitCode;

/// Builds a DFA directly from a regular expression and prints it.
#[derive(Debug, Parser)]
#[clap(version)]
struct Cli {
    #[clap(short = 'E', long = "expression")]
    pattern: Pattern,
    /// Abort when the automaton needs more states than this.
    #[clap(long = "state-limit")]
    state_limit: Option<usize>,
    #[clap(long = "no-color", default_value = "false")]
    no_color: bool,
}

fn format_state(dfa: &Dfa, state: &State) -> String {
    let text = DisplayState(state).to_string();
    if dfa.is_accepting(state) {
        text.green().bold().to_string()
    } else {
        text
    }
}

fn print_dfa(dfa: &Dfa) {
    let alphabets: Vec<_> = dfa.alphabets().iter().map(|s| s.to_string()).collect();
    println!("{} {{{}}}", "alphabet:".bold(), alphabets.join(", "));
    println!("{} {}", "start:".bold(), format_state(dfa, dfa.start_state()));

    let finals: Vec<_> = dfa
        .final_states()
        .iter()
        .map(|state| format_state(dfa, state))
        .collect();
    println!("{} [{}]", "final:".bold(), finals.join(", "));

    println!("{}", "transitions:".bold());
    for (from, edges) in dfa.transitions() {
        for (symbol, to) in edges {
            println!(
                "  {} --{}--> {}",
                format_state(dfa, from),
                symbol.to_string().yellow(),
                format_state(dfa, to)
            );
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let options = BuildOptions {
        state_limit: args.state_limit,
    };
    match Dfa::from_pattern(&args.pattern, &options) {
        Ok(dfa) => {
            print_dfa(&dfa);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!(
                "{} {:?}: {err}",
                "Could not compile".red(),
                args.pattern.source()
            );
            ExitCode::FAILURE
        }
    }
}

use timerdeck_core::Deck;

use crate::session::{print_json, prompt, CliResult, GlobalOpts, Session};

/// Delete every timer and group.
pub fn run(opts: &GlobalOpts, yes: bool) -> CliResult {
    let mut session = Session::open(opts)?;
    let result = execute(&mut session.deck, yes);
    session.close();
    result
}

fn execute(deck: &mut Deck, yes: bool) -> CliResult {
    match deck.clear_all(prompt(yes).as_ref())? {
        Some(event) => print_json(&event),
        None => {
            eprintln!("cancelled");
            Ok(())
        }
    }
}

use clap::Subcommand;
use serde::Serialize;
use timerdeck_core::Deck;

use crate::session::{print_json, prompt, CliResult, GlobalOpts, Session};

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a group ("Group" when no name is given)
    Create { name: Option<String> },
    /// List groups and their members
    List,
    /// Rename a group
    Rename { id: String, name: String },
    /// Delete a group and all of its timers
    Delete {
        id: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Start every timer in a group
    StartAll { id: String },
    /// Pause every timer in a group
    PauseAll { id: String },
    /// Reset every timer in a group
    ResetAll { id: String },
}

#[derive(Serialize)]
struct GroupSummary<'a> {
    group_id: &'a str,
    name: &'a str,
    timer_ids: Vec<String>,
    running: bool,
}

pub fn run(opts: &GlobalOpts, action: GroupAction) -> CliResult {
    let mut session = Session::open(opts)?;
    let result = execute(&mut session.deck, action);
    session.close();
    result
}

fn execute(deck: &mut Deck, action: GroupAction) -> CliResult {
    match action {
        GroupAction::Create { name } => {
            let (_, event) = deck.create_group(name.as_deref())?;
            print_json(&event)?;
        }
        GroupAction::List => {
            let groups: Vec<GroupSummary> = deck
                .groups()
                .map(|g| GroupSummary {
                    group_id: g.id(),
                    name: g.name(),
                    timer_ids: g.timer_ids(),
                    running: g.any_running(),
                })
                .collect();
            print_json(&groups)?;
        }
        GroupAction::Rename { id, name } => {
            print_json(&deck.rename_group(&id, &name)?)?;
        }
        GroupAction::Delete { id, yes } => match deck.delete_group(&id, prompt(yes).as_ref())? {
            Some(event) => print_json(&event)?,
            None => eprintln!("cancelled"),
        },
        GroupAction::StartAll { id } => {
            print_json(&deck.start_all(&id)?)?;
        }
        GroupAction::PauseAll { id } => {
            print_json(&deck.pause_all(&id)?)?;
        }
        GroupAction::ResetAll { id } => {
            print_json(&deck.reset_all(&id)?)?;
        }
    }
    Ok(())
}

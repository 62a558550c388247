//! Line-oriented chat loop.
//!
//! Each line typed on stdin is either a loop command or a chat message. After
//! every turn the loop prints the new transcript entries and, when the
//! content snapshot changed, the cards.

use std::error::Error;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::core::app::App;
use crate::core::message::TranscriptRole;
use crate::core::orchestrator::TurnOutcome;
use crate::ui::cards::render_content;
use crate::ui::display::{ChatState, ContentKind, DisplaySurface, TranscriptEntry};
use crate::utils::logging::LoggingState;

const HELP_TEXT: &str = "Commands:
  /expand <item>   Toggle the full text of a card (product id or season-episode)
  /cards           Show the current cards again
  /help            Show this help
  /quit            Leave the chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    Message(String),
    Expand(String),
    ShowCards,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> LoopCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return LoopCommand::Message(trimmed.to_string());
    };
    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };
    match name {
        "quit" | "exit" => LoopCommand::Quit,
        "help" => LoopCommand::Help,
        "cards" => LoopCommand::ShowCards,
        "expand" if !argument.is_empty() => LoopCommand::Expand(argument.to_string()),
        _ => LoopCommand::Unknown(trimmed.to_string()),
    }
}

/// Toggles the card named by `item` in the active list. Returns a status
/// line for the user.
pub fn toggle_card(surface: &mut DisplaySurface, item: &str) -> String {
    match surface.content().active {
        ContentKind::Products => {
            let Ok(id) = item.trim_start_matches('#').parse::<i64>() else {
                return format!("Not a product id: {item}");
            };
            if !surface.content().products.iter().any(|p| p.id == id) {
                return format!("No product #{id} on screen");
            }
            match surface.toggle_product_expanded(id) {
                true => format!("Expanded product #{id}"),
                false => format!("Collapsed product #{id}"),
            }
        }
        ContentKind::Episodes => {
            let known = surface
                .content()
                .episodes
                .iter()
                .any(|episode| episode.display_key() == item);
            if !known {
                return format!("No episode {item} on screen");
            }
            match surface.toggle_episode_expanded(item) {
                true => format!("Expanded episode {item}"),
                false => format!("Collapsed episode {item}"),
            }
        }
    }
}

/// Error entries already read "Error: ..."; everything else gets its role
/// label.
pub fn format_entry(entry: &TranscriptEntry) -> String {
    match entry.role {
        TranscriptRole::AppError => entry.source.clone(),
        role => format!("{}: {}", role.label(), entry.source.trim_start()),
    }
}

/// Prints every new entry except the user's own input, which is already on
/// the terminal.
pub fn print_new_entries(app: &mut App) {
    for entry in app.take_new_entries() {
        if entry.role != TranscriptRole::User {
            println!("{}\n", format_entry(&entry));
        }
    }
}

/// Greeting shown when the chat starts, with the transcript log status.
pub fn banner(logging: &LoggingState) -> String {
    format!(
        "Wild Kratts assistant. Type a question, or /help for commands.\nTranscript log: {}",
        logging.status_string()
    )
}

pub async fn run_chat(mut app: App) -> Result<(), Box<dyn Error>> {
    eprintln!("{}", banner(&app.logging));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_revision = app.surface.content().revision;

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            LoopCommand::Quit => break,
            LoopCommand::Help => println!("{HELP_TEXT}"),
            LoopCommand::ShowCards => println!("{}", render_content(app.surface.content())),
            LoopCommand::Unknown(command) => println!("Unknown command: {command}"),
            LoopCommand::Expand(item) => {
                println!("{}", toggle_card(&mut app.surface, &item));
                println!("{}", render_content(app.surface.content()));
                shown_revision = app.surface.content().revision;
            }
            LoopCommand::Message(message) => {
                app.surface.set_input_text(&message);
                eprintln!("{}", ChatState::Generating.label());
                match app.submit(&message).await {
                    TurnOutcome::Completed(summary) => {
                        debug!(final_message = ?summary.final_message, "Turn finished")
                    }
                    TurnOutcome::Ignored => continue,
                    TurnOutcome::Rejected => {
                        println!("Still working on the previous message.");
                        continue;
                    }
                }
                print_new_entries(&mut app);
                if app.surface.content().revision != shown_revision {
                    println!("{}", render_content(app.surface.content()));
                    shown_revision = app.surface.content().revision;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Episode, Product};

    #[test]
    fn banner_reports_the_log_status() {
        let logging = LoggingState::new(None).expect("logger");
        assert!(banner(&logging).ends_with("Transcript log: disabled"));
    }

    #[test]
    fn lines_parse_into_commands() {
        assert_eq!(
            parse_command("  Any otter episodes? "),
            LoopCommand::Message("Any otter episodes?".to_string())
        );
        assert_eq!(parse_command("/quit"), LoopCommand::Quit);
        assert_eq!(parse_command("/exit"), LoopCommand::Quit);
        assert_eq!(
            parse_command("/expand  1-3 "),
            LoopCommand::Expand("1-3".to_string())
        );
        assert_eq!(
            parse_command("/expand"),
            LoopCommand::Unknown("/expand".to_string())
        );
    }

    #[test]
    fn toggle_card_targets_the_active_list() {
        let mut surface = DisplaySurface::new();
        surface.display_products(vec![Product {
            id: 12,
            ..Product::default()
        }]);
        assert_eq!(toggle_card(&mut surface, "#12"), "Expanded product #12");
        assert_eq!(toggle_card(&mut surface, "12"), "Collapsed product #12");
        assert_eq!(toggle_card(&mut surface, "13"), "No product #13 on screen");
        assert_eq!(toggle_card(&mut surface, "abc"), "Not a product id: abc");

        surface.display_episodes(vec![Episode {
            season: Some(1),
            broadcast_number: Some(3),
            ..Episode::default()
        }]);
        assert_eq!(toggle_card(&mut surface, "1-3"), "Expanded episode 1-3");
        assert!(surface.content().expanded_episodes.contains("1-3"));
        assert_eq!(toggle_card(&mut surface, "2-1"), "No episode 2-1 on screen");
    }

    #[test]
    fn entries_print_with_role_labels() {
        let entry = TranscriptEntry {
            role: TranscriptRole::AppError,
            source: "Error: quota exceeded".to_string(),
            html: String::new(),
        };
        assert_eq!(format_entry(&entry), "Error: quota exceeded");
        let reply = TranscriptEntry {
            role: TranscriptRole::Assistant,
            source: "\n\nSorry, no data.".to_string(),
            ..entry
        };
        assert_eq!(format_entry(&reply), "Assistant: Sorry, no data.");
    }
}

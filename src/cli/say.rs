//! One-shot "say" command

use std::error::Error;
use std::path::PathBuf;

use crate::core::app::App;
use crate::core::config::defaults::EffectiveConfig;
use crate::core::orchestrator::TurnOutcome;
use crate::ui::cards::render_content;
use crate::ui::chat_loop::print_new_entries;

pub async fn run_say(
    prompt: Vec<String>,
    config: &EffectiveConfig,
    log_file: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: kratts say <prompt>");
        std::process::exit(1);
    }

    let mut app = match App::new(config, log_file).await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    let outcome = app.submit(&prompt).await;
    print_new_entries(&mut app);
    if let TurnOutcome::Completed(summary) = outcome {
        if app.surface.content().revision > 0 {
            println!("{}", render_content(app.surface.content()));
        }
        if summary.failed {
            std::process::exit(1);
        }
    }
    Ok(())
}

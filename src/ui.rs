// UI layer: an interactive menu using `dialoguer`, with an `indicatif`
// progress bar while the service works. All state lives in `Session`; this
// module only collects input and renders what the session reports.

use crate::api::ApiClient;
use crate::file_gate::Candidate;
use crate::job::{JobResult, JobState};
use crate::retriever::DirectorySink;
use crate::session::Session;
use anyhow::Result;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Main interactive menu. Runs a select loop until the user chooses "Exit".
///
/// Note: `Select::interact()` is keyboard-driven: you can use arrow keys
/// and Enter to choose an option.
pub async fn main_menu(mut session: Session, api: &ApiClient, sink: &DirectorySink) -> Result<()> {
    println!("Service: {}", api.config().base_url);
    println!("Downloads go to {}", sink.dir().display());
    loop {
        print_status(&session);
        let items = vec![
            "Select PDF",
            "Remove watermarks",
            "Download result",
            "Check service",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_select(&mut session).await?,
            1 => handle_submit(&session).await?,
            2 => handle_download(&session).await,
            3 => handle_health(api).await,
            4 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Ask for a path and offer it to the gate. An empty answer selects nothing.
async fn handle_select(session: &mut Session) -> Result<()> {
    let raw: String = Input::new()
        .with_prompt("PDF file path (drag a file here, empty to cancel)")
        .allow_empty(true)
        .interact_text()?;
    // Terminals quote dropped paths.
    let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    if raw.is_empty() {
        return Ok(());
    }

    match Candidate::from_path(&PathBuf::from(raw)).await {
        Ok(candidate) => {
            // Rejections are already reported by the gate.
            let _ = session.select(candidate);
        }
        Err(err) => println!("{}", err),
    }
    Ok(())
}

/// Submit the held file while drawing the controller's progress.
async fn handle_submit(session: &Session) -> Result<()> {
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
    )?);
    bar.set_message("Removing watermarks...");

    let mut progress = session.controller().progress_updates();
    let submit = session.submit();
    tokio::pin!(submit);
    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut submit => break outcome,
            changed = progress.changed() => match changed {
                Ok(()) => bar.set_position(*progress.borrow_and_update() as u64),
                Err(_) => break (&mut submit).await,
            },
        }
    };

    bar.set_position(*progress.borrow() as u64);
    bar.finish_and_clear();
    if let Ok(result) = outcome {
        print_result(&result);
    }
    Ok(())
}

async fn handle_download(session: &Session) {
    // Failures are reported through the notifier.
    if let Ok(path) = session.download_latest().await {
        println!("Saved to {}", path.display());
    }
}

async fn handle_health(api: &ApiClient) {
    match api.health().await {
        Ok(health) => println!("Service is {}: {}", health.status, health.message),
        Err(e) => println!("Service check failed: {:#}", e),
    }
}

fn print_status(session: &Session) {
    let file = session
        .selected()
        .map(|f| format!("{} ({} KB)", f.name(), f.size().div_ceil(1024)))
        .unwrap_or_else(|| "none".into());
    let job = match session.state() {
        JobState::Idle => "idle".to_string(),
        JobState::Submitting(p) => format!("processing ({:.0}%)", p),
        JobState::Succeeded(result) if result.artifact().is_some() => {
            "done, ready to download".to_string()
        }
        JobState::Succeeded(_) => "done".to_string(),
        JobState::Failed(reason) => format!("failed: {}", reason),
    };
    println!("\nFile: {}  |  Job: {}", file, job);
}

fn print_result(result: &JobResult) {
    if !result.message.is_empty() {
        println!("{}", result.message);
    }
    let d = &result.details;
    println!(
        "Removed {} elements ({} images, {} links)",
        d.total_removed, d.images_removed, d.links_removed
    );
    if let Some((_, name)) = result.artifact() {
        println!("Output: {}  (choose \"Download result\" to save it)", name);
    }
}

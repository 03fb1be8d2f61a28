// Notification surface: short leveled messages for the user, the CLI
// counterpart of a toast. Components only see the `Notifier` trait so tests
// can record what would have been shown.

use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: &str);
}

/// Prints notifications to stdout, coloured by level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, level: Level, message: &str) {
        match level {
            Level::Success => println!("{} {}", "✔".green(), message.green()),
            Level::Error => println!("{} {}", "✘".red(), message.red()),
            Level::Info => println!("{} {}", "ℹ".cyan(), message.cyan()),
        }
    }
}

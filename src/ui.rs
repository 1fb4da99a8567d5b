//! Seams to the presentation layer: transient notices and yes/no confirmations.
//!
//! Views only talk to [`Notifier`] and [`Confirm`]; the binary plugs in terminal
//! implementations and tests plug in recorders.

use std::future::Future;
use std::io::{BufRead, Write};
use std::time::Duration;

use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short-lived message shown to the user ("Message deleted", "Something went wrong").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub duration: Duration,
}

impl Notice {
    pub fn info(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            duration,
        }
    }

    pub fn error(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
            duration,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// What a destructive action asks before going ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub body: String,
    pub action: String,
}

impl ConfirmPrompt {
    pub fn delete(what: &str) -> Self {
        Self {
            title: format!("Are you sure you want to delete this {}?", what),
            body: "This action cannot be undone.".to_string(),
            action: "Delete".to_string(),
        }
    }
}

pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &ConfirmPrompt) -> impl Future<Output = bool> + Send;
}

/// Prints notices to the terminal and mirrors them into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => {
                info!("notice: {}", notice.text);
                println!("{}", notice.text);
            }
            NoticeLevel::Error => {
                error!("notice: {}", notice.text);
                eprintln!("{}", notice.text);
            }
        }
    }
}

/// Asks on stdin; anything but `y`/`yes` declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        let text = format!("{}\n{}\n{}? [y/N] ", prompt.title, prompt.body, prompt.action);
        let answer = tokio::task::spawn_blocking(move || {
            print!("{}", text);
            let _ = std::io::stdout().flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

/// Always confirms (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        info!("{} (confirmed by --yes)", prompt.title);
        true
    }
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

//! Tracing layer that mirrors warnings and errors into a Telegram chat.

use std::fmt::Write as _;
use std::time::Duration;

use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Telegram rejects messages longer than 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

pub struct ChatLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl ChatLogLayer {
    /// Spawns the sender task; must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            let mut pending: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    line = rx.recv() => match line {
                        Some(line) => pending.push(line),
                        None => {
                            flush(&bot, chat_id, &mut pending).await;
                            break;
                        }
                    },
                    _ = interval.tick() => flush(&bot, chat_id, &mut pending).await,
                }
            }
        });

        Self { tx }
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, pending: &mut Vec<String>) {
    if pending.is_empty() {
        return;
    }
    let text = truncate(&pending.join("\n"));
    pending.clear();
    if let Err(e) = bot.send_message(chat_id, text).await {
        // Logging through tracing here would feed back into this layer.
        eprintln!("Failed to mirror log to Telegram: {e}");
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    out.push_str("...");
    out
}

#[derive(Default)]
struct LineVisitor {
    line: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.line.insert_str(0, value);
        } else {
            let _ = write!(self.line, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.line.insert_str(0, &format!("{value:?}"));
        } else {
            let _ = write!(self.line, " {}={:?}", field.name(), value);
        }
    }
}

fn format_event(event: &Event<'_>) -> Option<String> {
    let prefix = match *event.metadata().level() {
        Level::ERROR => "❌",
        Level::WARN => "⚠️",
        _ => return None,
    };
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);
    Some(format!("{prefix} {}", visitor.line))
}

impl<S: Subscriber> Layer<S> for ChatLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if let Some(line) = format_event(event)
            && self.tx.send(line).is_err()
        {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

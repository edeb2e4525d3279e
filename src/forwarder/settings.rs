//! Per-session forwarding settings and their resolution into a plan.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configured values used when a session has not overridden them.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub batch_size: u32,
    pub delay_seconds: u64,
    pub source_channel: Option<String>,
    pub target_channel: Option<String>,
}

/// Settings collected from chat commands. Every field starts unset and is
/// overwritten by its own command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub batch_size: Option<u32>,
    pub delay_seconds: Option<u64>,
    pub source_channel: Option<String>,
    pub target_channel: Option<String>,
    pub start_message_id: Option<i32>,
    pub end_message_id: Option<i32>,
}

/// Why a forward could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    MissingChannels,
    MissingRange,
    InvertedRange { start: i32, end: i32 },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingChannels => {
                write!(f, "Source and Target channels must be set using /source and /target commands.")
            }
            Self::MissingRange => {
                write!(f, "Start and End message IDs must be set using /start and /end commands.")
            }
            Self::InvertedRange { start, end } => write!(
                f,
                "End message ID ({end}) is lower than start message ID ({start}). Fix the range using /start and /end."
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// Everything a forward job needs, resolved once when the job starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPlan {
    pub source: String,
    pub target: String,
    pub batch_size: u32,
    pub delay: Duration,
    pub start: i32,
    pub end: i32,
}

impl ForwardPlan {
    /// Number of message IDs in the inclusive range.
    pub fn total(&self) -> u32 {
        (i64::from(self.end) - i64::from(self.start) + 1) as u32
    }
}

impl Settings {
    pub fn set_batch_size(&mut self, args: &str) -> String {
        match first_arg::<u32>(args).filter(|n| *n > 0) {
            Some(n) => {
                self.batch_size = Some(n);
                format!("Batch size set to {n}. Now, please set the delay time using /delay <seconds>.")
            }
            None => "Usage: /batchsize <number>".to_string(),
        }
    }

    pub fn set_delay(&mut self, args: &str) -> String {
        match first_arg::<u64>(args) {
            Some(n) => {
                self.delay_seconds = Some(n);
                format!("Delay time set to {n} seconds. Now, please set the source channel using /source <channel_id>.")
            }
            None => "Usage: /delay <seconds>".to_string(),
        }
    }

    pub fn set_source(&mut self, args: &str) -> String {
        match first_arg::<String>(args) {
            Some(channel) => {
                let reply = format!(
                    "Source channel set to {channel}. Now, please set the target channel using /target <channel_id>."
                );
                self.source_channel = Some(channel);
                reply
            }
            None => "Usage: /source <channel_id>".to_string(),
        }
    }

    pub fn set_target(&mut self, args: &str) -> String {
        match first_arg::<String>(args) {
            Some(channel) => {
                let reply = format!(
                    "Target channel set to {channel}. Now, please set the start message ID using /start <message_id>."
                );
                self.target_channel = Some(channel);
                reply
            }
            None => "Usage: /target <channel_id>".to_string(),
        }
    }

    pub fn set_start(&mut self, args: &str) -> String {
        match first_arg::<i32>(args).filter(|n| *n > 0) {
            Some(id) => {
                self.start_message_id = Some(id);
                format!("Start message ID set to {id}. Now, please set the end message ID using /end <message_id>.")
            }
            None => "Usage: /start <message_id>".to_string(),
        }
    }

    pub fn set_end(&mut self, args: &str) -> String {
        match first_arg::<i32>(args).filter(|n| *n > 0) {
            Some(id) => {
                self.end_message_id = Some(id);
                format!(
                    "End message ID set to {id}. Everything is set! Now, you can start forwarding messages using /forward."
                )
            }
            None => "Usage: /end <message_id>".to_string(),
        }
    }

    /// Merge with defaults and validate. Channels are checked before the range.
    pub fn resolve(&self, defaults: &Defaults) -> Result<ForwardPlan, PlanError> {
        let source = self.source_channel.clone().or_else(|| defaults.source_channel.clone());
        let target = self.target_channel.clone().or_else(|| defaults.target_channel.clone());
        let (Some(source), Some(target)) = (source, target) else {
            return Err(PlanError::MissingChannels);
        };

        let (Some(start), Some(end)) = (self.start_message_id, self.end_message_id) else {
            return Err(PlanError::MissingRange);
        };
        if end < start {
            return Err(PlanError::InvertedRange { start, end });
        }

        Ok(ForwardPlan {
            source,
            target,
            batch_size: self.batch_size.unwrap_or(defaults.batch_size).max(1),
            delay: Duration::from_secs(self.delay_seconds.unwrap_or(defaults.delay_seconds)),
            start,
            end,
        })
    }

    /// Human-readable summary of the effective settings.
    pub fn describe(&self, defaults: &Defaults) -> String {
        fn or_unset<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "not set".to_string())
        }

        format!(
            "Batch size: {}\nDelay: {} seconds\nSource channel: {}\nTarget channel: {}\nStart message ID: {}\nEnd message ID: {}",
            self.batch_size.unwrap_or(defaults.batch_size),
            self.delay_seconds.unwrap_or(defaults.delay_seconds),
            or_unset(self.source_channel.as_ref().or(defaults.source_channel.as_ref())),
            or_unset(self.target_channel.as_ref().or(defaults.target_channel.as_ref())),
            or_unset(self.start_message_id),
            or_unset(self.end_message_id),
        )
    }
}

/// Parse the first whitespace-separated token; the rest is ignored.
fn first_arg<T: FromStr>(args: &str) -> Option<T> {
    args.split_whitespace().next()?.parse().ok()
}

//! Per-chat sessions: each chat has its own settings and at most one job.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::info;

use super::job::StopSignal;
use super::settings::{Defaults, ForwardPlan, Settings};

#[derive(Debug, Default)]
struct Session {
    settings: Settings,
    active: Option<StopSignal>,
}

/// A settings command with its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingCommand {
    BatchSize(String),
    Delay(String),
    Source(String),
    Target(String),
    Start(String),
    End(String),
}

/// All chat sessions, keyed by chat ID.
#[derive(Debug, Default)]
pub struct Sessions {
    inner: Mutex<HashMap<i64, Session>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a settings command and return the reply text.
    pub async fn apply(&self, chat_id: i64, command: SettingCommand) -> String {
        let mut sessions = self.inner.lock().await;
        let settings = &mut sessions.entry(chat_id).or_default().settings;
        match command {
            SettingCommand::BatchSize(args) => settings.set_batch_size(&args),
            SettingCommand::Delay(args) => settings.set_delay(&args),
            SettingCommand::Source(args) => settings.set_source(&args),
            SettingCommand::Target(args) => settings.set_target(&args),
            SettingCommand::Start(args) => settings.set_start(&args),
            SettingCommand::End(args) => settings.set_end(&args),
        }
    }

    /// Validate the chat's settings and register a new job.
    ///
    /// On error the returned text is the reply and nothing is registered.
    pub async fn begin_forward(&self, chat_id: i64, defaults: &Defaults) -> Result<(ForwardPlan, StopSignal), String> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.entry(chat_id).or_default();
        if session.active.is_some() {
            return Err("Forwarding is already in progress. Use /stop to interrupt it first.".to_string());
        }

        let plan = session.settings.resolve(defaults).map_err(|e| e.to_string())?;
        let stop = StopSignal::new();
        session.active = Some(stop.clone());
        info!("Chat {chat_id}: forward job registered");
        Ok((plan, stop))
    }

    /// Release the chat's job slot once `stop`'s job has ended.
    pub async fn finish(&self, chat_id: i64, stop: &StopSignal) {
        let mut sessions = self.inner.lock().await;
        if let Some(session) = sessions.get_mut(&chat_id)
            && session.active.as_ref().is_some_and(|a| a.same_job(stop))
        {
            session.active = None;
        }
    }

    /// Signal the chat's running job, if any. Always succeeds.
    pub async fn stop(&self, chat_id: i64) -> String {
        let sessions = self.inner.lock().await;
        if let Some(stop) = sessions.get(&chat_id).and_then(|s| s.active.as_ref()) {
            info!("Chat {chat_id}: stop requested");
            stop.stop();
        }
        "Forwarding has been stopped.".to_string()
    }

    pub async fn is_forwarding(&self, chat_id: i64) -> bool {
        let sessions = self.inner.lock().await;
        sessions.get(&chat_id).is_some_and(|s| s.active.is_some())
    }

    /// Effective settings and job state, for /status.
    pub async fn status(&self, chat_id: i64, defaults: &Defaults) -> String {
        let sessions = self.inner.lock().await;
        let (settings, forwarding) = match sessions.get(&chat_id) {
            Some(s) => (s.settings.clone(), s.active.is_some()),
            None => (Settings::default(), false),
        };
        let state = if forwarding { "running" } else { "idle" };
        format!("{}\nForwarding: {state}", settings.describe(defaults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Defaults {
        Defaults {
            batch_size: 10,
            delay_seconds: 5,
            source_channel: Some("@src".into()),
            target_channel: Some("@dst".into()),
        }
    }

    async fn ready(sessions: &Sessions, chat_id: i64) {
        sessions.apply(chat_id, SettingCommand::Start("1".into())).await;
        sessions.apply(chat_id, SettingCommand::End("3".into())).await;
    }

    #[tokio::test]
    async fn test_stop_without_job() {
        let sessions = Sessions::new();
        assert_eq!(sessions.stop(1).await, "Forwarding has been stopped.");
        assert!(!sessions.is_forwarding(1).await);
    }

    #[tokio::test]
    async fn test_config_error_leaves_session_idle() {
        let sessions = Sessions::new();
        let err = sessions.begin_forward(1, &defaults()).await.unwrap_err();
        assert!(err.contains("/start and /end"));
        assert!(!sessions.is_forwarding(1).await);
    }

    #[tokio::test]
    async fn test_single_job_per_chat() {
        let sessions = Sessions::new();
        ready(&sessions, 1).await;

        let (plan, stop) = sessions.begin_forward(1, &defaults()).await.unwrap();
        assert_eq!(plan.total(), 3);
        assert!(sessions.is_forwarding(1).await);

        let err = sessions.begin_forward(1, &defaults()).await.unwrap_err();
        assert!(err.contains("already in progress"));

        sessions.finish(1, &stop).await;
        assert!(!sessions.is_forwarding(1).await);
        assert!(sessions.begin_forward(1, &defaults()).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_signals_active_job() {
        let sessions = Sessions::new();
        ready(&sessions, 1).await;
        let (_, stop) = sessions.begin_forward(1, &defaults()).await.unwrap();

        sessions.stop(1).await;
        assert!(stop.is_stopped());
    }

    #[tokio::test]
    async fn test_finish_ignores_stale_job() {
        let sessions = Sessions::new();
        ready(&sessions, 1).await;
        let (_, current) = sessions.begin_forward(1, &defaults()).await.unwrap();

        sessions.finish(1, &StopSignal::new()).await;
        assert!(sessions.is_forwarding(1).await);
        sessions.finish(1, &current).await;
        assert!(!sessions.is_forwarding(1).await);
    }

    #[tokio::test]
    async fn test_chats_are_isolated() {
        let sessions = Sessions::new();
        sessions.apply(1, SettingCommand::BatchSize("3".into())).await;
        ready(&sessions, 1).await;
        let (_, stop) = sessions.begin_forward(1, &defaults()).await.unwrap();

        sessions.stop(2).await;
        assert!(!stop.is_stopped());

        let status = sessions.status(2, &defaults()).await;
        assert!(status.contains("Batch size: 10"));
        assert!(status.contains("Forwarding: idle"));

        let status = sessions.status(1, &defaults()).await;
        assert!(status.contains("Batch size: 3"));
        assert!(status.contains("Forwarding: running"));
    }

    #[tokio::test]
    async fn test_settings_persist_between_commands() {
        let sessions = Sessions::new();
        let reply = sessions.apply(1, SettingCommand::Source("@other".into())).await;
        assert!(reply.starts_with("Source channel set to @other."));
        ready(&sessions, 1).await;

        let (plan, _) = sessions.begin_forward(1, &defaults()).await.unwrap();
        assert_eq!(plan.source, "@other");
        assert_eq!(plan.target, "@dst");
    }
}

//! The forward loop: copy a message ID range in batches until done or stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::time::sleep;
use tracing::{info, warn};

use super::channel::ChannelClient;
use super::settings::ForwardPlan;

/// Stop switch for one forward job.
///
/// Cloning shares the same switch. Stopping wakes a job that is sleeping
/// between batches.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// True if both handles control the same job.
    pub fn same_job(&self, other: &StopSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Sleep for `duration` unless stopped first. Returns true if stopped.
    async fn pause(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a stop in between is not missed.
        notified.as_mut().enable();
        if self.is_stopped() {
            return true;
        }
        tokio::select! {
            _ = notified => true,
            _ = sleep(duration) => self.is_stopped(),
        }
    }
}

/// What a running job reports back to the chat that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Progress { forwarded: u32, total: u32 },
    Paused { after: u32, delay: Duration },
    Interrupted { forwarded: u32, total: u32 },
    Finished { forwarded: u32, total: u32 },
}

impl JobEvent {
    /// Text posted to the chat, if the event is user-visible.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Progress { forwarded, total } => Some(format!(
                "Forwarded {forwarded} of {total} messages. {} remaining.",
                total - forwarded
            )),
            Self::Paused { .. } => None,
            Self::Interrupted { .. } => Some("Forwarding has been interrupted.".to_string()),
            Self::Finished { forwarded, .. } => Some(format!(
                "Finished forwarding! A total of {forwarded} messages were forwarded."
            )),
        }
    }
}

/// Copy every message in the plan's range from source to target.
///
/// Failures on individual messages are logged and skipped. Returns the final
/// event, which is also sent on `events`.
pub async fn run<C: ChannelClient>(
    client: &C,
    plan: &ForwardPlan,
    stop: &StopSignal,
    events: &mpsc::UnboundedSender<JobEvent>,
) -> JobEvent {
    let total = plan.total();
    let mut forwarded: u32 = 0;
    info!(
        "Forwarding {} → {}: messages {}..={} ({} total, batch {}, delay {:?})",
        plan.source, plan.target, plan.start, plan.end, total, plan.batch_size, plan.delay
    );

    for message_id in plan.start..=plan.end {
        if stop.is_stopped() {
            info!("Forwarding interrupted before message {message_id} ({forwarded}/{total})");
            return emit(events, JobEvent::Interrupted { forwarded, total });
        }

        let text = match client.fetch_message(&plan.source, message_id).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not copy message {message_id}: {e}");
                continue;
            }
        };
        if let Err(e) = client.send_text(&plan.target, &text).await {
            warn!("Could not copy message {message_id}: {e}");
            continue;
        }

        forwarded += 1;
        emit(events, JobEvent::Progress { forwarded, total });

        if forwarded % plan.batch_size == 0 {
            emit(events, JobEvent::Paused { after: forwarded, delay: plan.delay });
            if stop.pause(plan.delay).await {
                info!("Stop requested during pause after {forwarded} messages");
            }
        }
    }

    info!("Finished forwarding {forwarded}/{total} messages");
    emit(events, JobEvent::Finished { forwarded, total })
}

fn emit(events: &mpsc::UnboundedSender<JobEvent>, event: JobEvent) -> JobEvent {
    // The receiver may be gone if the chat relay died; the job still completes.
    let _ = events.send(event.clone());
    event
}

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Appointment;

const SNAPSHOT_BUFFER: usize = 8;

/// When a subscription re-reads its result set.
pub enum SnapshotTrigger {
    /// Re-read whenever `patient_id` shows up on the change feed.
    Changes {
        patient_id: Uuid,
        changes: broadcast::Receiver<Uuid>,
    },
    /// Re-read on a fixed interval.
    Poll(Duration),
}

impl SnapshotTrigger {
    fn into_waiter(self) -> Waiter {
        match self {
            SnapshotTrigger::Changes { patient_id, changes } => Waiter::Changes { patient_id, changes },
            SnapshotTrigger::Poll(period) => {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                Waiter::Poll { interval, primed: false }
            }
        }
    }
}

enum Waiter {
    Changes {
        patient_id: Uuid,
        changes: broadcast::Receiver<Uuid>,
    },
    Poll {
        interval: tokio::time::Interval,
        primed: bool,
    },
}

impl Waiter {
    /// Resolves when the result set may have changed; `false` once no further
    /// change can arrive.
    async fn wait(&mut self) -> bool {
        match self {
            Waiter::Changes { patient_id, changes } => loop {
                match changes.recv().await {
                    Ok(id) if id == *patient_id => return true,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Change feed lagged by {}, re-reading", skipped);
                        return true;
                    }
                    Err(broadcast::error::RecvError::Closed) => return false,
                }
            },
            Waiter::Poll { interval, primed } => {
                if !*primed {
                    // The first tick completes immediately.
                    interval.tick().await;
                    *primed = true;
                }
                interval.tick().await;
                true
            }
        }
    }
}

/// Live view of a patient's appointments: a sequence of full snapshots, newest
/// first, emitted whenever the set changes. Dropping or cancelling it stops the
/// background reader.
pub struct AppointmentSubscription {
    receiver: mpsc::Receiver<Vec<Appointment>>,
    task: JoinHandle<()>,
}

impl AppointmentSubscription {
    pub fn spawn<F, Fut>(fetch: F, trigger: SnapshotTrigger) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<Appointment>, StoreError>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(SNAPSHOT_BUFFER);
        let mut waiter = trigger.into_waiter();

        let task = tokio::spawn(async move {
            let mut last: Option<Vec<Appointment>> = None;

            loop {
                match fetch().await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            if sender.send(snapshot.clone()).await.is_err() {
                                break;
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => warn!("Snapshot refresh failed: {}", e),
                }

                if sender.is_closed() || !waiter.wait().await {
                    break;
                }
            }

            debug!("Appointment subscription finished");
        });

        Self { receiver, task }
    }

    /// Next snapshot, or `None` once the subscription has ended.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Appointment>> {
        self.receiver.recv().await
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for AppointmentSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Stream for AppointmentSubscription {
    type Item = Vec<Appointment>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

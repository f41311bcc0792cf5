use crate::application::calendar::DayUpdate;
use crate::domain::models::{DayKey, DayStatus, DayStatusMap};
use crate::infrastructure::config::DEFAULT_POLL_INTERVAL_MS;
use crate::infrastructure::document_mapper::decode_day_statuses;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::firestore_client::DocumentStoreClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};

/// Handle to a live document subscription.
///
/// Once [`Subscription::unsubscribe`] returns no further callback runs.
/// Dropping the handle unsubscribes as well.
#[derive(Debug)]
pub struct Subscription {
    active: Arc<Mutex<bool>>,
    resync: Arc<AtomicBool>,
    task: AbortHandle,
}

impl Subscription {
    /// Makes the next successful read emit even if the map has not changed
    /// since the last delivery. Used after local state was rolled back to
    /// something the store may no longer hold.
    pub fn resync(&self) {
        self.resync.store(true, Ordering::SeqCst);
    }

    pub fn unsubscribe(&self) {
        let Ok(mut active) = self.active.lock() else {
            self.task.abort();
            return;
        };
        if !*active {
            return;
        }
        *active = false;
        drop(active);
        self.task.abort();
        tracing::info!("day subscription closed");
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().map(|active| *active).unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub struct DaySyncService<C>
where
    C: DocumentStoreClient,
{
    client: Arc<C>,
    poll_interval: Duration,
}

impl<C> DaySyncService<C>
where
    C: DocumentStoreClient + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Watches the day document. `on_data` receives the full map on the first
    /// read and whenever it changes afterwards; `on_error` is called at most
    /// once, after which the subscription is finished.
    ///
    /// Callbacks run while the delivery gate is held, so they must not call
    /// back into [`Subscription::unsubscribe`].
    pub fn subscribe<D, E>(&self, mut on_data: D, on_error: E) -> Subscription
    where
        D: FnMut(DayStatusMap) + Send + 'static,
        E: FnOnce(InfraError) + Send + 'static,
    {
        let active = Arc::new(Mutex::new(true));
        let gate = Arc::clone(&active);
        let resync = Arc::new(AtomicBool::new(false));
        let resync_requested = Arc::clone(&resync);
        let client = Arc::clone(&self.client);
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_emitted: Option<DayStatusMap> = None;

            loop {
                ticker.tick().await;
                let result = client.get_document().await;

                let Ok(open) = gate.lock() else {
                    return;
                };
                if !*open {
                    return;
                }
                match result {
                    Ok(document) => {
                        let days = document
                            .as_ref()
                            .map(decode_day_statuses)
                            .unwrap_or_default();
                        if resync_requested.swap(false, Ordering::SeqCst) {
                            last_emitted = None;
                        }
                        if last_emitted.as_ref() == Some(&days) {
                            continue;
                        }
                        tracing::debug!(days = days.len(), "day snapshot received");
                        last_emitted = Some(days.clone());
                        on_data(days);
                    }
                    Err(error) => {
                        tracing::error!(error = %error, "day subscription failed");
                        on_error(error);
                        return;
                    }
                }
            }
        });

        tracing::info!(poll_ms = self.poll_interval.as_millis() as u64, "day subscription started");
        Subscription {
            active,
            resync,
            task: task.abort_handle(),
        }
    }

    /// Writes one day. `None` clears it; clearing a day of a document that
    /// does not exist yet succeeds without doing anything.
    pub async fn set_day_status(
        &self,
        key: DayKey,
        status: Option<DayStatus>,
    ) -> Result<(), InfraError> {
        write_day_status(self.client.as_ref(), key, status).await
    }

    /// Issues every update concurrently and succeeds only if all of them do.
    /// On the first failure the remaining writes are left running and the
    /// error is returned.
    pub async fn persist(&self, updates: &[DayUpdate]) -> Result<(), InfraError> {
        let mut writes: JoinSet<Result<(), InfraError>> = JoinSet::new();
        for update in updates.iter().copied() {
            let client = Arc::clone(&self.client);
            writes.spawn(async move {
                write_day_status(client.as_ref(), update.key, update.status).await
            });
        }

        while let Some(joined) = writes.join_next().await {
            let outcome = joined.unwrap_or_else(|error| {
                Err(InfraError::Task(format!("day write task failed: {error}")))
            });
            if let Err(error) = outcome {
                writes.detach_all();
                return Err(error);
            }
        }
        Ok(())
    }
}

async fn write_day_status<C>(
    client: &C,
    key: DayKey,
    status: Option<DayStatus>,
) -> Result<(), InfraError>
where
    C: DocumentStoreClient + ?Sized,
{
    match status {
        Some(status) => client.merge_day(key, status).await,
        None => match client.delete_day(key).await {
            Err(InfraError::DocumentMissing) => {
                tracing::debug!(day = %key, "clear skipped, day document does not exist");
                Ok(())
            }
            other => other,
        },
    }
}

//! Observable medicine list for presentation code.
//!
//! [`MedicineListState`] keeps the latest snapshot of the store in a watch
//! channel that starts out empty. The store subscription only runs while
//! someone observes: the first [`MedicineObserver`] starts it, and once the
//! last one is dropped it is stopped after a grace period unless a new
//! observer shows up first. Writes are spawned onto the runtime and their
//! effect shows up through the next snapshot. Dropping the holder closes the
//! channel, so waiting observers get an error instead of hanging.

use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::constants::DEFAULT_SUBSCRIPTION_GRACE_MS;
use crate::db::DynError;
use crate::medicine::Medicine;
use crate::repository::MedicineRepository;

pub struct MedicineListState {
    inner: Arc<Inner>,
    /// Shared only with the running upstream task, never with observers
    snapshot: Arc<watch::Sender<Vec<Medicine>>>,
}

struct Inner {
    repository: MedicineRepository,
    runtime: Handle,
    grace: Duration,
    sharing: Mutex<Sharing>,
}

#[derive(Default)]
struct Sharing {
    observers: usize,
    /// Bumped on every observe and on every last-observer release; a pending
    /// grace timer only fires if nothing happened since it was armed
    generation: u64,
    upstream: Option<JoinHandle<()>>,
}

impl MedicineListState {
    /// Must be called from within a Tokio runtime
    pub fn new(repository: MedicineRepository) -> Self {
        Self::with_grace(
            repository,
            Duration::from_millis(DEFAULT_SUBSCRIPTION_GRACE_MS),
        )
    }

    /// Must be called from within a Tokio runtime
    pub fn with_grace(repository: MedicineRepository, grace: Duration) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                repository,
                runtime: Handle::current(),
                grace,
                sharing: Mutex::new(Sharing::default()),
            }),
            snapshot: Arc::new(snapshot),
        }
    }

    /// Start observing the list. The observer sees the last known snapshot
    /// right away (empty before the store has answered).
    pub fn observe(&self) -> MedicineObserver {
        // Subscribe before the upstream can publish its first snapshot
        let receiver = self.snapshot.subscribe();
        let mut sharing = self.inner.lock();
        sharing.observers += 1;
        sharing.generation += 1;
        if sharing.upstream.is_none() {
            debug!("Starting medicine list subscription");
            let snapshot = Arc::clone(&self.snapshot);
            sharing.upstream = Some(self.inner.start_upstream(snapshot));
        }
        MedicineObserver {
            receiver,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Last known snapshot without subscribing
    pub fn current(&self) -> Vec<Medicine> {
        self.snapshot.borrow().clone()
    }

    /// Whether the store subscription is currently running
    pub fn is_subscribed(&self) -> bool {
        self.inner
            .lock()
            .upstream
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Save a medicine in the background. The handle may be ignored.
    pub fn add_medicine(&self, medicine: Medicine) -> JoinHandle<Result<i64, DynError>> {
        let repository = self.inner.repository.clone();
        self.inner.runtime.spawn(async move {
            let result = repository.insert_medicine(&medicine).await;
            if let Err(e) = &result {
                error!("Failed to save medicine '{}': {}", medicine.name, e);
            }
            result
        })
    }

    /// Delete a medicine in the background. The handle may be ignored.
    pub fn delete_medicine(&self, medicine: Medicine) -> JoinHandle<Result<u64, DynError>> {
        let repository = self.inner.repository.clone();
        self.inner.runtime.spawn(async move {
            let result = repository.delete_medicine(&medicine).await;
            if let Err(e) = &result {
                error!("Failed to delete medicine {}: {}", medicine.id, e);
            }
            result
        })
    }
}

impl Drop for MedicineListState {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.lock().upstream.take() {
            handle.abort();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Sharing> {
        self.sharing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_upstream(&self, snapshot: Arc<watch::Sender<Vec<Medicine>>>) -> JoinHandle<()> {
        let mut live = self.repository.get_all_medicines();
        self.runtime.spawn(async move {
            loop {
                match live.next().await {
                    Ok(list) => {
                        snapshot.send_replace(list);
                    }
                    // Keep the last good snapshot
                    Err(e) => error!("Failed to refresh medicine list: {}", e),
                }
            }
        })
    }

    fn release(self: &Arc<Self>) {
        let mut sharing = self.lock();
        sharing.observers = sharing.observers.saturating_sub(1);
        if sharing.observers > 0 {
            return;
        }
        sharing.generation += 1;
        let generation = sharing.generation;
        drop(sharing);

        if self.grace.is_zero() {
            self.stop_if_idle(generation);
            return;
        }

        let inner: Weak<Self> = Arc::downgrade(self);
        let grace = self.grace;
        self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(inner) = inner.upgrade() {
                inner.stop_if_idle(generation);
            }
        });
    }

    fn stop_if_idle(&self, generation: u64) {
        let mut sharing = self.lock();
        if sharing.observers == 0 && sharing.generation == generation {
            if let Some(handle) = sharing.upstream.take() {
                debug!("Stopping idle medicine list subscription");
                handle.abort();
            }
        }
    }
}

/// A live view of the medicine list. Dropping it releases the subscription.
pub struct MedicineObserver {
    receiver: watch::Receiver<Vec<Medicine>>,
    inner: Arc<Inner>,
}

impl MedicineObserver {
    /// Latest snapshot
    pub fn current(&self) -> Vec<Medicine> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot. Fails once the list state has been dropped.
    pub async fn changed(&mut self) -> Result<Vec<Medicine>, DynError> {
        self.receiver.changed().await?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one first
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<Vec<Medicine>, DynError>
    where
        F: FnMut(&[Medicine]) -> bool,
    {
        let list = self
            .receiver
            .wait_for(|list| predicate(list.as_slice()))
            .await?;
        Ok(Vec::clone(&list))
    }
}

impl Drop for MedicineObserver {
    fn drop(&mut self) {
        self.inner.release();
    }
}

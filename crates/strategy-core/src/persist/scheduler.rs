//! Trailing-edge debounce of project writes.
//!
//! One cancellable timer per project id. Scheduling a project that already
//! has a timer aborts that timer and starts a fresh one holding the newer
//! snapshot, so only the state after the last edit in a burst is written.
//! Once a timer has fired it leaves the pending map; later edits start a new
//! timer and never cancel the write already in flight.
//!
//! Writes for one project go through that project's lane, an async mutex
//! held for the whole repository call, so they reach the store in the order
//! they were issued and a delete never races a save.

use super::{ProjectRepository, SyncEvent};
use crate::error::Result;
use crate::model::{ProjectId, ProjectState, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::AbortHandle;

struct Pending {
    generation: u64,
    user: UserId,
    project: ProjectState,
    timer: AbortHandle,
}

type PendingMap = Arc<Mutex<HashMap<ProjectId, Pending>>>;
type LaneMap = Arc<Mutex<HashMap<ProjectId, Arc<AsyncMutex<()>>>>>;

pub struct SaveScheduler {
    repository: Arc<dyn ProjectRepository>,
    window: Duration,
    pending: PendingMap,
    lanes: LaneMap,
    generation: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
}

impl SaveScheduler {
    pub fn new(
        repository: Arc<dyn ProjectRepository>,
        window: Duration,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            repository,
            window,
            pending: Arc::new(Mutex::new(HashMap::new())),
            lanes: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            events,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// (Re)start the timer for `project.id` with `project` as the state to
    /// write when it elapses. Must be called from within a Tokio runtime.
    pub fn schedule(&self, user: &UserId, project: ProjectState) {
        let id = project.id.clone();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.remove(&id) {
            previous.timer.abort();
        }
        let task = tokio::spawn(fire_after(
            self.window,
            id.clone(),
            generation,
            self.pending.clone(),
            self.lanes.clone(),
            self.repository.clone(),
            self.events.clone(),
        ));
        pending.insert(
            id,
            Pending {
                generation,
                user: user.clone(),
                project,
                timer: task.abort_handle(),
            },
        );
    }

    /// Drop the pending write for `id`, if any.
    pub fn cancel(&self, id: &ProjectId) -> bool {
        match lock(&self.pending).remove(id) {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Wait until no write for `id` is in flight and hold the lane until the
    /// guard drops. Nothing is written for `id` while the guard is held.
    pub async fn quiesce(&self, id: &ProjectId) -> OwnedMutexGuard<()> {
        lane(&self.lanes, id).lock_owned().await
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_pending(&self, id: &ProjectId) -> bool {
        lock(&self.pending).contains_key(id)
    }

    /// Stop every timer and write its snapshot now, then wait for writes
    /// whose timer had already fired. Returns the first error; the remaining
    /// writes are still attempted.
    pub async fn flush(&self) -> Result<()> {
        let drained: Vec<(ProjectId, Pending)> = lock(&self.pending).drain().collect();
        let mut first_err = None;
        for (id, entry) in drained {
            entry.timer.abort();
            let _turn = self.quiesce(&id).await;
            if let Err(e) = write(
                self.repository.as_ref(),
                &self.events,
                &entry.user,
                &entry.project,
            )
            .await
            {
                first_err.get_or_insert(e);
            }
        }

        let lanes: Vec<_> = lock(&self.lanes).values().cloned().collect();
        for lane in lanes {
            drop(lane.lock().await);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn fire_after(
    window: Duration,
    id: ProjectId,
    generation: u64,
    pending: PendingMap,
    lanes: LaneMap,
    repository: Arc<dyn ProjectRepository>,
    events: broadcast::Sender<SyncEvent>,
) {
    tokio::time::sleep(window).await;

    // Take the lane before claiming the entry: while we wait, a newer
    // schedule or a flush may still replace or drain it.
    let _turn = lane(&lanes, &id).lock_owned().await;
    let entry = {
        let mut map = lock(&pending);
        match map.get(&id) {
            Some(p) if p.generation == generation => map.remove(&id),
            _ => None,
        }
    };
    let Some(entry) = entry else {
        return;
    };
    // Failures are logged and broadcast inside `write`.
    let _ = write(repository.as_ref(), &events, &entry.user, &entry.project).await;
}

pub(super) async fn write(
    repository: &dyn ProjectRepository,
    events: &broadcast::Sender<SyncEvent>,
    user: &UserId,
    project: &ProjectState,
) -> Result<()> {
    match repository.save(user, project).await {
        Ok(()) => {
            tracing::debug!(%user, project = %project.id, store = repository.describe(), "saved project");
            let _ = events.send(SyncEvent::Saved {
                project: project.id.clone(),
            });
            Ok(())
        }
        Err(e) => {
            tracing::warn!(
                %user,
                project = %project.id,
                store = repository.describe(),
                error = %e,
                "project save failed"
            );
            let _ = events.send(SyncEvent::SaveFailed {
                project: project.id.clone(),
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

fn lane(lanes: &LaneMap, id: &ProjectId) -> Arc<AsyncMutex<()>> {
    lock(lanes).entry(id.clone()).or_default().clone()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

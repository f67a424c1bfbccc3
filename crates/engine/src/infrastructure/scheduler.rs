//! One timer for every pending deadline.
//!
//! Challenge expiries and combat-session steps are kept in a min-heap
//! of absolute instants. A single task sleeps until the earliest one and is
//! woken early through [`Notify`] whenever an earlier deadline is added.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tidewatch_domain::{CombatSessionId, ConnectionId};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Something that has to happen at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deadline {
    ChallengeExpiry(ConnectionId),
    SessionActivation(CombatSessionId),
    /// Retry reward distribution for a defeated session.
    SessionResolution(CombatSessionId),
}

/// Receives deadlines as they fall due.
#[async_trait]
pub trait DeadlineHandler: Send + Sync {
    async fn on_deadline(&self, deadline: Deadline);
}

#[derive(Debug)]
struct Entry {
    at: Instant,
    seq: u64,
    deadline: Deadline,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

pub struct DeadlineScheduler {
    heap: Mutex<BinaryHeap<Reverse<Entry>>>,
    seq: AtomicU64,
    wake: Notify,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            wake: Notify::new(),
        }
    }

    pub async fn schedule_at(&self, at: Instant, deadline: Deadline) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.heap.lock().await.push(Reverse(Entry { at, seq, deadline }));
        self.wake.notify_one();
        tracing::trace!(?deadline, "Deadline scheduled");
    }

    pub async fn schedule_after(&self, delay: Duration, deadline: Deadline) {
        self.schedule_at(Instant::now() + delay, deadline).await;
    }

    /// Number of deadlines not yet fired.
    pub async fn pending(&self) -> usize {
        self.heap.lock().await.len()
    }

    async fn pop_due(&self, now: Instant) -> Vec<Deadline> {
        let mut heap = self.heap.lock().await;
        let mut due = Vec::new();
        while heap.peek().is_some_and(|Reverse(entry)| entry.at <= now) {
            if let Some(Reverse(entry)) = heap.pop() {
                due.push(entry.deadline);
            }
        }
        due
    }

    async fn next_at(&self) -> Option<Instant> {
        self.heap.lock().await.peek().map(|Reverse(entry)| entry.at)
    }

    /// Fire deadlines until `cancel` is triggered. Each handler call runs on
    /// its own task so a slow handler never delays the next deadline.
    pub async fn run(self: Arc<Self>, handler: Arc<dyn DeadlineHandler>, cancel: CancellationToken) {
        tracing::info!("Deadline scheduler started");
        loop {
            for deadline in self.pop_due(Instant::now()).await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.on_deadline(deadline).await;
                });
            }

            let next = self.next_at().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = sleep_until(next) => {}
            }
        }
        tracing::info!("Deadline scheduler stopped");
    }
}

impl Default for DeadlineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Recorder(mpsc::UnboundedSender<(Deadline, Instant)>);

    #[async_trait]
    impl DeadlineHandler for Recorder {
        async fn on_deadline(&self, deadline: Deadline) {
            let _ = self.0.send((deadline, Instant::now()));
        }
    }

    fn start() -> (
        Arc<DeadlineScheduler>,
        mpsc::UnboundedReceiver<(Deadline, Instant)>,
        CancellationToken,
    ) {
        let scheduler = Arc::new(DeadlineScheduler::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(
            scheduler
                .clone()
                .run(Arc::new(Recorder(tx)), cancel.clone()),
        );
        (scheduler, rx, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_in_deadline_order() {
        let (scheduler, mut rx, cancel) = start();
        let origin = Instant::now();
        let late = Deadline::ChallengeExpiry(ConnectionId::new());
        let early = Deadline::SessionActivation(CombatSessionId::new());

        scheduler.schedule_after(Duration::from_secs(60), late).await;
        scheduler
            .schedule_after(Duration::from_millis(1500), early)
            .await;

        let (first, first_at) = rx.recv().await.unwrap();
        assert_eq!(first, early);
        assert!(first_at >= origin + Duration::from_millis(1500));

        let (second, second_at) = rx.recv().await.unwrap();
        assert_eq!(second, late);
        assert!(second_at >= origin + Duration::from_secs(60));

        assert_eq!(scheduler.pending().await, 0);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_early() {
        let (scheduler, mut rx, cancel) = start();
        scheduler
            .schedule_after(
                Duration::from_secs(60),
                Deadline::ChallengeExpiry(ConnectionId::new()),
            )
            .await;

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.recv().await.is_some());
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let scheduler = Arc::new(DeadlineScheduler::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            scheduler
                .clone()
                .run(Arc::new(Recorder(tx)), cancel.clone()),
        );
        cancel.cancel();
        task.await.unwrap();
    }
}

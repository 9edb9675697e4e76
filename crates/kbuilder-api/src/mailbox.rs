//! Per-session mailboxes.
//!
//! Every session with pending input gets a bounded `mpsc` mailbox drained by
//! its own worker task. Inputs of one session are handled strictly in
//! arrival order while different sessions run concurrently, so a slow
//! dispatch for one user never stalls the poll loop or other users.
//!
//! Workers retire after a quiet period and are respawned on the next input.
//! They run on a [`TaskTracker`], so waiting on the tracker after
//! [`Mailboxes::close`] also covers input still queued in a mailbox.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

use kbuilder_types::session::SessionId;

/// Buffer size for each session mailbox.
const MAILBOX_BUFFER: usize = 32;

pub struct Mailboxes<E, H> {
    senders: DashMap<SessionId, mpsc::Sender<E>>,
    handler: H,
    idle: Duration,
    tracker: TaskTracker,
}

impl<E, H, Fut> Mailboxes<E, H>
where
    E: Send + 'static,
    H: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// `handler` processes one event; `idle` is how long a worker waits for
    /// more input before retiring. Workers are spawned on `tracker`.
    pub fn new(handler: H, idle: Duration, tracker: TaskTracker) -> Arc<Self> {
        Arc::new(Self {
            senders: DashMap::new(),
            handler,
            idle,
            tracker,
        })
    }

    /// Queue `event` for `session_id`, starting a worker if none is running.
    ///
    /// Waits only when that session's mailbox is full.
    pub async fn deliver(self: &Arc<Self>, session_id: SessionId, event: E) {
        let mut event = event;
        loop {
            // Clone the sender out so no map guard is held across the await.
            let sender = self
                .senders
                .entry(session_id.clone())
                .or_insert_with(|| self.spawn_worker(session_id.clone()))
                .clone();

            match sender.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // The worker retired between lookup and send.
                    self.senders
                        .remove_if(&session_id, |_, current| current.same_channel(&sender));
                    event = returned;
                }
            }
        }
    }

    /// Stop routing input. Each worker handles what is already queued and
    /// then exits.
    pub fn close(&self) {
        self.senders.clear();
    }

    /// Number of sessions with a live worker.
    pub fn active(&self) -> usize {
        self.senders.len()
    }

    fn spawn_worker(self: &Arc<Self>, session_id: SessionId) -> mpsc::Sender<E> {
        let (tx, mut rx) = mpsc::channel(MAILBOX_BUFFER);
        let this = Arc::clone(self);

        self.tracker.spawn(async move {
            tracing::trace!(session = %session_id, "session worker started");
            loop {
                match tokio::time::timeout(this.idle, rx.recv()).await {
                    Ok(Some(event)) => (this.handler)(event).await,
                    Ok(None) => break,
                    Err(_) => {
                        // Refuse new input, finish what already arrived.
                        rx.close();
                        while let Ok(event) = rx.try_recv() {
                            (this.handler)(event).await;
                        }
                        this.senders
                            .remove_if(&session_id, |_, current| current.is_closed());
                        break;
                    }
                }
            }
            tracing::trace!(session = %session_id, "session worker retired");
        });

        tx
    }
}

//! Sync orchestration for the active conversation.
//!
//! [`SyncController`] binds a conversation identity to the transport
//! session, the history fetcher and the reconciler for the lifetime of a
//! chat view. It owns the polling cadence and publishes the merged timeline
//! and a connectivity indicator through `tokio::sync::watch` channels.
//!
//! Polls are serialized: the background loop and focus-driven refreshes all
//! pass through one async gate, so a fetch is never issued while a previous
//! fetch-and-merge is outstanding and snapshots always merge in fetch order.
//! The interval never tightens on failure. Every binding carries an epoch; a
//! fetch that completes after a rebind observes a changed epoch and is
//! discarded before it can touch the new binding's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chat_core::{ConnectionState, Reconciler};
use chat_types::{ConversationId, LocalId, Message, UserId};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::history::HistoryFetcher;
use crate::session::TransportSession;
use crate::transport::{Transport, TransportError};

/// Controller errors. Handled locally by callers; never surfaced to the UI
/// as exceptions.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No conversation is currently bound.
    #[error("no active conversation binding")]
    NotBound,

    /// The message was empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,
}

/// The binding lifecycle of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// No conversation bound; nothing polls, nothing sends.
    Idle,
    /// A binding is being established.
    Binding(ConversationId),
    /// Bound and polling.
    Active(ConversationId),
    /// An old binding is being torn down.
    Rebinding,
}

/// Orchestrates transport, history polling and reconciliation for one
/// conversation at a time.
pub struct SyncController<T: Transport, H: HistoryFetcher + 'static> {
    config: SyncConfig,
    identity: UserId,
    session: TransportSession<T>,
    history: Arc<H>,
    reconciler: Option<Arc<Mutex<Reconciler>>>,
    binding: BindingState,
    epoch: Arc<AtomicU64>,
    poll_gate: Arc<tokio::sync::Mutex<()>>,
    poll_task: Option<JoinHandle<()>>,
    timeline_tx: Arc<watch::Sender<Vec<Message>>>,
    connection_tx: Arc<watch::Sender<ConnectionState>>,
}

impl<T: Transport, H: HistoryFetcher + 'static> SyncController<T, H> {
    /// Create a controller in the `Idle` state.
    pub fn new(config: SyncConfig, identity: UserId, transport: T, history: H) -> Self {
        let (timeline_tx, _) = watch::channel(Vec::new());
        let (connection_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            identity,
            session: TransportSession::new(transport),
            history: Arc::new(history),
            reconciler: None,
            binding: BindingState::Idle,
            epoch: Arc::new(AtomicU64::new(0)),
            poll_gate: Arc::new(tokio::sync::Mutex::new(())),
            poll_task: None,
            timeline_tx: Arc::new(timeline_tx),
            connection_tx: Arc::new(connection_tx),
        }
    }

    /// Subscribe to the published timeline. Receives the full ordered
    /// message sequence on every change.
    pub fn timeline(&self) -> watch::Receiver<Vec<Message>> {
        self.timeline_tx.subscribe()
    }

    /// Subscribe to the connectivity indicator.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_tx.subscribe()
    }

    /// The current binding state.
    pub fn binding_state(&self) -> BindingState {
        self.binding
    }

    /// Bind the controller to a conversation.
    ///
    /// Tears down any previous binding first (the old poll loop is
    /// cancelled and the old session closed before the new binding's first
    /// fetch), opens the session, performs an immediate fetch-and-merge,
    /// then starts the poll loop. Binding the already-active conversation
    /// is a no-op.
    pub async fn bind(&mut self, conversation: ConversationId) {
        if self.binding == BindingState::Active(conversation) {
            return;
        }
        if matches!(self.binding, BindingState::Active(_)) {
            self.binding = BindingState::Rebinding;
        }
        self.teardown().await;

        self.binding = BindingState::Binding(conversation);
        tracing::info!(%conversation, "binding conversation");

        let reconciler = Arc::new(Mutex::new(Reconciler::new(
            conversation,
            self.config.match_tolerance(),
        )));
        self.reconciler = Some(Arc::clone(&reconciler));
        self.timeline_tx.send_replace(Vec::new());

        self.session.open(conversation, self.identity).await;
        self.connection_tx.send_replace(self.session.state());

        let epoch = self.epoch.load(Ordering::SeqCst);
        poll_once(
            &*self.history,
            conversation,
            &self.epoch,
            epoch,
            &self.poll_gate,
            &reconciler,
            &self.timeline_tx,
        )
        .await;

        let history = Arc::clone(&self.history);
        let epoch_counter = Arc::clone(&self.epoch);
        let poll_gate = Arc::clone(&self.poll_gate);
        let timeline_tx = Arc::clone(&self.timeline_tx);
        let period = self.config.poll_interval();
        self.poll_task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                let live = poll_once(
                    &*history,
                    conversation,
                    &epoch_counter,
                    epoch,
                    &poll_gate,
                    &reconciler,
                    &timeline_tx,
                )
                .await;
                if !live {
                    break;
                }
            }
        }));
        self.binding = BindingState::Active(conversation);
    }

    /// Release the current binding: cancel the poll loop, close the
    /// session, and publish an empty timeline. The controller returns to
    /// `Idle`.
    pub async fn unbind(&mut self) {
        if self.binding == BindingState::Idle {
            return;
        }
        self.binding = BindingState::Rebinding;
        self.teardown().await;
        self.reconciler = None;
        self.timeline_tx.send_replace(Vec::new());
        self.connection_tx.send_replace(ConnectionState::Disconnected);
        self.binding = BindingState::Idle;
        tracing::info!("binding released");
    }

    /// Send a message in the active conversation.
    ///
    /// The optimistic append happens synchronously before the transport
    /// send, so the local echo is always published first. `NotConnected`
    /// leaves the entry visible as unconfirmed; a mid-session transport
    /// error additionally flags it `send_failed`. In both cases the entry is
    /// re-resolved against the next poll rather than re-sent automatically.
    pub async fn send_message(&mut self, content: &str) -> Result<LocalId, ControllerError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        let BindingState::Active(conversation) = self.binding else {
            return Err(ControllerError::NotBound);
        };
        let reconciler = self
            .reconciler
            .as_ref()
            .map(Arc::clone)
            .ok_or(ControllerError::NotBound)?;

        let message = Message::optimistic(conversation, self.identity, content, Utc::now());
        let local_id = message.local_id;
        {
            let mut guard = reconciler.lock().unwrap();
            guard.append_optimistic(message);
            self.timeline_tx.send_replace(guard.timeline().snapshot());
        }

        match self.session.send(content).await {
            Ok(()) => {}
            Err(TransportError::NotConnected) => {
                tracing::debug!(%conversation, "send while disconnected; entry stays unconfirmed");
            }
            Err(e) => {
                tracing::warn!(%conversation, error = %e, "transport send failed");
                let mut guard = reconciler.lock().unwrap();
                guard.mark_send_failed(&local_id);
                self.timeline_tx.send_replace(guard.timeline().snapshot());
            }
        }
        self.connection_tx.send_replace(self.session.state());

        Ok(local_id)
    }

    /// Force one immediate serialized poll (e.g. when the view regains
    /// focus). A no-op when no conversation is bound.
    pub async fn poll_now(&self) {
        let BindingState::Active(conversation) = self.binding else {
            return;
        };
        let Some(reconciler) = self.reconciler.as_ref() else {
            return;
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        poll_once(
            &*self.history,
            conversation,
            &self.epoch,
            epoch,
            &self.poll_gate,
            reconciler,
            &self.timeline_tx,
        )
        .await;
    }

    /// Try to re-open the realtime channel for the active binding, e.g. when
    /// the view regains focus after a failed open or a mid-session drop.
    /// A no-op when the channel is already open or nothing is bound.
    pub async fn reconnect(&mut self) {
        let BindingState::Active(conversation) = self.binding else {
            return;
        };
        if self.session.is_open() {
            return;
        }
        self.session.open(conversation, self.identity).await;
        self.connection_tx.send_replace(self.session.state());
    }

    async fn teardown(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.session.close().await;
    }
}

impl<T: Transport, H: HistoryFetcher + 'static> Drop for SyncController<T, H> {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// One fetch-and-merge cycle.
///
/// The gate admits one cycle at a time, so a fetch is never issued while a
/// previous fetch-and-merge is outstanding and an earlier-issued fetch can
/// never merge over a later one. Returns `false` when the binding was
/// superseded (the epoch changed before or during the fetch); the result is
/// then discarded without touching shared state and the caller's loop exits.
/// A fetch error preserves the prior timeline unchanged.
async fn poll_once<H: HistoryFetcher + ?Sized>(
    history: &H,
    conversation: ConversationId,
    epoch_counter: &AtomicU64,
    epoch: u64,
    gate: &tokio::sync::Mutex<()>,
    reconciler: &Mutex<Reconciler>,
    timeline_tx: &watch::Sender<Vec<Message>>,
) -> bool {
    let _permit = gate.lock().await;
    if epoch_counter.load(Ordering::SeqCst) != epoch {
        return false;
    }

    let result = history.fetch(conversation).await;

    if epoch_counter.load(Ordering::SeqCst) != epoch {
        tracing::debug!(%conversation, "discarding stale fetch result");
        return false;
    }

    match result {
        Ok(snapshot) => {
            let timeline = {
                let mut guard = reconciler.lock().unwrap();
                guard.merge(&snapshot);
                guard.timeline().snapshot()
            };
            timeline_tx.send_replace(timeline);
        }
        Err(e) => {
            tracing::debug!(%conversation, error = %e, "history fetch failed; retrying next tick");
        }
    }
    true
}

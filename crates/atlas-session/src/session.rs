//! Chat session: owns the conversation history and drives one query at a time
//!
//! The session is the only writer of the history. `ask()` appends the user
//! message, opens the transport stream, folds decoded events through the
//! [`StreamingMessage`] accumulator, and appends exactly one terminal message
//! (assistant response, error, or cancellation notice). Every mutation queues
//! a best-effort write of the full history to a per-session writer task,
//! which lands the snapshots in mutation order; the in-memory view stays
//! authoritative and the store is eventually consistent with it.

use std::sync::{Arc, atomic::Ordering};

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use atlas_stream::AnalysisEvent;

use crate::{
    error::{Error, Result},
    events::SessionEvent,
    handle::SessionHandle,
    message::{ChatMessage, Conversation},
    store::ConversationStore,
    streaming::StreamingMessage,
    transport::AnalysisTransport,
};

/// Notice appended to history when the user cancels an in-flight query
pub const CANCELLED_NOTICE: &str = "Request was cancelled.";

/// Notice appended to history when the transport or stream fails
pub const TRANSPORT_FAILURE_NOTICE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// A chat session over one conversation
pub struct ChatSession {
    conversation: Conversation,
    transport: Arc<dyn AnalysisTransport>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
    persist_tx: mpsc::UnboundedSender<Conversation>,
}

impl ChatSession {
    /// Open a session, fetching any stored history for the conversation.
    ///
    /// A fetch failure is treated as a fresh conversation (logged, not
    /// surfaced); this mirrors the store being best-effort everywhere else.
    pub async fn open(
        conversation: Conversation,
        transport: Arc<dyn AnalysisTransport>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let (conversation, persisted) =
            match store.fetch(&conversation.user_id, &conversation.id).await {
                Ok(Some(stored)) => (stored, true),
                Ok(None) => (conversation, false),
                Err(e) => {
                    tracing::warn!("Failed to fetch conversation {}: {}", conversation.id, e);
                    (conversation, false)
                }
            };

        let (event_tx, _) = broadcast::channel(256);
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_writer(store, persist_rx, persisted));

        Self {
            conversation,
            transport,
            event_tx,
            handle: SessionHandle::new(),
            persist_tx,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for cancelling from external code
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The ordered message history
    pub fn messages(&self) -> &[ChatMessage] {
        &self.conversation.messages
    }

    /// The conversation aggregate
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Submit a query and drive the response stream to its terminal state.
    ///
    /// Returns `Ok` for every outcome the user sees in the transcript
    /// (completion, service fault, cancellation); returns `Err` only for
    /// transport failures, which are also recorded as an error message.
    pub async fn ask(&mut self, query: &str) -> Result<()> {
        // New token per query so a stale cancel() cannot touch this run.
        *self.handle.cancel.lock() = CancellationToken::new();
        self.handle.is_running.store(true, Ordering::Release);

        let result = self.run_query(query).await;

        self.handle.is_running.store(false, Ordering::Release);
        self.handle.idle_notify.notify_waiters();
        result
    }

    async fn run_query(&mut self, query: &str) -> Result<()> {
        self.append(ChatMessage::user(query));
        let _ = self.event_tx.send(SessionEvent::QueryStart {
            query: query.to_string(),
        });

        let cancel = self.handle.cancel.lock().clone();

        let mut payloads = match self
            .transport
            .analyze(&self.conversation.business_id, query)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Analysis request failed: {}", e);
                self.append_terminal(ChatMessage::error(TRANSPORT_FAILURE_NOTICE));
                return Err(e.into());
            }
        };

        let mut streaming = StreamingMessage::new(query);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Dropping `payloads` aborts the transport read; the
                    // partial steps are discarded, not folded into history.
                    let message = ChatMessage::error(CANCELLED_NOTICE);
                    self.append(message.clone());
                    let _ = self.event_tx.send(SessionEvent::Cancelled { message });
                    return Ok(());
                }
                item = payloads.next() => {
                    let Some(item) = item else {
                        tracing::error!("Stream ended before a terminal event");
                        self.append_terminal(ChatMessage::error(TRANSPORT_FAILURE_NOTICE));
                        return Err(Error::Other(
                            "stream ended before a terminal event".to_string(),
                        ));
                    };

                    let payload = match item {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!("Stream failed: {}", e);
                            self.append_terminal(ChatMessage::error(TRANSPORT_FAILURE_NOTICE));
                            return Err(e.into());
                        }
                    };

                    let event = match AnalysisEvent::parse(&payload) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!("Skipping malformed event payload: {}", e);
                            continue;
                        }
                    };

                    if let Some(message) = streaming.apply(&event) {
                        self.append_terminal(message);
                        return Ok(());
                    }
                    self.emit_progress(&event, &streaming);
                }
            }
        }
    }

    /// Forward a non-terminal event to subscribers
    fn emit_progress(&self, event: &AnalysisEvent, streaming: &StreamingMessage) {
        let session_event = match event {
            AnalysisEvent::Init { total_steps } => Some(SessionEvent::PlanReady {
                total_steps: *total_steps,
            }),
            AnalysisEvent::StepStart {
                step_index,
                instruction,
            } => Some(SessionEvent::StepStart {
                step_index: *step_index,
                instruction: instruction.clone(),
            }),
            AnalysisEvent::StepComplete { .. } | AnalysisEvent::StepError { .. } => streaming
                .steps()
                .last()
                .map(|step| SessionEvent::StepRecorded { step: step.clone() }),
            _ => None,
        };
        if let Some(session_event) = session_event {
            let _ = self.event_tx.send(session_event);
        }
    }

    /// Append a terminal message and notify subscribers
    fn append_terminal(&mut self, message: ChatMessage) {
        self.append(message.clone());
        let _ = self.event_tx.send(SessionEvent::MessageFinal { message });
    }

    /// Append a message to history and schedule persistence.
    ///
    /// History is append-only; entries are never reordered or removed.
    fn append(&mut self, message: ChatMessage) {
        self.conversation.messages.push(message);
        self.conversation.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self.conversation.title = Some(self.conversation.derive_title());
        self.schedule_persist();
    }

    /// Queue the full current history for the persistence writer.
    ///
    /// Fire-and-forget: failures are logged and never roll back the
    /// in-memory history. The writer lands snapshots strictly in queue
    /// order, and each snapshot carries the whole history, so the store
    /// always converges on the latest one.
    fn schedule_persist(&mut self) {
        let _ = self.persist_tx.send(self.conversation.clone());
    }
}

/// Drains queued history snapshots into the store, one at a time.
///
/// A single writer per session keeps writes in mutation order: the update
/// carrying the terminal message can never run before the create of the
/// user message has finished. `created` flips only once the store has
/// accepted a create, so a failed create is retried with the next snapshot
/// instead of issuing updates against a record that does not exist.
async fn persist_writer(
    store: Arc<dyn ConversationStore>,
    mut snapshots: mpsc::UnboundedReceiver<Conversation>,
    mut created: bool,
) {
    while let Some(snapshot) = snapshots.recv().await {
        let result = if created {
            store.update(&snapshot.id, &snapshot.messages).await
        } else {
            match store.create(&snapshot).await {
                Ok(()) => {
                    created = true;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist conversation {}: {}", snapshot.id, e);
        }
    }
}

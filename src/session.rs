//! Asynchronous consumption loop tying a transport to a conversation.
//!
//! ARCHITECTURE
//! ============
//! [`pump`] owns one [`ResponseAssembler`] for one response cycle. It awaits
//! the next chunk, processes it synchronously, and hands a
//! [`TaggedUpdate`] to a sink. The sink decides whether the cycle is still
//! wanted: every update is checked against the conversation's current
//! ticket before it is applied, so a preempted stream can never write into
//! the transcript. The pump stops at the first rejected update.
//!
//! [`ChatSession`] drives the pump in-line for callers that await each
//! exchange. [`spawn_response`] runs it as a tokio task feeding an unbounded
//! channel for callers that must stay responsive while a reply streams. The
//! task cannot see the conversation, so preemption is the caller's move:
//! dropping or cancelling its [`ResponseTask`] aborts the download.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::assembler::{ChunkOutcome, ResponseAssembler};
use crate::client::{ChunkSource, ResponseChunk};
use crate::conversation::{Conversation, ConversationError, MessageId, QuickAction, ResponseTicket};
use crate::sideband::VideoLink;
use crate::transcript::MessageSnapshot;

// =============================================================================
// UPDATES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A chunk produced new text and/or closed a sideband block.
    Chunk(ChunkOutcome),
    /// The stream ended; carries the final message.
    Finished(MessageSnapshot),
    /// The transport failed before delivering anything.
    Failed,
}

/// A [`StreamEvent`] stamped with the cycle that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedUpdate {
    pub ticket: ResponseTicket,
    pub event: StreamEvent,
}

impl TaggedUpdate {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.event, StreamEvent::Finished(_) | StreamEvent::Failed)
    }

    /// Records of a sideband block closed by this update.
    #[must_use]
    pub fn video_links(&self) -> Option<&[VideoLink]> {
        match &self.event {
            StreamEvent::Chunk(outcome) => outcome.video_links.as_deref(),
            _ => None,
        }
    }
}

/// Apply `update` if its ticket is still current. Returns whether it was applied.
pub fn apply_update(conversation: &mut Conversation, update: &TaggedUpdate) -> bool {
    match &update.event {
        StreamEvent::Chunk(outcome) => conversation.apply(update.ticket, outcome),
        StreamEvent::Finished(last) => conversation.complete(update.ticket, last),
        StreamEvent::Failed => conversation.fail(update.ticket),
    }
}

/// What the caller sees after each applied update.
#[derive(Debug)]
pub struct ChatUpdate<'a> {
    pub conversation: &'a Conversation,
    pub ticket: ResponseTicket,
    /// Present when a sideband block just closed.
    pub video_links: Option<&'a [VideoLink]>,
    /// `true` for the last update of the cycle.
    pub done: bool,
}

// =============================================================================
// PUMP
// =============================================================================

/// Stream one response for `message` into `sink`.
///
/// `sink` returns `false` to abandon the cycle; the stream is dropped and no
/// further updates are produced.
pub async fn pump<S, F>(source: &S, ticket: ResponseTicket, message: &str, mut sink: F)
where
    S: ChunkSource + ?Sized,
    F: FnMut(TaggedUpdate) -> bool,
{
    let mut chunks = match source.open(message).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(error = %e, generation = ticket.generation, "chat transport failed");
            sink(TaggedUpdate { ticket, event: StreamEvent::Failed });
            return;
        }
    };

    let mut assembler = ResponseAssembler::new();
    let mut received = false;
    while let Some(item) = chunks.next().await {
        match item {
            Ok(chunk) => {
                received = true;
                let outcome = match chunk {
                    ResponseChunk::Sse(bytes) => assembler.push_bytes(&bytes),
                    ResponseChunk::Answer(answer) => assembler.push_answer(&answer.answer, &answer.video_links),
                };
                if outcome.is_empty() {
                    continue;
                }
                if !sink(TaggedUpdate { ticket, event: StreamEvent::Chunk(outcome) }) {
                    tracing::debug!(generation = ticket.generation, "response abandoned; dropping stream");
                    return;
                }
            }
            Err(e) if !received => {
                tracing::warn!(error = %e, generation = ticket.generation, "chat stream failed before first chunk");
                sink(TaggedUpdate { ticket, event: StreamEvent::Failed });
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, generation = ticket.generation, "chat stream dropped; keeping partial reply");
                break;
            }
        }
    }

    let last = assembler.finish();
    tracing::debug!(generation = ticket.generation, len = last.content.len(), "response complete");
    sink(TaggedUpdate { ticket, event: StreamEvent::Finished(last) });
}

/// A response pumping on its own task. Dropping it aborts the task and
/// releases the transport stream.
#[must_use = "dropping a ResponseTask aborts it"]
#[derive(Debug)]
pub struct ResponseTask {
    ticket: ResponseTicket,
    handle: JoinHandle<()>,
}

impl ResponseTask {
    #[must_use]
    pub fn ticket(&self) -> ResponseTicket {
        self.ticket
    }

    /// Wait for the stream to run to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`JoinError`] if the task panicked or was aborted.
    pub async fn join(mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Abort the task and wait until its stream has been dropped.
    pub async fn cancel(mut self) {
        self.handle.abort();
        if let Err(e) = (&mut self.handle).await {
            if !e.is_cancelled() {
                tracing::warn!(error = %e, generation = self.ticket.generation, "response task failed");
            }
        }
    }
}

impl Drop for ResponseTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run [`pump`] on a tokio task, sending every update to `tx`.
///
/// The task ends early once the receiver is dropped. When a new cycle
/// preempts this one, drop or [`cancel`](ResponseTask::cancel) the returned
/// task; otherwise it keeps reading a body nobody will apply.
pub fn spawn_response<S>(
    source: Arc<S>,
    ticket: ResponseTicket,
    message: String,
    tx: mpsc::UnboundedSender<TaggedUpdate>,
) -> ResponseTask
where
    S: ChunkSource + ?Sized + 'static,
{
    let handle = tokio::spawn(async move {
        pump(source.as_ref(), ticket, &message, |update| tx.send(update).is_ok()).await;
    });
    ResponseTask { ticket, handle }
}

// =============================================================================
// SESSION
// =============================================================================

/// A conversation plus the transport that answers it.
pub struct ChatSession<S: ?Sized> {
    conversation: Conversation,
    source: Arc<S>,
}

impl<S: ChunkSource + ?Sized> ChatSession<S> {
    #[must_use]
    pub fn new(source: Arc<S>, conversation: Conversation) -> Self {
        Self { conversation, source }
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    #[must_use]
    pub fn source(&self) -> Arc<S> {
        Arc::clone(&self.source)
    }

    /// Send `text` and stream the reply, calling `on_update` after every change.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::EmptyInput`] for blank text; nothing is sent.
    pub async fn send(
        &mut self,
        text: &str,
        on_update: impl FnMut(ChatUpdate<'_>),
    ) -> Result<ResponseTicket, ConversationError> {
        let ticket = self.conversation.send_user_message(text)?;
        tracing::info!(generation = ticket.generation, "sending chat message");
        self.drive(ticket, text, on_update).await;
        Ok(ticket)
    }

    /// Send the canned prompt for `action`.
    ///
    /// # Errors
    ///
    /// Same as [`ChatSession::send`].
    pub async fn send_quick_action(
        &mut self,
        action: QuickAction,
        on_update: impl FnMut(ChatUpdate<'_>),
    ) -> Result<ResponseTicket, ConversationError> {
        self.send(action.prompt(), on_update).await
    }

    /// Replace bot reply `id` with a freshly streamed one.
    ///
    /// # Errors
    ///
    /// Propagates [`Conversation::regenerate`] errors; nothing is sent.
    pub async fn regenerate(
        &mut self,
        id: MessageId,
        on_update: impl FnMut(ChatUpdate<'_>),
    ) -> Result<ResponseTicket, ConversationError> {
        let (ticket, prompt) = self.conversation.regenerate(id)?;
        tracing::info!(generation = ticket.generation, "regenerating chat reply");
        self.drive(ticket, &prompt, on_update).await;
        Ok(ticket)
    }

    async fn drive(&mut self, ticket: ResponseTicket, text: &str, mut on_update: impl FnMut(ChatUpdate<'_>)) {
        let conversation = &mut self.conversation;
        let source = self.source.as_ref();
        pump(source, ticket, text, |update| {
            if !apply_update(conversation, &update) {
                return false;
            }
            on_update(ChatUpdate {
                conversation: &*conversation,
                ticket,
                video_links: update.video_links(),
                done: update.is_terminal(),
            });
            true
        })
        .await;
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

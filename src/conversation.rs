//! Conversation state: ordered messages, ratings, saved copies, and the
//! ticket discipline that keeps abandoned responses from touching it.
//!
//! DESIGN
//! ======
//! Messages carry a UUID so they can be located after regeneration or
//! removal shifts positions. Each response cycle is identified by a
//! [`ResponseTicket`]; starting a new cycle bumps the generation and any
//! update presented with an older ticket is dropped. Starting a cycle while
//! another is still open removes the abandoned bot message instead of
//! freezing its partial text into the transcript.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assembler::ChunkOutcome;
use crate::sideband::VideoLink;
use crate::transcript::MessageSnapshot;

pub type MessageId = Uuid;

/// Shown as the bot reply when the transport fails before any chunk arrives.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process that request.";

/// Opening assistant message for a fresh conversation.
pub const GREETING: &str = "Hello! I'm your fitness assistant. I can help you with workout plans, \
meal planning, and gym equipment guidance. What would you like to know?";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversationError {
    /// Input was empty or whitespace only; nothing was sent.
    #[error("message is empty")]
    EmptyInput,

    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    #[error("message {0} is not a bot reply")]
    NotABotMessage(MessageId),

    /// Regeneration found no user message before the reply.
    #[error("no user prompt precedes message {0}")]
    NoOriginatingPrompt(MessageId),

    #[error("unknown quick action: {0}")]
    UnknownQuickAction(String),

    /// The reply is still streaming; only frozen text can be saved.
    #[error("message {0} is still streaming")]
    MessageOpen(MessageId),
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// Feedback direction. A message's rating is `Option<Rating>`; `None` is unrated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub rating: Option<Rating>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub video_links: Vec<VideoLink>,
    /// `true` while the reply is still streaming.
    #[serde(default)]
    pub open: bool,
}

impl Message {
    fn new(role: Role, content: &str, open: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.to_owned(),
            rating: None,
            timestamp: now_ms(),
            video_links: Vec::new(),
            open,
        }
    }
}

/// Frozen copy of a message's text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: Uuid,
    pub message_id: MessageId,
    pub content: String,
    pub saved_at: i64,
}

/// Identifies one response cycle and the bot message it fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResponseTicket {
    pub generation: u64,
    pub message_id: MessageId,
}

// =============================================================================
// QUICK ACTIONS
// =============================================================================

/// Canned prompts offered next to the input box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuickAction {
    Workout,
    Meal,
    Equipment,
}

impl QuickAction {
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Workout => "I need a workout plan",
            Self::Meal => "Help me create a meal plan",
            Self::Equipment => "Guide me through gym equipment",
        }
    }
}

impl FromStr for QuickAction {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workout" => Ok(Self::Workout),
            "meal" => Ok(Self::Meal),
            "equipment" => Ok(Self::Equipment),
            other => Err(ConversationError::UnknownQuickAction(other.to_owned())),
        }
    }
}

// =============================================================================
// CONVERSATION
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    saved: Vec<SavedItem>,
    generation: u64,
    active: Option<ResponseTicket>,
    video_links: Vec<VideoLink>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation opened by the assistant greeting.
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.messages.push(Message::new(Role::Bot, GREETING, false));
        conversation
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn saved(&self) -> &[SavedItem] {
        &self.saved
    }

    /// Video links received during the current (or last) response cycle.
    #[must_use]
    pub fn video_links(&self) -> &[VideoLink] {
        &self.video_links
    }

    /// `true` while a response cycle is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active_ticket(&self) -> Option<ResponseTicket> {
        self.active
    }

    /// Whether updates for `ticket` may still be applied.
    #[must_use]
    pub fn is_current(&self, ticket: ResponseTicket) -> bool {
        self.active == Some(ticket)
    }

    /// Append the user's message and open a bot reply for it.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::EmptyInput`] for blank text; the
    /// conversation is left untouched.
    pub fn send_user_message(&mut self, text: &str) -> Result<ResponseTicket, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        self.abandon_active();
        self.messages.push(Message::new(Role::User, text, false));
        Ok(self.open_reply(self.messages.len()))
    }

    /// Send the canned prompt for `action`.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the prompts are non-empty.
    pub fn send_quick_action(&mut self, action: QuickAction) -> Result<ResponseTicket, ConversationError> {
        self.send_user_message(action.prompt())
    }

    /// Replace bot reply `id` with a fresh reply to the same prompt.
    ///
    /// The new reply takes the removed message's position. Returns the ticket
    /// and the prompt text to re-issue; no user message is added.
    ///
    /// # Errors
    ///
    /// Fails when `id` is unknown, names a user message, or no user message
    /// precedes it. The conversation is unchanged on error.
    pub fn regenerate(&mut self, id: MessageId) -> Result<(ResponseTicket, String), ConversationError> {
        let index = self.position(id)?;
        if self.messages[index].role != Role::Bot {
            return Err(ConversationError::NotABotMessage(id));
        }
        let prompt = self.messages[..index]
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .ok_or(ConversationError::NoOriginatingPrompt(id))?;

        let is_active = self.active.is_some_and(|t| t.message_id == id);
        let mut index = index;
        if is_active {
            self.active = None;
        } else if let Some(removed) = self.abandon_active() {
            if removed < index {
                index -= 1;
            }
        }
        self.messages.remove(index);
        tracing::debug!(%id, "regenerating reply");
        Ok((self.open_reply(index), prompt))
    }

    /// Apply one chunk's outcome. Returns `false` when the ticket is stale.
    pub fn apply(&mut self, ticket: ResponseTicket, outcome: &ChunkOutcome) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "dropping update for abandoned response");
            return false;
        }
        let Some(message) = self.messages.iter_mut().find(|m| m.id == ticket.message_id) else {
            return false;
        };
        if let Some(snapshot) = &outcome.message {
            message.content.clone_from(&snapshot.content);
        }
        if let Some(links) = &outcome.video_links {
            message.video_links.extend(links.iter().cloned());
            self.video_links.extend(links.iter().cloned());
        }
        true
    }

    /// Freeze the reply with its final content. Returns `false` when stale.
    pub fn complete(&mut self, ticket: ResponseTicket, last: &MessageSnapshot) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.active = None;
        let Some(message) = self.messages.iter_mut().find(|m| m.id == ticket.message_id) else {
            return false;
        };
        message.content.clone_from(&last.content);
        message.open = false;
        true
    }

    /// Freeze the reply with [`FALLBACK_REPLY`]. Returns `false` when stale.
    pub fn fail(&mut self, ticket: ResponseTicket) -> bool {
        let fallback = MessageSnapshot { content: FALLBACK_REPLY.to_owned(), open: false };
        self.complete(ticket, &fallback)
    }

    /// Toggle the rating of `id`; the same direction twice clears it.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::UnknownMessage`] for an unknown id.
    pub fn rate(&mut self, id: MessageId, direction: Rating) -> Result<Option<Rating>, ConversationError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ConversationError::UnknownMessage(id))?;
        message.rating = if message.rating == Some(direction) { None } else { Some(direction) };
        Ok(message.rating)
    }

    /// Copy the frozen text of `id` into the saved list.
    ///
    /// Saving the same unchanged text twice returns the existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::UnknownMessage`] for an unknown id and
    /// [`ConversationError::MessageOpen`] while the reply is still streaming.
    pub fn save(&mut self, id: MessageId) -> Result<Uuid, ConversationError> {
        let message = self.message(id).ok_or(ConversationError::UnknownMessage(id))?;
        if message.open {
            return Err(ConversationError::MessageOpen(id));
        }
        if let Some(existing) = self
            .saved
            .iter()
            .find(|s| s.message_id == id && s.content == message.content)
        {
            return Ok(existing.id);
        }
        let item = SavedItem { id: Uuid::new_v4(), message_id: id, content: message.content.clone(), saved_at: now_ms() };
        let saved_id = item.id;
        self.saved.push(item);
        Ok(saved_id)
    }

    /// Remove every saved copy of `id`. Returns how many were removed.
    pub fn unsave(&mut self, id: MessageId) -> usize {
        let before = self.saved.len();
        self.saved.retain(|s| s.message_id != id);
        before - self.saved.len()
    }

    /// Delete a message. Deleting the in-flight reply ends its cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::UnknownMessage`] for an unknown id.
    pub fn remove(&mut self, id: MessageId) -> Result<Message, ConversationError> {
        let index = self.position(id)?;
        if self.active.is_some_and(|t| t.message_id == id) {
            self.active = None;
        }
        Ok(self.messages.remove(index))
    }

    /// Most recent bot reply, if any.
    #[must_use]
    pub fn last_bot_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Bot)
    }

    fn position(&self, id: MessageId) -> Result<usize, ConversationError> {
        self.messages
            .iter()
            .position(|m| m.id == id)
            .ok_or(ConversationError::UnknownMessage(id))
    }

    fn open_reply(&mut self, index: usize) -> ResponseTicket {
        self.generation += 1;
        self.video_links.clear();
        let reply = Message::new(Role::Bot, "", true);
        let ticket = ResponseTicket { generation: self.generation, message_id: reply.id };
        self.messages.insert(index.min(self.messages.len()), reply);
        self.active = Some(ticket);
        ticket
    }

    /// Drop the in-flight reply, if any. Returns the index it occupied.
    fn abandon_active(&mut self) -> Option<usize> {
        let ticket = self.active.take()?;
        let index = self.messages.iter().position(|m| m.id == ticket.message_id)?;
        tracing::debug!(generation = ticket.generation, "abandoning in-flight reply");
        self.messages.remove(index);
        Some(index)
    }
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

//! Transcript accumulator for the bot reply of one request/response cycle.
//!
//! DESIGN
//! ======
//! The producer streams one line of prose per payload with its line breaks
//! stripped. The accumulator restores readable structure with a fixed rule
//! order: markdown block starts (headings, list items, a whole-line emphasis)
//! get a paragraph break, other text is joined to the previous word with a
//! single space.
//!
//! Callers only ever receive owned [`MessageSnapshot`] copies; the open
//! message stays private to the accumulator.

use serde::Serialize;

/// Immutable copy of the open message at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    pub content: String,
    /// `false` once the stream that produced it has ended.
    pub open: bool,
}

#[derive(Debug, Default, Clone)]
struct OpenMessage {
    content: String,
}

/// Builds one bot message from ordinary text payloads.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAccumulator {
    open: Option<OpenMessage>,
}

impl TranscriptAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a message is receiving text.
    #[must_use]
    pub fn has_open_message(&self) -> bool {
        self.open.is_some()
    }

    /// Normalize `text`, append it to the open message (creating one if
    /// needed), and return a snapshot.
    pub fn absorb(&mut self, text: &str) -> MessageSnapshot {
        let message = self.open.get_or_insert_with(OpenMessage::default);
        let prefix = join_prefix(&message.content, text);
        message.content.push_str(prefix);
        message.content.push_str(text);
        MessageSnapshot { content: message.content.clone(), open: true }
    }

    /// Snapshot of the open message without changing it.
    #[must_use]
    pub fn snapshot(&self) -> Option<MessageSnapshot> {
        self.open
            .as_ref()
            .map(|message| MessageSnapshot { content: message.content.clone(), open: true })
    }

    /// Close the open message and return its final state.
    ///
    /// Returns an empty closed snapshot when nothing was absorbed. The next
    /// [`absorb`](Self::absorb) starts a new message.
    pub fn finalize(&mut self) -> MessageSnapshot {
        let content = self.open.take().map(|message| message.content).unwrap_or_default();
        MessageSnapshot { content, open: false }
    }

    /// Drop the open message without publishing it.
    pub fn reset(&mut self) {
        if let Some(message) = self.open.take() {
            tracing::debug!(len = message.content.len(), "discarding open transcript message");
        }
    }
}

/// Separator to insert before `text` given the accumulated `content`.
fn join_prefix(content: &str, text: &str) -> &'static str {
    if content.is_empty() {
        return "";
    }
    if starts_block(text) {
        return "\n\n";
    }
    if !text.is_empty() && !content.ends_with('\n') {
        return " ";
    }
    ""
}

/// Whether `text` opens a markdown block that needs its own paragraph.
#[must_use]
pub fn starts_block(text: &str) -> bool {
    is_heading(text) || text.starts_with("* ") || is_numbered_item(text) || is_emphasis_line(text)
}

fn is_heading(text: &str) -> bool {
    let hashes = text.bytes().take_while(|&b| b == b'#').count();
    (1..=6).contains(&hashes) && text[hashes..].starts_with(' ')
}

fn is_numbered_item(text: &str) -> bool {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && text[digits..].starts_with(". ")
}

fn is_emphasis_line(text: &str) -> bool {
    ["**", "__", "*", "_"].iter().any(|marker| {
        text.len() > marker.len() * 2
            && text.starts_with(marker)
            && text.ends_with(marker)
    })
}

#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;

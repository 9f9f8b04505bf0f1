//! Sideband demultiplexer for video-link blocks embedded in the text stream.
//!
//! DESIGN
//! ======
//! The producer frames a JSON document between two reserved payloads:
//!
//! ```text
//! data: VIDEO_LINKS_START
//! data: [{"exercise":"pushup", ...}]
//! data: VIDEO_LINKS_END
//! ```
//!
//! Interior payloads are concatenated verbatim and decoded only when the end
//! sentinel arrives, so the caller sees either a whole block or nothing.
//! Decoding failures and unterminated blocks degrade to "no records".

use serde::{Deserialize, Serialize};

/// Payload that opens a sideband block.
pub const VIDEO_LINKS_START: &str = "VIDEO_LINKS_START";

/// Payload that closes a sideband block.
pub const VIDEO_LINKS_END: &str = "VIDEO_LINKS_END";

/// One exercise demonstration record carried in a sideband block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    /// Exercise name, e.g. `"pushup"`.
    pub exercise: String,
    /// Difficulty label, e.g. `"easy"`.
    pub difficulty: String,
    /// Full-length video reference.
    pub video_url: String,
    /// Short-form video reference.
    pub short_url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    Collecting,
}

/// Result of routing one payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Demuxed {
    /// Ordinary prose to hand to the transcript.
    pub emit: Option<String>,
    /// Records of a block that just closed (empty when the block was malformed).
    pub sideband_ready: Option<Vec<VideoLink>>,
}

/// Two-state router separating prose payloads from sideband blocks.
#[derive(Debug, Default, Clone)]
pub struct SidebandDemultiplexer {
    mode: Mode,
    buffer: String,
}

impl SidebandDemultiplexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a block has been opened but not yet closed.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.mode == Mode::Collecting
    }

    /// Route one payload.
    pub fn process(&mut self, payload: &str) -> Demuxed {
        match (self.mode, payload) {
            (Mode::Normal, VIDEO_LINKS_START) => {
                self.mode = Mode::Collecting;
                self.buffer.clear();
                Demuxed::default()
            }
            (Mode::Collecting, VIDEO_LINKS_START) => {
                tracing::debug!(discarded = self.buffer.len(), "sideband block reopened before close");
                self.buffer.clear();
                Demuxed::default()
            }
            (Mode::Collecting, VIDEO_LINKS_END) => {
                self.mode = Mode::Normal;
                let raw = std::mem::take(&mut self.buffer);
                Demuxed { emit: None, sideband_ready: Some(decode_block(&raw)) }
            }
            (Mode::Normal, VIDEO_LINKS_END) => {
                tracing::debug!("ignoring sideband close without open");
                Demuxed::default()
            }
            (Mode::Collecting, interior) => {
                self.buffer.push_str(interior);
                Demuxed::default()
            }
            (Mode::Normal, text) => Demuxed { emit: Some(text.to_owned()), sideband_ready: None },
        }
    }

    /// End of stream. Drops any unterminated block; returns `true` if one was dropped.
    pub fn finish(&mut self) -> bool {
        let was_collecting = self.is_collecting();
        if was_collecting {
            tracing::debug!(discarded = self.buffer.len(), "dropping unterminated sideband block");
        }
        self.reset();
        was_collecting
    }

    /// Return to `Normal` with an empty buffer.
    pub fn reset(&mut self) {
        self.mode = Mode::Normal;
        self.buffer.clear();
    }
}

/// Decode a concatenated block interior. Malformed input yields no records.
#[must_use]
pub fn decode_block(raw: &str) -> Vec<VideoLink> {
    match serde_json::from_str::<Vec<VideoLink>>(raw) {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!(error = %e, len = raw.len(), "malformed video link block");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "sideband_test.rs"]
mod tests;

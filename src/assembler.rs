//! Per-response pipeline: chunk decoder → sideband demultiplexer → transcript.
//!
//! One [`ResponseAssembler`] is scoped to one request/response cycle. Every
//! chunk is processed synchronously to completion, so payload side effects
//! land in exactly the order the payloads appear.

use crate::sideband::{SidebandDemultiplexer, VideoLink};
use crate::sse::ChunkDecoder;
use crate::transcript::{MessageSnapshot, TranscriptAccumulator};

/// What one chunk changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Latest message state, present when the chunk carried ordinary text.
    pub message: Option<MessageSnapshot>,
    /// Records of every sideband block the chunk closed, in order.
    pub video_links: Option<Vec<VideoLink>>,
}

impl ChunkOutcome {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.video_links.is_none()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResponseAssembler {
    decoder: ChunkDecoder,
    demux: SidebandDemultiplexer,
    transcript: TranscriptAccumulator,
}

impl ResponseAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one text chunk.
    pub fn push_chunk(&mut self, chunk: &str) -> ChunkOutcome {
        let payloads = self.decoder.decode(chunk);
        self.route(payloads)
    }

    /// Process one raw byte chunk (UTF-8, possibly split mid-character).
    pub fn push_bytes(&mut self, bytes: &[u8]) -> ChunkOutcome {
        let payloads = self.decoder.decode_bytes(bytes);
        self.route(payloads)
    }

    /// Route an already de-framed payload, bypassing the SSE decoder.
    pub fn push_payload(&mut self, payload: &str) -> ChunkOutcome {
        self.route(vec![payload.to_owned()])
    }

    /// Absorb a complete answer delivered outside SSE framing.
    ///
    /// Lines go straight to the transcript and `links` straight to the
    /// outcome; nothing passes the sideband demultiplexer, so a prose line
    /// that happens to equal a sentinel stays prose.
    pub fn push_answer(&mut self, answer: &str, links: &[VideoLink]) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();
        if !links.is_empty() {
            outcome.video_links = Some(links.to_vec());
        }
        for line in answer.split('\n') {
            outcome.message = Some(self.transcript.absorb(line));
        }
        outcome
    }

    /// End of stream: drop unterminated state and close the message.
    pub fn finish(&mut self) -> MessageSnapshot {
        self.decoder.finish();
        self.demux.finish();
        self.transcript.finalize()
    }

    /// Discard all transient state without publishing anything.
    pub fn reset(&mut self) {
        self.decoder = ChunkDecoder::new();
        self.demux.reset();
        self.transcript.reset();
    }

    fn route(&mut self, payloads: Vec<String>) -> ChunkOutcome {
        let mut outcome = ChunkOutcome::default();
        for payload in payloads {
            let demuxed = self.demux.process(&payload);
            if let Some(text) = demuxed.emit {
                outcome.message = Some(self.transcript.absorb(&text));
            }
            if let Some(links) = demuxed.sideband_ready {
                outcome.video_links.get_or_insert_with(Vec::new).extend(links);
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "assembler_test.rs"]
mod tests;

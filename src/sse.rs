//! Server-sent event de-framing.
//!
//! DESIGN
//! ======
//! The transport hands over arbitrary fragments of an SSE body. Records are
//! separated by a blank line (`"\n\n"`), and a record only becomes a line
//! once its separator has fully arrived, so the unterminated tail is carried
//! into the next call. Only `data: ` records are forwarded, prefix stripped.
//!
//! Byte input additionally carries an incomplete trailing UTF-8 sequence so a
//! multi-byte character split across chunks decodes the same as if it had
//! arrived whole.

/// Separator between two SSE records.
pub const RECORD_SEPARATOR: &str = "\n\n";

/// Prefix every meaningful record starts with.
pub const DATA_PREFIX: &str = "data: ";

/// Incremental SSE record splitter.
#[derive(Debug, Default, Clone)]
pub struct ChunkDecoder {
    carry: String,
    pending_bytes: Vec<u8>,
}

impl ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one text chunk; returns the payloads of every record completed by it.
    pub fn decode(&mut self, chunk: &str) -> Vec<String> {
        let (lines, carry) = split_records(chunk, &self.carry);
        self.carry = carry;
        lines
    }

    /// Feed one raw byte chunk.
    ///
    /// A multi-byte character cut at the end of `bytes` is held back until the
    /// next call. Invalid sequences are replaced with U+FFFD.
    pub fn decode_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending_bytes.extend_from_slice(bytes);
        let text = take_utf8_prefix(&mut self.pending_bytes);
        self.decode(&text)
    }

    /// Text received after the last complete record.
    #[must_use]
    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// End of stream. Returns the length of the unterminated tail that was dropped.
    pub fn finish(&mut self) -> usize {
        let mut dropped = self.carry.len();
        if !self.pending_bytes.is_empty() {
            dropped += self.pending_bytes.len();
            self.pending_bytes.clear();
        }
        if dropped > 0 {
            tracing::debug!(dropped, "discarding unterminated SSE record at end of stream");
        }
        self.carry.clear();
        dropped
    }
}

/// Split `carry + chunk` into complete payloads and the new carry.
///
/// Segments not starting with [`DATA_PREFIX`] are discarded.
#[must_use]
pub fn split_records(chunk: &str, carry: &str) -> (Vec<String>, String) {
    let mut input = String::with_capacity(carry.len() + chunk.len());
    input.push_str(carry);
    input.push_str(chunk);

    let mut segments: Vec<&str> = input.split(RECORD_SEPARATOR).collect();
    // `split` always yields at least one segment; the last one is incomplete.
    let new_carry = segments.pop().unwrap_or_default().to_owned();

    let lines = segments
        .into_iter()
        .filter_map(|segment| segment.strip_prefix(DATA_PREFIX))
        .map(ToOwned::to_owned)
        .collect();

    (lines, new_carry)
}

/// Drain the longest decodable prefix of `buf`, leaving an incomplete
/// trailing sequence in place.
fn take_utf8_prefix(buf: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut start = 0;
    loop {
        match std::str::from_utf8(&buf[start..]) {
            Ok(valid) => {
                out.push_str(valid);
                start = buf.len();
                break;
            }
            Err(err) => {
                let valid_end = start + err.valid_up_to();
                out.push_str(std::str::from_utf8(&buf[start..valid_end]).unwrap_or_default());
                match err.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + bad;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }
    buf.drain(..start);
    out
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;

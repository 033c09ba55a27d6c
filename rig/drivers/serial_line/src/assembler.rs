use rig_traits::ReadError;

/// Largest line the rig sensors are expected to emit, plus slack.
pub const DEFAULT_MAX_LINE: usize = 4096;

/// Accumulates raw port bytes and hands back complete lines.
///
/// Lines end at `\n`; a `\r` right before it is dropped. Bytes after the last
/// terminator stay buffered for the next call.
#[derive(Debug)]
pub struct LineAssembler {
    pending: Vec<u8>,
    max_line: usize,
}

impl LineAssembler {
    pub fn new(max_line: Option<usize>) -> Self {
        let max_line = max_line.unwrap_or(DEFAULT_MAX_LINE);
        LineAssembler {
            pending: Vec::with_capacity(max_line.min(DEFAULT_MAX_LINE)),
            max_line,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pops the next complete line, if one is buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A line longer than the
    /// limit, terminated or not, is discarded and reported once as
    /// [`ReadError::Overflow`].
    pub fn next_line(&mut self) -> Result<Option<String>, ReadError> {
        let Some(end) = self.pending.iter().position(|&b| b == b'\n') else {
            if self.pending.len() > self.max_line {
                self.pending.clear();
                return Err(ReadError::Overflow { limit: self.max_line });
            }
            return Ok(None);
        };

        let mut raw: Vec<u8> = self.pending.drain(..=end).collect();
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        if raw.len() > self.max_line {
            return Err(ReadError::Overflow { limit: self.max_line });
        }

        String::from_utf8(raw)
            .map(Some)
            .map_err(|e| ReadError::Malformed(format!("invalid UTF-8: {}", e.utf8_error())))
    }
}

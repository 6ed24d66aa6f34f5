// ── Incremental UTF-8 decoding ────────────────────────────────────────────────
//
// The output pipe is read in fixed-size chunks, so a multi-byte character can
// straddle two reads.  `Utf8Stream` holds back an incomplete trailing
// sequence until the next chunk completes it.

/// Stateful UTF-8 decoder for a byte stream delivered in arbitrary pieces.
#[derive(Debug, Default)]
pub(crate) struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    /// Decode as much of `pending + bytes` as possible.
    ///
    /// Invalid sequences become U+FFFD; an incomplete sequence at the end is
    /// kept for the next call.
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is left at end of stream.
    pub(crate) fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        let mut d = Utf8Stream::default();
        assert_eq!(d.decode(b"hello\n"), "hello\n");
        assert_eq!(d.finish(), "");
    }

    #[test]
    fn split_multibyte_char_is_reassembled() {
        // "é" is C3 A9.
        let mut d = Utf8Stream::default();
        assert_eq!(d.decode(b"caf\xC3"), "caf");
        assert_eq!(d.decode(b"\xA9!"), "\u{e9}!");
    }

    #[test]
    fn four_byte_char_across_three_chunks() {
        // U+1F600 is F0 9F 98 80.
        let mut d = Utf8Stream::default();
        assert_eq!(d.decode(b"\xF0\x9F"), "");
        assert_eq!(d.decode(b"\x98"), "");
        assert_eq!(d.decode(b"\x80"), "\u{1F600}");
    }

    #[test]
    fn invalid_bytes_become_replacement() {
        let mut d = Utf8Stream::default();
        assert_eq!(d.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_flushed_lossily() {
        let mut d = Utf8Stream::default();
        assert_eq!(d.decode(b"x\xE2\x82"), "x");
        assert_eq!(d.finish(), "\u{FFFD}");
    }
}

use super::Tokenizer;
use crate::error::{AudiometaError, Result};
use std::collections::VecDeque;
use std::io::Read;

/// Forward-only tokenizer over a plain [`Read`]. `peek` is backed by a
/// lookahead buffer bounded by the largest peek actually requested so far
/// (spec.md §4.1: "skip must not require buffering beyond a small fixed
/// window"); `skip` drains the lookahead first, then discards the rest
/// directly from the reader without materializing it.
pub struct StreamTokenizer<R> {
    inner: R,
    lookahead: VecDeque<u8>,
    pos: u64,
    size_hint: Option<u64>,
    eof: bool,
}

impl<R: Read> StreamTokenizer<R> {
    pub fn new(inner: R) -> Self {
        StreamTokenizer {
            inner,
            lookahead: VecDeque::new(),
            pos: 0,
            size_hint: None,
            eof: false,
        }
    }

    pub fn with_size_hint(inner: R, size: u64) -> Self {
        let mut t = Self::new(inner);
        t.size_hint = Some(size);
        t
    }

    fn fill(&mut self, want: usize) -> Result<()> {
        while self.lookahead.len() < want && !self.eof {
            let mut buf = [0u8; 4096];
            let n = self.inner.read(&mut buf)?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.lookahead.extend(&buf[..n]);
        }
        Ok(())
    }
}

impl<R: Read> Tokenizer for StreamTokenizer<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> Option<u64> {
        self.size_hint
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.fill(len)?;
        if self.lookahead.len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        let out: Vec<u8> = self.lookahead.drain(..len).collect();
        self.pos += len as u64;
        Ok(out)
    }

    fn peek_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.fill(len)?;
        if self.lookahead.len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        Ok(self.lookahead.iter().take(len).copied().collect())
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        let from_lookahead = (len as usize).min(self.lookahead.len());
        self.lookahead.drain(..from_lookahead);
        let mut remaining = len - from_lookahead as u64;
        let mut sink_buf = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(sink_buf.len() as u64) as usize;
            let n = self.inner.read(&mut sink_buf[..chunk])?;
            if n == 0 {
                return Err(AudiometaError::EndOfStream);
            }
            remaining -= n as u64;
        }
        self.pos += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn peek_then_read_agree() {
        let mut t = StreamTokenizer::new(Cursor::new(vec![1, 2, 3, 4, 5]));
        assert_eq!(t.peek_bytes(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(t.read_bytes(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(t.position(), 3);
    }

    #[test]
    fn skip_advances_without_buffering_everything() {
        let mut t = StreamTokenizer::new(Cursor::new(vec![0u8; 10_000]));
        t.skip(9_000).unwrap();
        assert_eq!(t.position(), 9_000);
        assert!(t.read_bytes(1000).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn short_stream_is_end_of_stream() {
        let mut t = StreamTokenizer::new(Cursor::new(vec![1, 2]));
        assert!(matches!(t.read_bytes(5), Err(AudiometaError::EndOfStream)));
    }
}

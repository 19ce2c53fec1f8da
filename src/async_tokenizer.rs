//! Async mirror of [`crate::tokenizer::StreamTokenizer`], gated behind the
//! `async` feature exactly as the teacher pairs every sync `Decode` impl
//! with an `#[cfg(feature = "async")]` async twin (spec.md §5: "it yields
//! to the host scheduler when the underlying source is asynchronous").
//!
//! This only extends the tokenizer layer. Container parsers are written
//! once against the sync [`Tokenizer`](crate::tokenizer::Tokenizer) trait;
//! an async caller drains an [`AsyncStreamTokenizer`] into an owned buffer
//! with [`AsyncStreamTokenizer::read_to_end`] and then calls
//! [`crate::parse_from_buffer`] synchronously. Full per-container-parser
//! suspension was out of scope for this crate's "stream adapters are an
//! external collaborator" non-goal (spec.md §1, see DESIGN.md).

use crate::error::{AudiometaError, Result};
use byteorder::{BigEndian, ByteOrder};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

pub struct AsyncStreamTokenizer<R> {
    inner: R,
    lookahead: VecDeque<u8>,
    pos: u64,
    size_hint: Option<u64>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> AsyncStreamTokenizer<R> {
    pub fn new(inner: R) -> Self {
        AsyncStreamTokenizer {
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

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn size(&self) -> Option<u64> {
        self.size_hint
    }

    async fn fill(&mut self, want: usize) -> Result<()> {
        while self.lookahead.len() < want && !self.eof {
            let mut buf = [0u8; 4096];
            let n = self.inner.read(&mut buf).await?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.lookahead.extend(&buf[..n]);
        }
        Ok(())
    }

    pub async fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.fill(len).await?;
        if self.lookahead.len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        let out: Vec<u8> = self.lookahead.drain(..len).collect();
        self.pos += len as u64;
        Ok(out)
    }

    pub async fn peek_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.fill(len).await?;
        if self.lookahead.len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        Ok(self.lookahead.iter().take(len).copied().collect())
    }

    pub async fn skip(&mut self, len: u64) -> Result<()> {
        let from_lookahead = (len as usize).min(self.lookahead.len());
        self.lookahead.drain(..from_lookahead);
        let mut remaining = len - from_lookahead as u64;
        let mut sink_buf = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(sink_buf.len() as u64) as usize;
            let n = self.inner.read(&mut sink_buf[..chunk]).await?;
            if n == 0 {
                return Err(AudiometaError::EndOfStream);
            }
            remaining -= n as u64;
        }
        self.pos += len;
        Ok(())
    }

    pub async fn read_u32be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_bytes(4).await?))
    }

    /// Drains the rest of the source into an owned buffer so the sync
    /// parsers can take over via [`crate::parse_from_buffer`].
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut out: Vec<u8> = self.lookahead.drain(..).collect();
        self.inner.read_to_end(&mut out).await?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn peek_then_read_agree() {
        let mut t = AsyncStreamTokenizer::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));
        assert_eq!(t.peek_bytes(3).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(t.read_bytes(3).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(t.position(), 3);
    }

    #[tokio::test]
    async fn read_to_end_drains_lookahead_and_tail() {
        let mut t = AsyncStreamTokenizer::new(Cursor::new(vec![1u8, 2, 3, 4, 5]));
        t.read_bytes(2).await.unwrap();
        let rest = t.read_to_end().await.unwrap();
        assert_eq!(rest, vec![3, 4, 5]);
    }
}

use super::{SeekableTokenizer, Tokenizer};
use crate::error::{AudiometaError, Result};

/// Buffer-backed tokenizer: `skip` is free, peek windows are unbounded, and
/// arbitrary backward seeks are supported (spec.md §4.1 "tokenizers over
/// buffers may [seek backwards]").
pub struct SliceTokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceTokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceTokenizer { data, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

impl<'a> Tokenizer for SliceTokenizer<'a> {
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let rem = self.remaining();
        if rem.len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        let out = rem[..len].to_vec();
        self.pos += len;
        Ok(out)
    }

    fn peek_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let rem = self.remaining();
        let take = len.min(rem.len());
        if take < len {
            return Err(AudiometaError::EndOfStream);
        }
        Ok(rem[..take].to_vec())
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        let len = len as usize;
        if self.remaining().len() < len {
            return Err(AudiometaError::EndOfStream);
        }
        self.pos += len;
        Ok(())
    }

    fn as_seekable(&mut self) -> Option<&mut dyn SeekableTokenizer> {
        Some(self)
    }
}

impl<'a> SeekableTokenizer for SliceTokenizer<'a> {
    fn seek_to(&mut self, position: u64) -> Result<()> {
        if position > self.data.len() as u64 {
            return Err(AudiometaError::EndOfStream);
        }
        self.pos = position as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_track_position() {
        let mut t = SliceTokenizer::new(&[1, 2, 3, 4, 5]);
        assert_eq!(t.read_u8().unwrap(), 1);
        assert_eq!(t.position(), 1);
        assert_eq!(t.read_u16be().unwrap(), 0x0203);
        assert_eq!(t.position(), 3);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut t = SliceTokenizer::new(&[9, 9, 9]);
        assert_eq!(t.peek_bytes(2).unwrap(), vec![9, 9]);
        assert_eq!(t.position(), 0);
    }

    #[test]
    fn short_read_is_end_of_stream() {
        let mut t = SliceTokenizer::new(&[1]);
        assert!(matches!(
            t.read_bytes(2),
            Err(AudiometaError::EndOfStream)
        ));
    }

    #[test]
    fn seek_allows_backward_navigation() {
        let mut t = SliceTokenizer::new(&[1, 2, 3, 4]);
        t.skip(3).unwrap();
        t.seek_to(0).unwrap();
        assert_eq!(t.read_u8().unwrap(), 1);
    }
}

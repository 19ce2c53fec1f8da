use crate::error::{AudiometaError, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Capability for random trailer inspection (spec.md §3 "Positioned
/// reader"). Used only by the appending-header scanner; regular parsing
/// goes through [`crate::tokenizer::Tokenizer`].
pub trait PositionedReader {
    fn size(&self) -> u64;
    fn read_at(&mut self, position: u64, len: usize) -> Result<Vec<u8>>;
}

pub struct SliceReader<'a> {
    data: &'a [u8],
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceReader { data }
    }
}

impl<'a> PositionedReader for SliceReader<'a> {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, position: u64, len: usize) -> Result<Vec<u8>> {
        let start = position as usize;
        let end = (start + len).min(self.data.len());
        if start > self.data.len() {
            return Err(AudiometaError::EndOfStream);
        }
        Ok(self.data[start..end].to_vec())
    }
}

pub struct FileReader {
    file: File,
    size: u64,
}

impl FileReader {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileReader { file, size })
    }
}

impl PositionedReader for FileReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, position: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(position))?;
        let mut buf = vec![0u8; len];
        let n = self.file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

//! Fixed-size text chunking.
//!
//! Sizes count characters (Unicode scalar values), never bytes, so a chunk
//! boundary can't split a multi-byte character.

use std::num::NonZeroUsize;

use thiserror::Error;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Chunk size must be a positive number of characters, got {0}")]
    InvalidSize(usize),
}

/// One contiguous piece of the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    /// Character offset of the chunk's first character in the source text.
    pub char_offset: usize,
    pub text: &'a str,
}

/// Splits text into non-overlapping chunks of a fixed number of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: NonZeroUsize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Chunker {
    pub fn new(size: usize) -> Result<Self, ChunkError> {
        NonZeroUsize::new(size)
            .map(|size| Self { size })
            .ok_or(ChunkError::InvalidSize(size))
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Lazily iterate the chunks of `text` in order.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            rest: text,
            size: self.size.get(),
            index: 0,
            char_offset: 0,
        }
    }

    /// Number of chunks `text` splits into: `ceil(len / size)`.
    pub fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.size.get())
    }
}

/// Iterator returned by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    size: usize,
    index: usize,
    char_offset: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let split_at = self
            .rest
            .char_indices()
            .nth(self.size)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.rest.len());
        let (text, rest) = self.rest.split_at(split_at);

        let chunk = Chunk {
            index: self.index,
            char_offset: self.char_offset,
            text,
        };
        self.rest = rest;
        self.index += 1;
        self.char_offset += self.size;
        Some(chunk)
    }
}

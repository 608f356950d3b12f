//! Document chunking.
//!
//! Text is split on whitespace and cut into overlapping word windows. The
//! [`WordWindows`] iterator produces the windows lazily and can be cloned to
//! restart the sequence, which lets the pipeline re-embed from the beginning
//! without re-tokenising.

use crate::document::DocumentChunk;

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 600;

/// Default number of words shared by consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// A strategy for splitting extracted document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into chunks in extraction order.
    ///
    /// Returns an empty `Vec` if the text has no tokens.
    fn chunk(&self, text: &str) -> Vec<DocumentChunk>;
}

/// Splits text into overlapping windows of whitespace-delimited words.
///
/// # Example
///
/// ```rust
/// use clinic_rag::{Chunker, WordWindowChunker};
///
/// let chunker = WordWindowChunker::new(4, 2);
/// let chunks = chunker.chunk("a b c d e f");
/// assert_eq!(chunks[0].text, "a b c d");
/// assert_eq!(chunks[1].text, "c d e f");
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WordWindowChunker {
    /// Create a new `WordWindowChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: number of words per window
    /// * `chunk_overlap`: number of words shared by consecutive windows
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Vec<DocumentChunk> {
        word_windows(text, self.chunk_size, self.chunk_overlap)
            .enumerate()
            .map(|(i, window)| DocumentChunk::new(window, i))
            .collect()
    }
}

/// Lazily yields overlapping word windows over a text.
///
/// The step between windows is `chunk_size - overlap`, clamped to at least
/// one word so the sequence always terminates. A window starts at every
/// step offset inside the text, so the trailing windows near the end get
/// shorter and may repeat words of the window before them.
#[derive(Debug, Clone)]
pub struct WordWindows<'a> {
    tokens: Vec<&'a str>,
    size: usize,
    step: usize,
    start: usize,
}

/// Create a [`WordWindows`] iterator over `text`.
pub fn word_windows(text: &str, chunk_size: usize, overlap: usize) -> WordWindows<'_> {
    let size = chunk_size.max(1);
    let step = size.saturating_sub(overlap).max(1);
    let tokens: Vec<&str> = text.split_whitespace().collect();
    WordWindows { tokens, size, step, start: 0 }
}

impl WordWindows<'_> {
    /// Number of tokens in the underlying text.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl Iterator for WordWindows<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.start >= self.tokens.len() {
            return None;
        }

        let end = (self.start + self.size).min(self.tokens.len());
        let window = self.tokens[self.start..end].join(" ");
        self.start += self.step;
        Some(window)
    }
}

impl std::iter::FusedIterator for WordWindows<'_> {}

use anyhow::Result;

use crate::chunk::Chunk;
use crate::tokenizer::Tokenizer;

pub const DEFAULT_OVERLAP_TOKENS: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl ChunkerConfig {
    /// Windows as wide as the embedding model's context.
    pub fn for_tokenizer(tokenizer: &dyn Tokenizer, overlap_tokens: usize) -> Self {
        Self {
            max_tokens: tokenizer.max_sequence_length(),
            overlap_tokens,
        }
    }
}

/// Splits text into fixed-size token windows that overlap by `overlap_tokens`.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Fails unless `0 < max_tokens` and `overlap_tokens < max_tokens`; any
    /// other combination would never advance the window.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.max_tokens == 0 {
            anyhow::bail!("Chunk size must be at least one token");
        }
        if config.overlap_tokens >= config.max_tokens {
            anyhow::bail!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                config.overlap_tokens,
                config.max_tokens
            );
        }

        Ok(Self { config })
    }

    fn stride(&self) -> usize {
        self.config.max_tokens - self.config.overlap_tokens
    }

    /// Split `text` into decoded windows.
    ///
    /// Text that already fits comes back as a single tokenizer round-tripped
    /// chunk. Longer text yields `ceil(len / stride)` windows, the last one
    /// clipped to whatever tokens remain.
    pub fn split(&self, tokenizer: &dyn Tokenizer, text: &str) -> Result<Vec<String>> {
        let tokens = tokenizer.encode(text)?;

        if tokens.len() <= self.config.max_tokens {
            return Ok(vec![tokenizer.decode(&tokens)?]);
        }

        let mut windows = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let end = (start + self.config.max_tokens).min(tokens.len());
            windows.push(tokenizer.decode(&tokens[start..end])?);
            start += self.stride();
        }

        Ok(windows)
    }

    /// Split and label the windows for one collection.
    pub fn chunk_text(
        &self,
        tokenizer: &dyn Tokenizer,
        collection: &str,
        text: &str,
    ) -> Result<Vec<Chunk>> {
        let chunks = self
            .split(tokenizer, text)?
            .into_iter()
            .enumerate()
            .map(|(index, window)| Chunk::new(collection, index, window))
            .collect();

        Ok(chunks)
    }
}

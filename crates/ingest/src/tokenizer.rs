use anyhow::{Context, Result};
use std::path::Path;

/// Token-level view of an embedding model's tokenizer, used to size chunks.
pub trait Tokenizer: Send + Sync {
    /// Encode without special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    fn decode(&self, tokens: &[u32]) -> Result<String>;

    /// Longest input the embedding model accepts, in tokens.
    fn max_sequence_length(&self) -> usize;

    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.encode(text)?.len())
    }

    /// Length of the sequence the model actually sees, markers like
    /// `[CLS]`/`[SEP]` included.
    fn count_model_tokens(&self, text: &str) -> Result<usize> {
        self.count_tokens(text)
    }
}

/// HuggingFace `tokenizer.json` loaded through the `tokenizers` crate.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    max_length: usize,
}

impl HfTokenizer {
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Failed to load tokenizer: {:?}", path))?;

        Ok(Self { inner, max_length })
    }

    pub fn from_json(tokenizer_json: &str, max_length: usize) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(tokenizer_json.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse tokenizer json: {e}"))?;

        Ok(Self { inner, max_length })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Failed to encode text: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn count_model_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Failed to encode text: {e}"))?;
        Ok(encoding.len())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.inner
            .decode(tokens, true)
            .map_err(|e| anyhow::anyhow!("Failed to decode tokens: {e}"))
    }

    fn max_sequence_length(&self) -> usize {
        self.max_length
    }
}

/// One token per Unicode scalar value. Decoding is lossless, which makes
/// window arithmetic easy to check.
#[derive(Debug, Clone, Copy)]
pub struct CharTokenizer {
    max_length: usize,
}

impl CharTokenizer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        tokens
            .iter()
            .map(|&t| char::from_u32(t).with_context(|| format!("Invalid char token: {t}")))
            .collect()
    }

    fn max_sequence_length(&self) -> usize {
        self.max_length
    }
}

//! Token counting with the cl100k_base BPE

use crate::error::ParseError;
use std::sync::Arc;
use tiktoken_rs::{CoreBPE, Rank};

/// Cheap-to-clone handle around a shared cl100k_base encoder
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    pub fn new() -> Result<Self, ParseError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ParseError::TokenizerLoadFailed(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Split `text` into windows of at most `window` tokens, each starting
    /// `step` tokens after the previous one. The final window always reaches
    /// the end of the text.
    pub fn windows(&self, text: &str, window: usize, step: usize) -> Vec<String> {
        let tokens = self.bpe.encode_ordinary(text);
        let window = window.max(1);
        let step = step.max(1);

        let mut out = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + window).min(tokens.len());
            let piece = self.decode_lossy(&tokens[start..end]);
            if !piece.trim().is_empty() {
                out.push(piece);
            }
            if end >= tokens.len() {
                break;
            }
            start += step;
        }
        out
    }

    /// Cut `text` down to at most `limit` tokens
    pub fn truncate(&self, text: &str, limit: usize) -> String {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= limit {
            return text.to_string();
        }
        self.decode_lossy(&tokens[..limit])
    }

    /// Decode a token slice whose edges may split a multi-byte character.
    /// Drops up to three tokens from either end until the slice decodes.
    fn decode_lossy(&self, tokens: &[Rank]) -> String {
        for trim_start in 0..=3usize.min(tokens.len()) {
            for trim_end in 0..=3usize.min(tokens.len() - trim_start) {
                let slice = &tokens[trim_start..tokens.len() - trim_end];
                if let Ok(text) = self.bpe.decode(slice.to_vec()) {
                    return text;
                }
            }
        }
        String::new()
    }
}

use crate::error::IngestError;
use crate::models::IngestionOptions;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            max_tokens: value.chunk_max_tokens,
            overlap_tokens: value.chunk_overlap_tokens,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_tokens == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.overlap_tokens >= self.max_tokens {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max_tokens {}",
                self.overlap_tokens, self.max_tokens
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Splits text into overlapping windows of whitespace tokens.
///
/// Consecutive chunks share `overlap_tokens` tokens; chunk order follows
/// document order. Empty or whitespace-only input yields no chunks.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let stride = config.max_tokens - config.overlap_tokens;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < tokens.len() {
        let end = (start + config.max_tokens).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

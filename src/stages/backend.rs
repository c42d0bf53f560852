//! Inference backend seam used by chat stages.
//!
//! Model loading, tokenization and sampling live behind [`InferenceBackend`].
//! The graph only needs two calls: embed a conversation, then generate from
//! the embedding as a lazy [`TokenStream`].

use crate::config::ConfigValue;
use crate::error::{GraphError, Result};
use crate::stages::history::ChatHistory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Embedded conversation, as produced by [`InferenceBackend::embed`].
pub type Embedding = Vec<f32>;

/// Backend cache state carried between generations of one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KvCache {
    /// Tokens already evaluated into the cache.
    pub position: usize,
}

impl KvCache {
    pub fn new(position: usize) -> Self {
        Self { position }
    }
}

/// Sampling parameters for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Tokens to produce beyond the prompt.
    pub max_new_tokens: usize,
    /// Force at least this many tokens; `-1` disables.
    pub min_new_tokens: i64,
    /// Sample with `temperature`/`top_p` instead of greedy search.
    pub do_sample: bool,
    /// `1.0` means no penalty.
    pub repetition_penalty: f32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 128,
            min_new_tokens: -1,
            do_sample: false,
            repetition_penalty: 1.0,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

impl GenerationConfig {
    /// Defaults overridden by whichever keys `params` carries.
    ///
    /// Unknown keys are ignored; known keys with the wrong type are an error.
    pub fn from_params(params: &BTreeMap<String, ConfigValue>) -> Result<Self> {
        let mut config = Self::default();

        let int = |key: &str| -> Result<Option<i64>> {
            params
                .get(key)
                .map(|v| v.as_int().ok_or_else(|| wrong_type(key, "an integer")))
                .transpose()
        };
        let float = |key: &str| -> Result<Option<f32>> {
            params
                .get(key)
                .map(|v| {
                    v.as_float()
                        .map(|f| f as f32)
                        .ok_or_else(|| wrong_type(key, "a number"))
                })
                .transpose()
        };

        if let Some(v) = int("max_new_tokens")? {
            config.max_new_tokens = usize::try_from(v)
                .map_err(|_| GraphError::InvalidArgument("max_new_tokens must not be negative".into()))?;
        }
        if let Some(v) = int("min_new_tokens")? {
            config.min_new_tokens = v;
        }
        if let Some(v) = params.get("do_sample") {
            config.do_sample = v.as_bool().ok_or_else(|| wrong_type("do_sample", "a boolean"))?;
        }
        if let Some(v) = float("repetition_penalty")? {
            config.repetition_penalty = v;
        }
        if let Some(v) = float("temperature")? {
            config.temperature = v;
        }
        if let Some(v) = float("top_p")? {
            config.top_p = v;
        }

        Ok(config)
    }
}

fn wrong_type(key: &str, expected: &str) -> GraphError {
    GraphError::InvalidArgument(format!("parameter '{}' should be {}", key, expected))
}

/// Lazily generated tokens.
///
/// Once exhausted, the stream reports the final text (which may differ from
/// the concatenated tokens after detokenization) and the updated cache.
pub trait TokenStream: Iterator<Item = String> + Send {
    fn output_text(&self) -> &str;

    fn kv_cache(&self) -> Option<KvCache>;
}

/// A model that can continue a conversation.
#[cfg_attr(test, mockall::automock)]
pub trait InferenceBackend: Send + 'static {
    /// Embed the conversation. Returns the embedding and its token position.
    fn embed(&mut self, history: &ChatHistory) -> Result<(Embedding, usize)>;

    /// Start generating a reply from `embedding`, resuming from `kv_cache`.
    fn generate(
        &mut self,
        embedding: Embedding,
        config: &GenerationConfig,
        kv_cache: Option<KvCache>,
    ) -> Result<Box<dyn TokenStream>>;
}

/// [`TokenStream`] over tokens that are already known.
#[derive(Debug, Clone, Default)]
pub struct BufferedTokens {
    tokens: VecDeque<String>,
    text: String,
    final_text: Option<String>,
    kv_cache: Option<KvCache>,
}

impl BufferedTokens {
    pub fn new<I, S>(tokens: I, kv_cache: Option<KvCache>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            text: String::new(),
            final_text: None,
            kv_cache,
        }
    }

    /// Report `text` as the output text instead of the joined tokens.
    pub fn with_output_text(mut self, text: impl Into<String>) -> Self {
        self.final_text = Some(text.into());
        self
    }
}

impl Iterator for BufferedTokens {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.pop_front()?;
        self.text.push_str(&token);
        Some(token)
    }
}

impl TokenStream for BufferedTokens {
    fn output_text(&self) -> &str {
        self.final_text.as_deref().unwrap_or(&self.text)
    }

    fn kv_cache(&self) -> Option<KvCache> {
        self.kv_cache
    }
}

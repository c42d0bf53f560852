//! ChatQuery: feeds prompts to a model and streams the reply.
//!
//! Each prompt (or full chat entry) is appended to the stage's
//! [`ChatHistory`], the history is embedded and generated from, and every
//! token is emitted downstream as soon as it arrives. The finished reply is
//! kept in the history as a bot entry, together with the backend cache, so the
//! next prompt continues the same conversation.

use crate::config::NodeConfig;
use crate::error::{GraphError, Result};
use crate::graph::plugin::{Emitter, Plugin};
use crate::stages::backend::{GenerationConfig, InferenceBackend};
use crate::stages::history::{ChatEntry, ChatHistory, Role};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Items flowing through a chat graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatPacket {
    /// Text typed by the user.
    Prompt(String),
    /// A complete entry with an explicit role.
    Entry(ChatEntry),
    /// One generated token.
    Token(String),
}

/// Stage that answers prompts with a model.
pub struct ChatQuery<B> {
    backend: B,
    history: Arc<Mutex<ChatHistory>>,
    generation: GenerationConfig,
}

impl<B: InferenceBackend> ChatQuery<B> {
    pub fn new(backend: B) -> Self {
        Self::with_history(backend, Arc::new(Mutex::new(ChatHistory::new())))
    }

    /// Use a history that is also visible outside the graph.
    pub fn with_history(backend: B, history: Arc<Mutex<ChatHistory>>) -> Self {
        Self {
            backend,
            history,
            generation: GenerationConfig::default(),
        }
    }

    /// Build from a node declaration.
    ///
    /// Reads generation parameters and an optional `system_prompt` from the
    /// declaration's params.
    pub fn from_config(backend: B, config: &NodeConfig) -> Result<Self> {
        let history = match config.param("system_prompt") {
            Some(value) => {
                let prompt = value.as_str().ok_or_else(|| {
                    GraphError::InvalidArgument("parameter 'system_prompt' should be a string".into())
                })?;
                ChatHistory::with_system_prompt(prompt)
            }
            None => ChatHistory::new(),
        };
        Ok(Self::with_history(backend, Arc::new(Mutex::new(history)))
            .with_generation(GenerationConfig::from_params(&config.params)?))
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Shared handle to the conversation.
    pub fn history(&self) -> Arc<Mutex<ChatHistory>> {
        Arc::clone(&self.history)
    }

    fn lock_history(&self) -> MutexGuard<'_, ChatHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: InferenceBackend> Plugin<ChatPacket> for ChatQuery<B> {
    fn name(&self) -> &str {
        "ChatQuery"
    }

    fn process(&mut self, item: ChatPacket, out: &Emitter<'_, ChatPacket>) -> Result<Option<ChatPacket>> {
        let entry = match item {
            ChatPacket::Prompt(text) => ChatEntry::new(Role::User, text),
            ChatPacket::Entry(entry) => entry,
            ChatPacket::Token(_) => {
                return Err(GraphError::InvalidArgument(
                    "ChatQuery expects a prompt or chat entry (was a token)".to_string(),
                ))
            }
        };

        // The history lock is not held while tokens travel downstream.
        let (mut stream, reply) = {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            history.append(entry.role, entry.text);

            let (embedding, position) = self.backend.embed(&history)?;
            tracing::debug!(
                "ChatQuery embedded {} entries ({} values, position {})",
                history.len(),
                embedding.len(),
                position
            );

            let kv_cache = history.kv_cache().copied();
            let stream = self.backend.generate(embedding, &self.generation, kv_cache)?;
            (stream, history.append(Role::Bot, String::new()))
        };

        let mut tokens = 0usize;
        for token in stream.by_ref() {
            if let Some(entry) = self.lock_history().entry_mut(reply) {
                entry.text.push_str(&token);
            }
            out.broadcast(ChatPacket::Token(token))?;
            tokens += 1;
        }

        let mut history = self.lock_history();
        if let Some(entry) = history.entry_mut(reply) {
            entry.text = stream.output_text().to_string();
        }
        history.set_kv_cache(stream.kv_cache());

        tracing::debug!("ChatQuery streamed {} tokens", tokens);
        Ok(None)
    }
}

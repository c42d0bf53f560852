//! Mock construction helpers

use plugin_graph::stages::{
    BufferedTokens, ChatHistory, Embedding, GenerationConfig, InferenceBackend, KvCache,
    TokenStream,
};
use plugin_graph::Result;

/// Backend that replies to every prompt with the same tokens
///
/// The cache position advances by the number of history entries embedded,
/// so consecutive turns can be told apart.
pub struct ScriptedBackend {
    reply: Vec<String>,
    position: usize,
}

impl ScriptedBackend {
    pub fn new(reply: &[&str]) -> Self {
        Self {
            reply: reply.iter().map(|s| s.to_string()).collect(),
            position: 0,
        }
    }
}

impl InferenceBackend for ScriptedBackend {
    fn embed(&mut self, history: &ChatHistory) -> Result<(Embedding, usize)> {
        self.position = history.len();
        Ok((vec![0.0; history.len()], self.position))
    }

    fn generate(
        &mut self,
        _embedding: Embedding,
        _config: &GenerationConfig,
        _kv_cache: Option<KvCache>,
    ) -> Result<Box<dyn TokenStream>> {
        Ok(Box::new(BufferedTokens::new(
            self.reply.clone(),
            Some(KvCache::new(self.position)),
        )))
    }
}

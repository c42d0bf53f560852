//! Application stages built on the graph runtime
//!
//! - [`chat_query`]: prompt in, streamed model tokens out
//! - [`history`]: the conversation a chat stage keeps
//! - [`backend`]: the model seam a chat stage generates through

pub mod backend;
pub mod chat_query;
pub mod history;

pub use backend::{BufferedTokens, Embedding, GenerationConfig, InferenceBackend, KvCache, TokenStream};
pub use chat_query::{ChatPacket, ChatQuery};
pub use history::{ChatEntry, ChatHistory, EntryId, Role};

pub mod chatbot_client;
pub mod cli;
pub mod conversation_state;
pub mod error;

pub use chatbot_client::{
    ChatBackend, ChatRequest, ChatResponse, ConversationClient, GenerationSettings, HealthStatus,
    HttpBackend, DEFAULT_ENDPOINT, FALLBACK_REPLY,
};
pub use conversation_state::{ConversationState, Message, Role};
pub use error::ChatError;

pub mod llm;
pub mod respond;
pub mod session;

pub use llm::{ChatMessage, TargetContext, TextGenClient, TextGenRequest};
pub use respond::{GeneratedResponse, ResponseContext, ResponseTextGenerator, DEFAULT_TIME_BUDGET};
pub use session::{NegotiationSession, NegotiationTurn};

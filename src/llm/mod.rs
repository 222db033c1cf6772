//! LLM gateway: a chat-completions client and the six strictly typed
//! calls the engine is allowed to make.

pub mod client;
pub mod gateway;
pub mod types;

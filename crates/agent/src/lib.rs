pub mod llm;
pub mod message;
pub mod prompt;
pub mod protocol;
pub mod session;

pub use llm::{Completion, CompletionService, OllamaChat};
pub use message::{Message, Role, TokenUsage};
pub use prompt::{SYSTEM_PROMPT, load_system_prompt};
pub use protocol::{Action, ActionKind, Reply};
pub use session::{Agent, AgentConfig, AgentReply, AgentSession, SessionStatus, fallback_message};

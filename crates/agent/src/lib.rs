pub mod core;
pub mod events;
pub mod parser;

pub use core::{AgentLoop, CancellationToken};
pub use events::{AgentEvent, FileConfirmation, ToolUsage};
pub use parser::{parse_assistant_message, ParsedMessage};

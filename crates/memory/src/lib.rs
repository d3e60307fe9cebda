pub mod schema;
pub mod session_log;
pub mod store;

pub use schema::{MemoryCategory, MemoryEntry, MemoryFile};
pub use session_log::{read_recent_sessions, SessionEntry, SessionLog};
pub use store::MemoryStore;

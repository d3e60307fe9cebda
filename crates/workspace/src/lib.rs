pub mod error;
pub mod layout;
pub mod persistence;
pub mod response;
pub mod schema;
pub mod secrets;
pub mod variables;

pub use error::FalconError;
pub use layout::WorkspaceLayout;
pub use persistence::PersistenceManager;
pub use response::{LastResponse, ResponseManager};
pub use schema::{Environment, SavedRequest, WorkspaceCounts, WorkspaceManifest};
pub use secrets::SecretDetector;
pub use variables::{ensure_within_workspace, ScopedVariable, VariableScope, VariableStore};

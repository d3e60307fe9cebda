pub mod assert;
pub mod environments;
pub mod external;
pub mod extract;
pub mod fs;
pub mod http;
pub mod memory_tools;
pub mod requests;
pub mod variables;

pub use assert::AssertResponseTool;
pub use environments::{LoadEnvironmentTool, ListEnvironmentsTool, SaveEnvironmentTool};
pub use external::{RunPerformanceTestTool, RunSecurityScanTool, ValidateSchemaTool};
pub use extract::ExtractJsonTool;
pub use fs::{ReadFileTool, SearchCodeTool, WriteFileTool};
pub use http::HttpRequestTool;
pub use memory_tools::{RecallTool, RememberTool};
pub use requests::{ListRequestsTool, LoadRequestTool, SaveRequestTool};
pub use variables::{GetVariableTool, ListVariablesTool, SetVariableTool};

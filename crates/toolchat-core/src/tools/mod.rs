//! Tool servers and the registry that joins them
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolRegistry                               │
//! │                                             │
//! │  - Connects every server, tolerates failure │
//! │  - Catalog of <serverId>_<tool> names       │
//! │  - Routes calls back to the owning server   │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ ToolConnection (connect, list, call, close)
//!           ▼
//! ┌──────────────────┐   ┌──────────────────┐
//! │  McpConnection   │   │  McpConnection   │  ...
//! │  (child process) │   │  (child process) │
//! └──────────────────┘   └──────────────────┘
//! ```

mod connection;
mod error;
pub mod mock;
mod registry;

pub use connection::{Liveness, ServerTool, ToolConnection, ToolOutput};
pub use error::{ToolError, ToolsResult};
pub use mock::MockConnection;
pub use registry::{qualify, ConnectReport, ToolRegistry};

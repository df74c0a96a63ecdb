//! Configuration
//!
//! - `ServersConfig`: which tool servers to start (JSON or YAML file)
//! - `SessionConfig`: model and loop settings for a chat session

mod error;
mod servers;
mod session;

pub use error::{ConfigError, ConfigResult};
pub use servers::{ServerConfig, ServersConfig, DEFAULT_CONNECT_TIMEOUT};
pub use session::{SessionConfig, DEFAULT_MAX_TURNS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
pub use crate::types::EmptyArgumentsPolicy;

//! Memoh configuration layer.
//!
//! Every environment read lives here; the rest of the workspace receives
//! typed config values built once at startup.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `.env` loading
//! - `schema`: `SandboxConfig`, `ExecConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants and their aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv};
pub use schema::{ExecConfig, ObservabilityConfig, SandboxConfig, DEFAULT_DATA_DIR};

mod env_overrides;
mod loader;
pub mod schema;

pub use schema::{EngineArgs, PollConfig, ScrapiConfig};

pub mod env;
mod loader;
pub mod routing;

pub use env::{AppConfig, DirectoryConfig, MailboxConfig, OllamaConfig, RunConfig, RunMode};
pub use loader::load_config;
pub use routing::{RoutingConfig, SYSTEM_LABELS};

pub mod env;
mod loader;

pub use env::{AppConfig, BatchConfig, ClassifierConfig, DirectoryConfig};
pub use loader::load_config;

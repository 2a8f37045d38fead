//! examprep-backends: where questions come from and who grades them.
//!
//! Implements the `QuestionProvider` and `GradingService` traits over a
//! remote HTTP exam service and over a local JSON question bank.

pub mod bank;
pub mod config;
pub mod http;

pub use bank::QuestionBank;
pub use config::{create_backend, load_config, load_config_from, Backend, BackendConfig, ExamprepConfig};
pub use http::HttpBackend;

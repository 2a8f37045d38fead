//! examprep-core: exam session state machine, data model, and traits.
//!
//! This crate defines the question/answer data model, the collaborator
//! traits for question providers and grading services, and the timed exam
//! session that everything else builds on.

pub mod config;
pub mod controller;
pub mod error;
pub mod mock;
pub mod model;
pub mod practice;
pub mod session;
pub mod traits;

pub use config::ExamConfig;
pub use controller::{ExamController, ExamUpdate};
pub use error::{ConfigError, GradingError, ProviderError};
pub use practice::PracticeLoop;
pub use session::{ExamSession, GradingState, Phase};

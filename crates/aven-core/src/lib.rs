//! Configuration, answer composition and the RAG service entry points.

pub mod bootstrap;
pub mod composer;
pub mod config;
pub mod service;
pub mod vault;

pub use bootstrap::{AppService, build_service};
pub use composer::AnswerComposer;
pub use config::{Config, ConfigError};
pub use service::{RagService, STATUS_TEST_QUERY, StatusReport};

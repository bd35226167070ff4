//! # aqa-core
//!
//! Collaborator contract for the agent quality-assurance harness.
//!
//! ## Overview
//!
//! The harness treats agents, teams and scenario frameworks as external
//! systems. This crate defines the narrow shape it talks to them through:
//!
//! - [`Agent`] - anything that answers a message (single agents and teams alike)
//! - [`AgentResponse`] / [`ToolCall`] - what a run returns
//! - [`TranscriptMessage`] - typed conversation messages for scenario adapters
//! - [`AqaError`] / [`Result`] - unified error handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Agent: Send + Sync {
//!     fn name(&self) -> &str;
//!     async fn run(&self, message: &str, options: &RunOptions) -> Result<AgentResponse>;
//! }
//! ```
//!
//! Enable the `http` feature for [`HttpAgent`], which forwards runs to a
//! JSON endpoint.

pub mod agent;
pub mod error;
#[cfg(feature = "http")]
pub mod remote;
pub mod transcript;
pub mod types;

pub use agent::Agent;
pub use error::{AqaError, Result};
#[cfg(feature = "http")]
pub use remote::HttpAgent;
pub use transcript::{MessageBody, Role, TranscriptMessage};
pub use types::{AgentResponse, RunOptions, ToolCall};

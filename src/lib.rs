//! # forkscope
//!
//! Inventories an organization's repositories on GitHub, finds the forks
//! owned outside the organization, measures how far each one diverged from
//! its origin and explains the divergence with a rule-based intent summary.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//!
//! use forkscope::github::{ClientConfig, GitHubClient, DEFAULT_API_URL};
//! use forkscope::pipeline::{Pipeline, PipelineOptions};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let token = std::env::var("GITHUB_TOKEN").ok();
//! let client = GitHubClient::new(ClientConfig::new(DEFAULT_API_URL, token))?;
//! let pipeline = Pipeline::new(&client, "acme", PipelineOptions::default());
//! let output = pipeline.run_insights(&AtomicBool::new(false)).await?;
//! println!("{}", forkscope::data::to_yaml(&output)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod classify;
pub mod cli;
pub mod commits;
pub mod data;
pub mod discovery;
pub mod divergence;
pub mod github;
pub mod intent;
pub mod pipeline;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of forkscope.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

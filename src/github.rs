//! GitHub REST API access.

pub mod client;
pub mod clock;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod retry;

pub use client::{ApiResponse, ClientConfig, GitHubClient, RawResponse, DEFAULT_API_URL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GitHubError;
pub use rate_limit::{RateLimitContext, RateLimitInfo};
pub use retry::RetryPolicy;

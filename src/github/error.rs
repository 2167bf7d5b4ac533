//! GitHub API error handling.

use thiserror::Error;

/// Errors surfaced by the GitHub client.
///
/// Quota exhaustion and missing resources are deliberately absent: the client
/// blocks until the quota resets, and a 404 becomes [`ApiResponse::Absent`].
///
/// [`ApiResponse::Absent`]: super::ApiResponse::Absent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitHubError {
    /// A 5xx response or network error persisted through every retry.
    #[error("Transient failure for {path} after {attempts} attempt(s): {message}")]
    TransientFailure {
        /// Request path that failed.
        path: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last failure observed.
        message: String,
    },

    /// The credentials were rejected (401, or a 403 that is not a rate limit).
    #[error("Authorization failed for {path} (HTTP {status}). Check GITHUB_TOKEN and its scopes")]
    AuthorizationFailure {
        /// Request path that was rejected.
        path: String,
        /// HTTP status code.
        status: u16,
    },

    /// An operation needs credentials but the client is unauthenticated.
    #[error("{operation} requires an access token. Set GITHUB_TOKEN")]
    CredentialRequired {
        /// Human-readable operation name.
        operation: String,
    },

    /// The response body did not have the expected shape.
    #[error("Malformed response from {path}: {message}")]
    MalformedResponse {
        /// Request path.
        path: String,
        /// Deserialization error.
        message: String,
    },

    /// A client error other than 401/403/404 (e.g. 422 on an impossible comparison).
    #[error("Request to {path} was rejected with HTTP {status}")]
    Rejected {
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
    },

    /// The client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

impl GitHubError {
    /// Returns true if no further progress is possible and the run must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationFailure { .. }
                | Self::CredentialRequired { .. }
                | Self::Configuration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_is_fatal() {
        let err = GitHubError::AuthorizationFailure {
            path: "/orgs/acme/repos".to_string(),
            status: 401,
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn unit_level_failures_are_not_fatal() {
        let transient = GitHubError::TransientFailure {
            path: "/repos/a/b/forks".to_string(),
            attempts: 5,
            message: "HTTP 502".to_string(),
        };
        let malformed = GitHubError::MalformedResponse {
            path: "/repos/a/b".to_string(),
            message: "missing field".to_string(),
        };
        let rejected = GitHubError::Rejected {
            path: "/repos/a/b/compare/main...c:main".to_string(),
            status: 422,
        };
        assert!(!transient.is_fatal());
        assert!(!malformed.is_fatal());
        assert!(!rejected.is_fatal());
    }

    #[test]
    fn transient_message_names_path() {
        let err = GitHubError::TransientFailure {
            path: "/repos/a/b/forks".to_string(),
            attempts: 5,
            message: "HTTP 503".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/repos/a/b/forks"));
        assert!(text.contains("5 attempt"));
    }
}

//! Driver-level error type.
//!
//! Every failure a driver surfaces carries a coarse kind, a human
//! detail string, an optional operator hint and a retriability flag.
//! The engine's classifier maps these onto action outcomes; nothing
//! above the driver inspects browser internals directly.

use std::fmt;

use thiserror::Error;

/// Coarse failure classes a feed driver can report.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Browser process could not be started or attached.
    #[error("browser launch failed")]
    Launch,
    /// Navigation did not complete.
    #[error("navigation failed")]
    Navigation,
    /// An operation ran past its deadline.
    #[error("operation timed out")]
    Timeout,
    /// A required element was not present in the page.
    #[error("element not found")]
    NotFound,
    /// The site no longer accepts the session credentials.
    #[error("session rejected")]
    SessionLost,
    /// The page refused the action (interstitial, throttle page).
    #[error("page blocked the action")]
    Blocked,
    /// DevTools protocol failure.
    #[error("devtools protocol error")]
    Protocol,
    /// Filesystem or pipe error underneath the driver.
    #[error("driver i/o error")]
    Io,
    /// Invariant violation inside the driver itself.
    #[error("driver internal error")]
    Internal,
}

impl DriverErrorKind {
    /// Whether a failure of this kind is worth retrying by default.
    pub fn default_retriable(self) -> bool {
        matches!(
            self,
            DriverErrorKind::Navigation
                | DriverErrorKind::Timeout
                | DriverErrorKind::NotFound
                | DriverErrorKind::Blocked
                | DriverErrorKind::Protocol
                | DriverErrorKind::Io
        )
    }
}

/// Error surfaced by [`FeedDriver`](crate::driver::FeedDriver) operations.
#[derive(Clone, Debug)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub detail: String,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            hint: None,
            retriable: kind.default_retriable(),
        }
    }

    pub fn launch(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Launch, detail)
    }

    pub fn navigation(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Navigation, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Timeout, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NotFound, detail)
    }

    pub fn session_lost(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::SessionLost, detail)
    }

    pub fn blocked(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Blocked, detail)
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Protocol, detail)
    }

    pub fn io(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Io, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Internal, detail)
    }

    /// Attach a short operator-facing hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Override the retriability derived from the kind.
    pub fn with_retriable(mut self, retriable: bool) -> Self {
        self.retriable = retriable;
        self
    }

    pub fn is_retriable(&self) -> bool {
        self.retriable
    }

    /// True when the failure means the stored session is no longer valid.
    pub fn is_session_loss(&self) -> bool {
        self.kind == DriverErrorKind::SessionLost
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriability_follows_kind() {
        assert!(DriverError::timeout("slow page").is_retriable());
        assert!(DriverError::not_found("missing button").is_retriable());
        assert!(!DriverError::session_lost("cookie rejected").is_retriable());
        assert!(!DriverError::launch("no binary").is_retriable());
    }

    #[test]
    fn retriability_can_be_overridden() {
        let err = DriverError::timeout("gave up for good").with_retriable(false);
        assert!(!err.is_retriable());
    }

    #[test]
    fn display_includes_hint() {
        let err = DriverError::launch("spawn failed").with_hint("set ANILIKE_CHROME");
        let text = err.to_string();
        assert!(text.contains("browser launch failed"));
        assert!(text.contains("spawn failed"));
        assert!(text.contains("set ANILIKE_CHROME"));
    }

    #[test]
    fn session_loss_is_detected() {
        assert!(DriverError::session_lost("401 on feed").is_session_loss());
        assert!(!DriverError::timeout("slow").is_session_loss());
    }
}

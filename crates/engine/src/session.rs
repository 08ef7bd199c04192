//! Session restoration seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use anilist_adapter::DriverError;

/// Restores credentials when the site stops honoring the session.
///
/// The engine calls `validate` once per session-loss incident. The
/// implementation is expected to re-install whatever credentials it
/// holds and report whether the session reads as authenticated again.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn validate(&self) -> Result<bool, DriverError>;
}

#[async_trait]
impl<A> SessionAuth for Arc<A>
where
    A: SessionAuth + ?Sized,
{
    async fn validate(&self) -> Result<bool, DriverError> {
        (**self).validate().await
    }
}

/// Fixed-answer validator for tests and dry runs.
#[derive(Debug, Default)]
pub struct StaticAuth {
    valid: AtomicBool,
}

impl StaticAuth {
    pub fn valid() -> Self {
        Self {
            valid: AtomicBool::new(true),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: AtomicBool::new(false),
        }
    }

    pub fn set(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionAuth for StaticAuth {
    async fn validate(&self) -> Result<bool, DriverError> {
        Ok(self.valid.load(Ordering::SeqCst))
    }
}

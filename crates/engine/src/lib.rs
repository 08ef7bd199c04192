//! Run engine for the AniLike feed bot.
//!
//! Wires the navigator, ledger, pacing strategy and backoff policy into
//! a single-task control loop with an explicit run state machine. The
//! engine is generic over [`anilist_adapter::FeedDriver`], so the same
//! loop runs against a live browser or a scripted feed.

pub mod backoff;
pub mod engine;
pub mod metrics;
pub mod model;
pub mod session;

pub use backoff::{classify, BackoffPolicy, RetryDecision};
pub use engine::Engine;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use model::{EngineConfig, RunReport, RunState, StopReason};
pub use session::{SessionAuth, StaticAuth};

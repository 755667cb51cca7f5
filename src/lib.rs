//! Open LLM Explorer: one prompt, three hosted models, streamed side by side.
//!
//! A submission is checked against a per-client sliding-window limiter and
//! then fanned out to every configured backend; each backend streams into its
//! own destination independently of the others.

pub mod config;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod inference;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use config::{Args, GatingPolicy};
pub use error::{BackendFailure, ExplorerError, Result};
pub use fanout::{Destination, FanoutCoordinator, Outcome, Submission};
pub use inference::InferenceClient;
pub use models::{BackendSpec, StreamUpdate, UpdateEvent};
pub use rate_limit::RateLimiter;
pub use state::AppState;

use std::sync::Arc;
use crate::config::Args;
use crate::error::Result;
use crate::fanout::FanoutCoordinator;
use crate::inference::InferenceClient;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub coordinator: FanoutCoordinator,
}

impl AppState {
    pub fn new(coordinator: FanoutCoordinator) -> Self {
        Self { coordinator }
    }

    // Wire the limiter, client and coordinator from startup arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(args.rate_limit, args.rate_window()));
        let client = InferenceClient::new(
            args.api_base.clone(),
            args.hf_token.clone(),
            args.request_timeout(),
        )?;
        let coordinator = FanoutCoordinator::new(
            client,
            rate_limiter,
            crate::config::default_backends(),
            args.gating,
        );
        Ok(Self::new(coordinator))
    }
}

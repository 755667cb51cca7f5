use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::GatingPolicy;
use crate::error::{ExplorerError, Result};
use crate::inference::InferenceClient;
use crate::metrics::{
    BACKEND_ERRORS, FRAGMENTS_TOTAL, STREAM_DURATION, STREAMS_IN_FLIGHT, SUBMISSIONS_TOTAL,
};
use crate::models::{BackendSpec, InferenceRequest, StreamUpdate};
use crate::rate_limit::RateLimiter;

// Updates buffered per destination before the backend task waits on the consumer
const DESTINATION_BUFFER: usize = 64;

/// Receiving end of one backend's stream.
pub struct Destination {
    pub slot: usize,
    pub backend: BackendSpec,
    pub updates: mpsc::Receiver<StreamUpdate>,
}

/// Where a destination ended up once its channel closed.
#[derive(Debug)]
pub struct Outcome {
    pub text: String,
    pub error: Option<ExplorerError>,
    pub completed: bool,
}

impl Destination {
    /// Drain the destination, keeping the last displayed text.
    pub async fn settle(mut self) -> Outcome {
        let mut outcome = Outcome {
            text: String::new(),
            error: None,
            completed: false,
        };
        while let Some(update) = self.updates.recv().await {
            match update {
                StreamUpdate::Text(text) => outcome.text = text,
                StreamUpdate::Done => outcome.completed = true,
                StreamUpdate::Failed(e) => outcome.error = Some(e),
            }
        }
        outcome
    }
}

pub struct Submission {
    pub destinations: Vec<Destination>,
}

// Limiter decision a backend task starts from
#[derive(Clone, Copy)]
enum Gate {
    Check,
    Admitted,
    Rejected,
}

/// Admitted streams per (identity, slot).
///
/// Claiming a lane replaces its cancel switch, which fires the previous
/// holder's. Only admitted streams claim, so a rejected submission never
/// cancels anything.
#[derive(Default)]
struct Lanes {
    next_generation: AtomicU64,
    active: DashMap<(String, usize), (u64, oneshot::Sender<()>)>,
}

struct LaneClaim {
    lanes: Arc<Lanes>,
    key: (String, usize),
    generation: u64,
}

impl Lanes {
    fn claim(self: &Arc<Self>, identity: &str, slot: usize) -> (LaneClaim, oneshot::Receiver<()>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let key = (identity.to_string(), slot);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        if let Some((_, previous)) = self.active.insert(key.clone(), (generation, cancel_tx)) {
            if previous.send(()).is_ok() {
                debug!(identity, slot, "superseding in-flight stream");
            }
        }

        let claim = LaneClaim {
            lanes: Arc::clone(self),
            key,
            generation,
        };
        (claim, cancel_rx)
    }
}

impl Drop for LaneClaim {
    fn drop(&mut self) {
        // a newer claim owns the lane once it has replaced ours
        self.lanes
            .active
            .remove_if(&self.key, |_, (generation, _)| *generation == self.generation);
    }
}

/// Fans one prompt out to every configured backend.
///
/// Each backend runs in its own task and owns its own destination; nothing is
/// shared between them except the rate limiter.
pub struct FanoutCoordinator {
    client: InferenceClient,
    rate_limiter: Arc<RateLimiter>,
    backends: Arc<[BackendSpec]>,
    gating: GatingPolicy,
    lanes: Arc<Lanes>,
}

impl FanoutCoordinator {
    pub fn new(
        client: InferenceClient,
        rate_limiter: Arc<RateLimiter>,
        backends: Vec<BackendSpec>,
        gating: GatingPolicy,
    ) -> Self {
        Self {
            client,
            rate_limiter,
            backends: backends.into(),
            gating,
            lanes: Arc::new(Lanes::default()),
        }
    }

    pub fn backends(&self) -> &[BackendSpec] {
        &self.backends
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    // Admitted, identified streams that have not ended yet
    pub fn active_streams(&self) -> usize {
        self.lanes.active.len()
    }

    /// Validate the prompt and start one task per backend.
    ///
    /// Only an empty prompt fails the whole submission; every other error is
    /// delivered to the destination it belongs to.
    pub fn submit(
        &self,
        identity: &str,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<Submission> {
        if prompt.trim().is_empty() {
            return Err(ExplorerError::InvalidInput("prompt must not be empty".to_string()));
        }
        SUBMISSIONS_TOTAL.inc();

        let gate = match self.gating {
            GatingPolicy::PerBackend => Gate::Check,
            GatingPolicy::PerSubmission => match self.rate_limiter.check(identity) {
                Ok(()) => Gate::Admitted,
                Err(_) => Gate::Rejected,
            },
        };

        let mut destinations = Vec::with_capacity(self.backends.len());

        for (slot, backend) in self.backends.iter().enumerate() {
            let (tx, rx) = mpsc::channel(DESTINATION_BUFFER);
            let lane = Lane {
                client: self.client.clone(),
                rate_limiter: Arc::clone(&self.rate_limiter),
                lanes: Arc::clone(&self.lanes),
                gate,
                identity: identity.to_string(),
                slot,
                request: InferenceRequest {
                    prompt: prompt.to_string(),
                    credential: credential.map(str::to_string),
                    backend: backend.clone(),
                },
                tx,
            };
            tokio::spawn(drive(lane));

            destinations.push(Destination {
                slot,
                backend: backend.clone(),
                updates: rx,
            });
        }

        Ok(Submission { destinations })
    }
}

// Decrements the in-flight gauge however the task ends
struct InFlightGuard;

impl InFlightGuard {
    fn enter() -> Self {
        STREAMS_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        STREAMS_IN_FLIGHT.dec();
    }
}

// Everything one backend task owns
struct Lane {
    client: InferenceClient,
    rate_limiter: Arc<RateLimiter>,
    lanes: Arc<Lanes>,
    gate: Gate,
    identity: String,
    slot: usize,
    request: InferenceRequest,
    tx: mpsc::Sender<StreamUpdate>,
}

async fn drive(lane: Lane) {
    let Lane {
        client,
        rate_limiter,
        lanes,
        gate,
        identity,
        slot,
        request,
        tx,
    } = lane;

    let admitted = match gate {
        Gate::Check => rate_limiter.check(&identity),
        Gate::Admitted => Ok(()),
        Gate::Rejected => Err(ExplorerError::rate_limited()),
    };
    if let Err(e) = admitted {
        let _ = tx.send(StreamUpdate::Failed(e)).await;
        return;
    }

    // anonymous callers share a bucket, so they must not cancel each other
    let (_claim, cancel) = if identity.is_empty() {
        (None, None)
    } else {
        let (claim, cancel) = lanes.claim(&identity, slot);
        (Some(claim), Some(cancel))
    };
    let superseded = async move {
        match cancel {
            Some(cancel) => {
                let _ = cancel.await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    let _guard = InFlightGuard::enter();
    let model = request.backend.model.clone();

    tokio::select! {
        () = superseded => {
            info!(backend = %model, "stream superseded");
            let _ = tx.send(StreamUpdate::Failed(ExplorerError::Superseded)).await;
        }
        () = pump(&client, request, &tx) => {}
    }
}

// Stream one backend into its destination, ending with Done or Failed
async fn pump(client: &InferenceClient, request: InferenceRequest, tx: &mpsc::Sender<StreamUpdate>) {
    let backend = request.backend.clone();
    let start = Instant::now();
    let mut text = backend.label();
    let mut fragments = 0usize;

    info!(backend = %backend.model, "stream started");

    let stream = client.stream(request);
    futures::pin_mut!(stream);

    while let Some(next) = stream.next().await {
        match next {
            Ok(fragment) => {
                fragments += 1;
                FRAGMENTS_TOTAL.inc();
                text.push_str(&fragment);
                if tx.send(StreamUpdate::Text(text.clone())).await.is_err() {
                    debug!(backend = %backend.model, "destination closed, dropping stream");
                    return;
                }
            }
            Err(e) => {
                BACKEND_ERRORS.with_label_values(&[backend.model.as_str()]).inc();
                warn!(backend = %backend.model, error = %e, fragments, "stream failed");
                let _ = tx.send(StreamUpdate::Failed(e)).await;
                return;
            }
        }
    }

    let elapsed = start.elapsed();
    STREAM_DURATION.observe(elapsed.as_secs_f64());
    info!(
        backend = %backend.model,
        fragments,
        elapsed_ms = elapsed.as_millis() as u64,
        "stream finished"
    );
    let _ = tx.send(StreamUpdate::Done).await;
}

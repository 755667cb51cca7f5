use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use crate::config::IDENTITY_HEADER;
use crate::error::ExplorerError;
use crate::models::{SubmitRequest, UpdateEvent};
use crate::state::AppState;

// First hop of the forwarded-for chain; empty when the header is missing
pub fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

// One SSE response carrying all destinations, tagged by slot
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ExplorerError> {
    let identity = client_identity(&headers);
    let submission = state.coordinator.submit(
        &identity,
        &payload.prompt,
        payload.hf_token.as_deref(),
    )?;

    info!(
        identity = %identity,
        backends = submission.destinations.len(),
        "submission accepted"
    );

    let streams = submission.destinations.into_iter().map(|destination| {
        let slot = destination.slot;
        let model = destination.backend.model;
        ReceiverStream::new(destination.updates).map(move |update| {
            Event::default()
                .event("update")
                .json_data(UpdateEvent::from_update(slot, &model, update))
        })
    });

    Ok(Sse::new(stream::select_all(streams)).keep_alive(KeepAlive::new()))
}

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

// One hosted model the explorer fans out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSpec {
    pub model: String,
    pub name: String,
}

impl BackendSpec {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }

    // Heading shown above the accumulated text
    pub fn label(&self) -> String {
        format!("**`{}`**\n\n", self.name)
    }
}

// Per-backend call, consumed once
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: String,
    pub credential: Option<String>,
    pub backend: BackendSpec,
}

// Body of POST /api/generate
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
    #[serde(default)]
    pub hf_token: Option<String>,
}

// Chat message in the completion request
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Streaming chat completion request sent to a backend
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub stream: bool,
}

// One SSE chunk of a streaming completion
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// What a destination receives while its backend streams.
///
/// `Text` always carries the full running text (label included), never a delta.
#[derive(Debug)]
pub enum StreamUpdate {
    Text(String),
    Done,
    Failed(ExplorerError),
}

// Wire form of a StreamUpdate on the outbound SSE stream
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateEvent {
    pub backend: usize,
    pub model: String,
    pub status: UpdateStatus,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Text,
    Done,
    Error,
}

impl UpdateEvent {
    pub fn from_update(backend: usize, model: &str, update: StreamUpdate) -> Self {
        let (status, text) = match update {
            StreamUpdate::Text(text) => (UpdateStatus::Text, text),
            StreamUpdate::Done => (UpdateStatus::Done, String::new()),
            StreamUpdate::Failed(e) => (UpdateStatus::Error, e.to_string()),
        };
        Self {
            backend,
            model: model.to_string(),
            status,
            text,
        }
    }
}

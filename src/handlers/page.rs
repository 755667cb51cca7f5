use axum::{
    Json,
    extract::{Query, State},
    response::Html,
};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::sync::Arc;
use crate::config::{MAX_TOKENS, SYSTEM_PROMPT};
use crate::models::BackendSpec;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

const PROMPT_SUGGESTIONS: [&str; 5] = [
    "Give me 5 very different ways to say the following sentence: 'The quick brown fox jumps over the lazy dog.'",
    "Write a summary of the plot of the movie 'Inception' using only emojis.",
    "Write a sentence with the words 'serendipity', 'baguette', and 'C++'.",
    "Explain the concept of 'quantum entanglement' to a 5-year-old.",
    "Write a couplet about Python",
];

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    #[serde(default)]
    pub prompt: String,
}

pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn backends_handler(State(state): State<Arc<AppState>>) -> Json<Vec<BackendSpec>> {
    Json(state.coordinator.backends().to_vec())
}

pub async fn prompt_handler() -> Json<serde_json::Value> {
    let prompt = PROMPT_SUGGESTIONS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or_default();
    Json(serde_json::json!({ "prompt": prompt }))
}

pub async fn code_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CodeQuery>,
) -> Json<serde_json::Value> {
    let snippet = code_snippet(&query.prompt, state.coordinator.backends());
    Json(serde_json::json!({ "code": snippet }))
}

/// Python snippet reproducing one backend call for `prompt`.
pub fn code_snippet(prompt: &str, backends: &[BackendSpec]) -> String {
    let mut models = backends.iter().map(|b| format!("\"{}\"", b.model));
    let first = models.next().unwrap_or_default();
    let alternatives: Vec<String> = models.collect();
    let model_line = if alternatives.is_empty() {
        format!("MODEL_NAME = {first}")
    } else {
        format!("MODEL_NAME = {first}  # or {}", alternatives.join(" or "))
    };

    format!(
        r#"```python
from huggingface_hub import InferenceClient

SYSTEM_PROMPT = "{system}"
PROMPT = "{prompt}"
{model_line}

messages = [
    {{"role": "system", "content": SYSTEM_PROMPT}},
    {{"role": "user", "content": PROMPT}}
]
client = InferenceClient(model=MODEL_NAME, token=HF_TOKEN)
for c in client.chat_completion(messages, max_tokens={max_tokens}, stream=True):
    token = c.choices[0].delta.content
    print(token, end="")
```"#,
        system = SYSTEM_PROMPT,
        prompt = python_escape(prompt),
        max_tokens = MAX_TOKENS,
    )
}

// Body of a double-quoted Python string literal
fn python_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

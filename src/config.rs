use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::models::BackendSpec;

// Fixed system instruction prepended to every prompt
pub const SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant. Always answer as helpfully as possible, while being safe. Your answers should not include any harmful, unethical, racist, sexist, toxic, dangerous, or illegal content. Please ensure that your responses are socially unbiased and positive in nature. If a question does not make any sense, or is not factually coherent, explain why instead of answering something not correct. If you don't know the answer to a question, please don't share false information.";

// Output token cap per backend call
pub const MAX_TOKENS: u32 = 200;

pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co";

// Header the identity is read from
pub const IDENTITY_HEADER: &str = "x-forwarded-for";

// (model id, display name) for the three panes
const DEFAULT_BACKENDS: [(&str, &str); 3] = [
    ("meta-llama/Meta-Llama-3-70b-Instruct", "Llama 3-70B Instruct"),
    (
        "NousResearch/Nous-Hermes-2-Mixtral-8x7B-DPO",
        "Nous Hermes 2 Mixtral 8x7B DPO",
    ),
    ("HuggingFaceH4/zephyr-orpo-141b-A35b-v0.1", "Zephyr ORPO 141B A35B"),
];

pub fn default_backends() -> Vec<BackendSpec> {
    DEFAULT_BACKENDS
        .iter()
        .map(|(model, name)| BackendSpec::new(*model, *name))
        .collect()
}

/// How many quota units one submission consumes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatingPolicy {
    /// One limiter check per backend call (up to three units per submission).
    PerBackend,
    /// One limiter check per submission, shared by all backends.
    PerSubmission,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "llm-explorer")]
#[command(about = "Compare streamed completions from three hosted LLMs side by side")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Inference API base url
    #[arg(short, long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    // Default credential used when the caller supplies none
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 15)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 24 * 60 * 60)]
    pub rate_window: u64,

    // Timeout for a single backend call in seconds
    #[arg(long, default_value_t = 120)]
    pub request_timeout: u64,

    // Quota accounting for a submission
    #[arg(long, value_enum, default_value_t = GatingPolicy::PerBackend)]
    pub gating: GatingPolicy,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

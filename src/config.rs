//! Settings read from the environment (and `.env`) at startup.

use crate::error::AppError;
use crate::llm::gemini::{self, GeminiConfig};
use crate::prompt::{DEFAULT_CHAR_BUDGET, DEFAULT_HISTORY_WINDOW};
use std::time::Duration;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const CHAR_BUDGET_VAR: &str = "DOC_QA_CHAR_BUDGET";
pub const HISTORY_WINDOW_VAR: &str = "DOC_QA_HISTORY_WINDOW";
pub const TIMEOUT_VAR: &str = "DOC_QA_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub char_budget: usize,
    pub history_window: usize,
    /// Applies to batch calls only.
    pub timeout: Duration,
}

/// Load `.env` from the working directory, if there is one.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

impl Settings {
    /// Required: `GEMINI_API_KEY`.
    /// Optional: `GEMINI_MODEL`, `GEMINI_BASE_URL`, `DOC_QA_CHAR_BUDGET`,
    /// `DOC_QA_HISTORY_WINDOW`, `DOC_QA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = lookup(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::config(
                    API_KEY_VAR,
                    "is not set. Add it to your environment or a .env file and start again.",
                )
            })?;

        let model = lookup(MODEL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string());

        let char_budget = parse_positive(&lookup, CHAR_BUDGET_VAR)?.unwrap_or(DEFAULT_CHAR_BUDGET);
        let history_window =
            parse_positive(&lookup, HISTORY_WINDOW_VAR)?.unwrap_or(DEFAULT_HISTORY_WINDOW);
        let timeout = parse_positive(&lookup, TIMEOUT_VAR)?
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(gemini::DEFAULT_TIMEOUT);

        Ok(Settings {
            api_key,
            model,
            base_url,
            char_budget,
            history_window,
            timeout,
        })
    }

    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
        }
    }

    /// API key with all but the first and last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "*".repeat(chars.len())
        }
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<usize>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(AppError::config(
                key,
                format!("must be a positive integer, got `{}`", raw),
            )),
        },
    }
}

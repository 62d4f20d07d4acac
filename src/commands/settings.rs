use crate::config::{
    Settings, API_KEY_VAR, BASE_URL_VAR, CHAR_BUDGET_VAR, HISTORY_WINDOW_VAR, MODEL_VAR,
    TIMEOUT_VAR,
};
use crate::doc_processor::UploadPolicy;

/// Effective settings as `(variable, value)` pairs, API key masked.
pub fn get_settings(settings: &Settings, policy: UploadPolicy) -> Vec<(&'static str, String)> {
    let allowed = policy
        .allowed_kinds()
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        (API_KEY_VAR, settings.masked_api_key()),
        (MODEL_VAR, settings.model.clone()),
        (BASE_URL_VAR, settings.base_url.clone()),
        (CHAR_BUDGET_VAR, settings.char_budget.to_string()),
        (HISTORY_WINDOW_VAR, settings.history_window.to_string()),
        (TIMEOUT_VAR, settings.timeout.as_secs().to_string()),
        ("upload types", allowed),
    ]
}

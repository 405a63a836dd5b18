//! Patch Detection
//!
//! Classifies a user message against the loaded patch triggers with one
//! lightweight, zero-temperature model call, then parses the verdict. Every
//! failure mode on this path degrades to "no patch injected" at the caller —
//! classification must never block the main response.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::patch::ContextPatch;

/// Errors from the classification sub-call.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("detection API error: HTTP {status}")]
    DetectionApi { status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One classification verdict entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchMatch {
    pub patch_id: String,
    pub topic: String,
}

/// Render the fixed classification prompt over the loaded patches.
pub fn build_detection_prompt(patches: &[ContextPatch], user_message: &str) -> String {
    let patch_descriptions: Vec<String> = patches
        .iter()
        .map(|p| format!("- {}: {}", p.id, p.trigger))
        .collect();

    format!(
        "You are a precise topic detector. Analyze the user message and decide \
whether it clearly involves any of the domains below.\n\n\
## Available domains\n{}\n\n\
## User message\n{}\n\n\
## Rules\n\
1. **Match conservatively**: only match when the user message clearly involves \
the domain; ambiguous or borderline cases do not match\n\
2. On a match, extract the specific topic the user is discussing as `topic`\n\
3. Respond in JSON\n\n\
## Output format\n\
Return a JSON array where each match carries `patchId` and `topic`:\n\
```json\n[{{\"patchId\": \"acf\", \"topic\": \"real estate site content modeling\"}}]\n```\n\n\
If nothing matches, return an empty array:\n\
```json\n[]\n```\n\n\
Return only the JSON, nothing else.",
        patch_descriptions.join("\n"),
        user_message
    )
}

fn json_array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*?\]").expect("valid regex"))
}

/// Parse the classification model's verdict.
///
/// Extracts the first JSON-array-shaped substring (tolerating surrounding
/// prose or markdown code fences) and filters to well-typed entries with
/// non-empty fields. Any parse failure or non-array result yields an empty
/// vector rather than an error.
pub fn parse_detection_response(response: &str) -> Vec<PatchMatch> {
    let Some(json_match) = json_array_regex().find(response) else {
        return Vec::new();
    };

    let Ok(parsed) = serde_json::from_str::<Value>(json_match.as_str()) else {
        tracing::warn!("failed to parse detection response");
        return Vec::new();
    };

    let Some(items) = parsed.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| serde_json::from_value::<PatchMatch>(item.clone()).ok())
        .filter(|m| !m.patch_id.is_empty() && !m.topic.is_empty())
        .collect()
}

/// Pick the model for the classification sub-call.
///
/// Classification is simple; it does not need the primary model's full
/// capability and must avoid thinking-model request requirements.
pub fn detection_model_for(main_model: &str) -> String {
    if main_model.contains("-think") {
        return main_model.replace("-think", "");
    }
    if main_model.contains("claude") {
        return "claude-haiku-4-5-20251001".to_string();
    }
    if main_model.contains("gpt") {
        return "gpt-4.1-mini".to_string();
    }
    main_model.to_string()
}

#[derive(Debug, Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    choices: Vec<DetectionChoice>,
}

#[derive(Debug, Deserialize)]
struct DetectionChoice {
    #[serde(default)]
    message: Option<DetectionMessage>,
}

#[derive(Debug, Deserialize)]
struct DetectionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Issue the non-streaming classification call and return the raw verdict
/// text.
///
/// Runs at zero temperature for deterministic classification. Non-success
/// HTTP responses surface as [`PatchError::DetectionApi`] with the status.
pub async fn detect_patches(
    client: &reqwest::Client,
    prompt: &str,
    api_key: &str,
    base_url: &str,
    model: &str,
) -> Result<String, PatchError> {
    let detection_model = detection_model_for(model);
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .json(&json!({
            "model": detection_model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
            "max_tokens": 500,
        }))
        .send()
        .await?;

    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status,
            body = %body.chars().take(200).collect::<String>(),
            "detection API error"
        );
        return Err(PatchError::DetectionApi { status });
    }

    let parsed: DetectionResponse = response.json().await?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_else(|| "[]".to_string()))
}

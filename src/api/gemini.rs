//! Direct REST client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ApiError, ChatModel};
use crate::config::AppConfig;
use crate::session::Turn;

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
}

#[derive(Serialize)]
struct WireContent<'a> {
    role: &'a str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// HTTP client for the Gemini API with a hard per-call deadline.
pub struct GeminiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    deadline: Duration,
}

impl GeminiClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, deadline: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            deadline,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            Duration::from_millis(config.api_timeout_ms),
        )
    }

    fn advisory_for(finish_reason: &str) -> String {
        let mut message = format!(
            "Sorry, the AI stopped before completing a reply ({finish_reason})."
        );
        match finish_reason {
            "MAX_TOKENS" => message.push_str(" The response was too long and was cut off."),
            "SAFETY" => message.push_str(" The content was blocked by a safety policy."),
            "RECITATION" => message.push_str(" The content was blocked for excessive citation."),
            _ => {}
        }
        message
    }

    fn reply_from(parsed: GenerateContentResponse) -> String {
        let candidate = parsed.candidates.and_then(|mut c| {
            if c.is_empty() {
                None
            } else {
                Some(c.remove(0))
            }
        });
        let Some(candidate) = candidate else {
            return "Sorry, the AI reply could not be parsed (empty response).".to_string();
        };

        let text = candidate
            .content
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().find_map(|part| part.text));
        if let Some(text) = text {
            return text;
        }

        match candidate.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => {
                tracing::warn!("Gemini stopped generation early: {reason}");
                Self::advisory_for(reason)
            }
            _ => {
                tracing::warn!("Gemini response carried neither text nor a finish reason");
                "Sorry, the AI reply could not be parsed (empty response).".to_string()
            }
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn converse(&self, history: &[Turn], new_message: &str) -> Result<String, ApiError> {
        let Some(ref api_key) = self.api_key else {
            return Err(ApiError::MissingKey);
        };

        let mut contents: Vec<WireContent<'_>> = history
            .iter()
            .map(|turn| WireContent {
                role: turn.role.as_str(),
                parts: vec![WirePart {
                    text: &turn.content,
                }],
            })
            .collect();
        contents.push(WireContent {
            role: "user",
            parts: vec![WirePart { text: new_message }],
        });

        let body = GenerateContentRequest { contents };
        tracing::info!(
            turns = body.contents.len(),
            "sending generateContent request"
        );

        let url = format!("{}?key={}", self.api_url, api_key);
        let outcome = tokio::time::timeout(self.deadline, async {
            let response = self.client.post(&url).json(&body).send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        })
        .await;

        let (status, text) = match outcome {
            Err(_) => return Err(ApiError::Timeout(self.deadline)),
            Ok(Err(err)) => return Err(ApiError::Transport(err)),
            Ok(Ok(pair)) => pair,
        };

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorWrapper>(&text)
                .map(|wrapper| {
                    let message = wrapper.error.message.unwrap_or_else(|| text.clone());
                    match wrapper.error.status {
                        Some(s) if !s.is_empty() => format!("{s}: {message}"),
                        _ => message,
                    }
                })
                .unwrap_or(text);
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|err| ApiError::Malformed(err.to_string()))?;
        Ok(Self::reply_from(parsed))
    }
}

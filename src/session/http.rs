//! HTTP client for the execution engine's session endpoint

use crate::error::{MatchmakingError, Result};
use crate::session::creator::SessionCreator;
use crate::types::{CreateSessionRequest, CreatedSession};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for the engine HTTP client
#[derive(Debug, Clone)]
pub struct HttpSessionCreatorConfig {
    /// Base URL of the execution engine, without trailing slash
    pub engine_url: String,
    /// Upper bound for one create call, including connect and body read
    pub request_timeout: Duration,
}

impl Default for HttpSessionCreatorConfig {
    fn default() -> Self {
        Self {
            engine_url: "http://localhost:8081".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Request body expected by the engine's `/game/create` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineCreateRequest {
    game_id: String,
    white_player_id: String,
    black_player_id: String,
    white_model_id: String,
    black_model_id: String,
}

/// Response body of the engine's `/game/create` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EngineCreateResponse {
    success: bool,
    #[serde(default)]
    game_id: String,
    #[serde(default)]
    ws_port: u16,
    #[serde(default)]
    error: Option<String>,
}

impl From<&CreateSessionRequest> for EngineCreateRequest {
    fn from(request: &CreateSessionRequest) -> Self {
        Self {
            game_id: request.session_id.clone(),
            white_player_id: request.first_participant_id.clone(),
            black_player_id: request.second_participant_id.clone(),
            white_model_id: request.first_model_id.clone(),
            black_model_id: request.second_model_id.clone(),
        }
    }
}

/// Session creator backed by the execution engine's HTTP API
#[derive(Debug, Clone)]
pub struct HttpSessionCreator {
    config: HttpSessionCreatorConfig,
    client: reqwest::Client,
}

impl HttpSessionCreator {
    /// Create a new client; the timeout is applied to every request
    pub fn new(config: HttpSessionCreatorConfig) -> Result<Self> {
        if config.engine_url.trim().is_empty() {
            return Err(MatchmakingError::ConfigurationError {
                message: "Engine URL cannot be empty".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build engine HTTP client")?;

        Ok(Self { config, client })
    }

    /// Endpoint used for session creation
    pub fn create_url(&self) -> String {
        format!("{}/game/create", self.config.engine_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SessionCreator for HttpSessionCreator {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let start_time = Instant::now();
        let url = self.create_url();
        let body = EngineCreateRequest::from(&request);

        debug!(
            "Requesting session {} from engine at {} - first: '{}', second: '{}'",
            request.session_id, url, request.first_participant_id, request.second_participant_id
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach engine at {}", url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read engine response body")?;

        let parsed: EngineCreateResponse = serde_json::from_str(&text).with_context(|| {
            format!(
                "Failed to parse engine response (HTTP {}): {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )
        })?;

        if !status.is_success() {
            let message = parsed
                .error
                .unwrap_or_else(|| "no error message".to_string());
            warn!(
                "Engine answered session {} with HTTP {} - error: {}",
                request.session_id, status, message
            );
            anyhow::bail!("engine returned HTTP {}: {}", status.as_u16(), message);
        }

        if !parsed.success {
            let message = parsed
                .error
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(
                "Engine refused session {} - status: {}, error: {}",
                request.session_id, status, message
            );
            anyhow::bail!("engine returned error: {}", message);
        }

        info!(
            "Engine created session {} on port {} in {:.2}ms",
            parsed.game_id,
            parsed.ws_port,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok(CreatedSession {
            session_id: parsed.game_id,
            session_port: parsed.ws_port,
        })
    }
}

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use storyvoice_core::voice::{ErrorKind, ProviderKind, VoiceRequest};
use tracing::{error, info, warn};

use crate::AppState;

/// Body of `POST /generate-voice`. `model` optionally names the provider to
/// try first.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateVoiceBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl GenerateVoiceBody {
    fn into_request(self) -> VoiceRequest {
        let provider_preference = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .and_then(|model| match ProviderKind::from_str(model) {
                Ok(kind) => Some(kind),
                Err(_) => {
                    warn!(model, "Ignoring unknown provider preference");
                    None
                }
            });

        VoiceRequest {
            text: self.text,
            character: self.character,
            emotion: self.emotion,
            provider_preference,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVoiceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateVoiceResponse {
    fn rejected(error: String) -> Self {
        Self {
            success: false,
            audio_url: None,
            cached: None,
            used_fallback: None,
            error: Some(error),
        }
    }
}

pub async fn generate_voice(
    State(state): State<AppState>,
    body: Result<Json<GenerateVoiceBody>, JsonRejection>,
) -> (StatusCode, Json<GenerateVoiceResponse>) {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable generate-voice body");
            return (
                StatusCode::BAD_REQUEST,
                Json(GenerateVoiceResponse::rejected(rejection.body_text())),
            );
        }
    };

    let result = state.router.handle(body.into_request()).await;

    if result.error_kind == Some(ErrorKind::ValidationError) {
        return (
            StatusCode::BAD_REQUEST,
            Json(GenerateVoiceResponse::rejected(
                result.error.unwrap_or_else(|| "Invalid request".to_string()),
            )),
        );
    }

    info!(
        cached = result.cached,
        used_fallback = result.used_fallback,
        "Voice generated"
    );

    (
        StatusCode::OK,
        Json(GenerateVoiceResponse {
            success: result.success,
            audio_url: Some(result.audio_payload),
            cached: Some(result.cached),
            used_fallback: Some(result.used_fallback),
            error: result.error,
        }),
    )
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
    pub deleted_keys: Vec<String>,
}

pub async fn clear_voice_cache(
    State(state): State<AppState>,
) -> (StatusCode, Json<ClearCacheResponse>) {
    match state.router.clear_cache().await {
        Ok(deleted_keys) => (
            StatusCode::OK,
            Json(ClearCacheResponse {
                success: true,
                message: format!("Cleared {} cached voice entries", deleted_keys.len()),
                deleted_keys,
            }),
        ),
        Err(e) => {
            error!(error = ?e, "Failed to clear voice cache");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ClearCacheResponse {
                    success: false,
                    message: format!("Failed to clear voice cache: {e}"),
                    deleted_keys: Vec::new(),
                }),
            )
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServicesDto {
    pub elevenlabs: bool,
    pub openai: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceInfoResponse {
    pub available: bool,
    pub services: ServicesDto,
    pub characters: Vec<String>,
    pub emotions: Vec<String>,
}

pub async fn voice_info(State(state): State<AppState>) -> Json<VoiceInfoResponse> {
    let info = state.router.voice_info();
    let configured = |kind| info.services.get(&kind).copied().unwrap_or(false);

    Json(VoiceInfoResponse {
        available: info.available,
        services: ServicesDto {
            elevenlabs: configured(ProviderKind::ElevenLabs),
            openai: configured(ProviderKind::OpenAi),
        },
        characters: info.characters,
        emotions: info.emotions,
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

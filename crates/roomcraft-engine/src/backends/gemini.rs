use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use roomcraft_contracts::design::{EncodedImage, ExtractionPayload};
use serde_json::{json, Value};

use super::{RemoteBackend, RemoteRequest};
use crate::config::StudioConfig;
use crate::error::{FailureKind, GatewayError};

const TRANSFORM_TEMPERATURE: f64 = 0.2;

pub struct GeminiBackend {
    api_base: String,
    api_key: Option<String>,
    image_model: String,
    text_model: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiBackend {
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.api_key.as_deref().ok_or_else(|| {
            GatewayError::new(
                FailureKind::Auth,
                "GEMINI_API_KEY, GOOGLE_API_KEY or GOOGLE_AI_STUDIO_API_KEY not set",
            )
        })
    }

    fn post(&self, model: &str, payload: &Value) -> Result<Value, GatewayError> {
        let api_key = self.api_key()?;
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(self.timeout)
            .json(payload)
            .send()
            .map_err(|err| transport_error(&err))?;
        response_json_or_error(response)
    }
}

fn request_contents(request: &RemoteRequest) -> Value {
    json!([{
        "role": "user",
        "parts": [
            {
                "inline_data": {
                    "mime_type": request.image.mime_type,
                    "data": request.image.to_base64(),
                }
            },
            { "text": request.prompt },
        ]
    }])
}

fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "furniture": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "itemName": { "type": "string" },
                        "color": { "type": "string" },
                        "searchQuery": { "type": "string" }
                    },
                    "required": ["itemName", "color", "searchQuery"]
                }
            },
            "palette": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "hex": { "type": "string" },
                        "name": { "type": "string" }
                    },
                    "required": ["hex", "name"]
                }
            }
        },
        "required": ["furniture", "palette"]
    })
}

impl RemoteBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn transform(&self, request: &RemoteRequest) -> Result<EncodedImage, GatewayError> {
        let payload = json!({
            "contents": request_contents(request),
            "generationConfig": {
                "temperature": TRANSFORM_TEMPERATURE,
                "responseModalities": ["TEXT", "IMAGE"],
            },
        });
        let response = self.post(&self.image_model, &payload)?;
        extract_first_image(&response)
    }

    fn extract(&self, request: &RemoteRequest) -> Result<ExtractionPayload, GatewayError> {
        let payload = json!({
            "contents": request_contents(request),
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": extraction_schema(),
            },
        });
        let response = self.post(&self.text_model, &payload)?;
        let text = response_text(&response);
        if text.trim().is_empty() {
            return Ok(ExtractionPayload::default());
        }
        ExtractionPayload::parse(&text).map_err(|err| {
            GatewayError::new(
                FailureKind::Other,
                format!("Gemini extraction returned invalid JSON: {err}"),
            )
        })
    }
}

fn extract_first_image(response_payload: &Value) -> Result<EncodedImage, GatewayError> {
    let candidates = response_payload
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for candidate in &candidates {
        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for part in parts {
            let Some(inline) = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let bytes = BASE64.decode(data.as_bytes()).map_err(|err| {
                GatewayError::new(
                    FailureKind::Other,
                    format!("Gemini image base64 decode failed: {err}"),
                )
            })?;
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            return Ok(EncodedImage::new(bytes, mime_type));
        }
    }

    let reason = candidates
        .iter()
        .find_map(|candidate| candidate.get("finishReason").and_then(Value::as_str))
        .or_else(|| {
            response_payload
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
        })
        .map(str::to_string);
    Err(GatewayError::no_candidate(reason))
}

fn response_text(response_payload: &Value) -> String {
    response_payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, GatewayError> {
    let status = response.status();
    let code = status.as_u16();
    let body = response.text().map_err(|err| transport_error(&err))?;
    if !status.is_success() {
        return Err(GatewayError::from_status(code, error_message(&body)));
    }
    serde_json::from_str(&body).map_err(|err| {
        GatewayError::new(
            FailureKind::Other,
            format!("Gemini returned invalid JSON payload: {err}"),
        )
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate_text(body.trim(), 512))
}

fn transport_error(err: &reqwest::Error) -> GatewayError {
    let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
        FailureKind::Transport
    } else {
        FailureKind::Other
    };
    GatewayError::new(kind, format!("Gemini request failed: {err}"))
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::prompt::{CompletionRequest, Turn, TurnRole};

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeBlock>,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

fn to_message(turn: &Turn) -> ClaudeMessage {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "assistant",
    };

    let mut content = Vec::new();
    if let Some(image) = &turn.image {
        content.push(ClaudeBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    content.push(ClaudeBlock::Text { text: turn.text.clone() });

    ClaudeMessage { role: role.to_string(), content }
}

/// The Messages API wants a user turn first, so leading assistant turns are dropped
fn to_messages(request: &CompletionRequest) -> Vec<ClaudeMessage> {
    request
        .history
        .iter()
        .skip_while(|turn| turn.role == TurnRole::Model)
        .chain(std::iter::once(&request.current))
        .map(to_message)
        .collect()
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let messages = to_messages(request);

        let body = ClaudeRequest {
            model: model.to_string(),
            max_tokens: 1024,
            system: request.system.clone(),
            messages,
        };

        let response = self.client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API error {}: {}", status, text));
        }

        let claude_response: ClaudeResponse = response.json().await?;
        Ok(claude_response.content.first()
            .map(|c| c.text.clone())
            .unwrap_or_default())
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }
}

use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::prompt::{CompletionRequest, Turn, TurnRole};

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Plain(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

fn to_message(turn: &Turn) -> OpenAIMessage {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "assistant",
    };

    let content = match &turn.image {
        Some(image) => MessageContent::Parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.mime_type, image.data),
                },
            },
            ContentPart::Text { text: turn.text.clone() },
        ]),
        None => MessageContent::Plain(turn.text.clone()),
    };

    OpenAIMessage { role: role.to_string(), content }
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let mut messages = vec![OpenAIMessage {
            role: "system".to_string(),
            content: MessageContent::Plain(request.system.clone()),
        }];
        messages.extend(request.history.iter().map(to_message));
        messages.push(to_message(&request.current));

        let body = OpenAIRequest {
            model: model.to_string(),
            messages,
        };

        let response = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        let openai_response: OpenAIResponse = response.json().await?;
        Ok(openai_response.choices.into_iter().next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}

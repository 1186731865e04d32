use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::prompt::{CompletionRequest, Turn, TurnRole};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

fn to_message(turn: &Turn) -> OllamaMessage {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "assistant",
    };
    OllamaMessage {
        role: role.to_string(),
        content: turn.text.clone(),
        images: turn.image.iter().map(|img| img.data.clone()).collect(),
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = vec![OllamaMessage {
            role: "system".to_string(),
            content: request.system.clone(),
            images: Vec::new(),
        }];
        messages.extend(request.history.iter().map(to_message));
        messages.push(to_message(&request.current));

        let body = OllamaChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama API error {}: {}", status, text));
        }

        let ollama_response: OllamaChatResponse = response.json().await?;
        Ok(ollama_response.message.content)
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to list models: {}", response.status()));
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::InlineImage;

    #[test]
    fn images_ride_along_as_raw_base64() {
        let turn = Turn {
            role: TurnRole::User,
            text: "看看".into(),
            image: Some(InlineImage { mime_type: "image/png".into(), data: "QUJD".into() }),
        };
        let json = serde_json::to_value(to_message(&turn)).unwrap();
        assert_eq!(json["images"][0], "QUJD");
    }

    #[test]
    fn text_turn_omits_images() {
        let turn = Turn { role: TurnRole::Model, text: "好".into(), image: None };
        let json = serde_json::to_value(to_message(&turn)).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("images").is_none());
    }

    #[tokio::test]
    async fn error_status_carries_the_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"error":"model 'nope' not found"}"#;
            let response = format!(
                "HTTP/1.1 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            // Drain whatever is left of the request so the close is clean
            let _ = socket.shutdown().await;
            while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
        });

        let client = OllamaClient::new(&format!("http://{}", addr));
        let req = crate::prompt::build_request("sys", &[], "hi", None, 15);
        let err = client.complete("nope", &req).await.unwrap_err().to_string();

        assert!(err.contains("404"), "{err}");
        assert!(err.contains("model 'nope' not found"), "{err}");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let client = OllamaClient::new("http://127.0.0.1:9/");
        assert!(client.list_models().await.is_err());
    }
}

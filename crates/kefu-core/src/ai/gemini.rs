use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::prompt::{CompletionRequest, Turn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

fn to_content(turn: &Turn) -> Content {
    let mut parts = Vec::new();
    if let Some(image) = &turn.image {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    parts.push(Part::Text { text: turn.text.clone() });

    Content {
        role: Some(turn.role.as_str().to_string()),
        parts,
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text { text: request.system.clone() }],
            },
            contents: request
                .history
                .iter()
                .chain(std::iter::once(&request.current))
                .map(to_content)
                .collect(),
        };

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GenerateResponse = response.json().await?;
        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.0-flash".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{InlineImage, TurnRole};

    #[test]
    fn image_part_comes_before_text() {
        let turn = Turn {
            role: TurnRole::User,
            text: "看看".into(),
            image: Some(InlineImage { mime_type: "image/jpeg".into(), data: "QUJD".into() }),
        };
        let json = serde_json::to_value(to_content(&turn)).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(json["parts"][0]["inlineData"]["data"], "QUJD");
        assert_eq!(json["parts"][1]["text"], "看看");
    }

    #[test]
    fn model_turns_keep_model_role() {
        let turn = Turn { role: TurnRole::Model, text: "好的".into(), image: None };
        let json = serde_json::to_value(to_content(&turn)).unwrap();
        assert_eq!(json["role"], "model");
    }

    #[test]
    fn response_text_parts_are_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"王总，"},{"text":"有货。"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let parts: Vec<String> = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.clone())
            .collect();
        assert_eq!(parts.join(""), "王总，有货。");
    }
}

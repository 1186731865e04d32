//! Offline provider that answers without touching the network.
//! Handy for trying the console without an API key.

use std::time::Duration;

use anyhow::Result;

use crate::prompt::CompletionRequest;

#[derive(Debug, Clone)]
pub struct EchoClient {
    delay: Duration,
}

impl Default for EchoClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

impl EchoClient {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn complete(&self, _model: &str, request: &CompletionRequest) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut reply = format!("[echo] {}", request.current.text);
        if let Some(image) = &request.current.image {
            reply.push_str(&format!(" ({} attached)", image.mime_type));
        }
        Ok(reply)
    }

    pub fn list_models() -> Vec<String> {
        vec!["echo".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::build_request;

    #[tokio::test]
    async fn echoes_current_turn() {
        let client = EchoClient::new(Duration::ZERO);
        let req = build_request("sys", &[], "M6有货吗", None, 15);
        assert_eq!(client.complete("echo", &req).await.unwrap(), "[echo] M6有货吗");
    }

    #[tokio::test]
    async fn mentions_attached_image() {
        let client = EchoClient::new(Duration::ZERO);
        let img = crate::model::ImageAttachment::from_data_url("data:image/png;base64,AAAA");
        let req = build_request("sys", &[], "", Some(&img), 15);
        let reply = client.complete("echo", &req).await.unwrap();
        assert!(reply.ends_with("(image/png attached)"));
    }
}

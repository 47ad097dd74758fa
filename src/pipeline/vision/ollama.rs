use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::collaborator::CollaboratorError;

/// Chat transport to a vision-capable model.
pub trait VisionChat: Send + Sync {
    /// One non-streaming chat turn with base64-encoded images attached.
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
        json_output: bool,
    ) -> Result<String, CollaboratorError>;
}

/// The tag listing is a cheap local call; startup should not wait on a
/// full inference timeout for it.
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama HTTP client for local vision inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, CollaboratorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Whether a model whose name starts with `model` is pulled.
    pub fn is_model_available(&self, model: &str) -> Result<bool, CollaboratorError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    /// Names of the locally pulled models.
    fn list_models(&self) -> Result<Vec<String>, CollaboratorError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(TAGS_TIMEOUT)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn map_send_error(&self, e: reqwest::Error) -> CollaboratorError {
        if e.is_connect() {
            CollaboratorError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            CollaboratorError::Timeout(Duration::from_secs(self.timeout_secs))
        } else {
            CollaboratorError::Unavailable(e.to_string())
        }
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "no_images")]
    images: &'a [String],
}

fn no_images(images: &&[String]) -> bool {
    images.is_empty()
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

fn build_messages<'a>(
    prompt: &'a str,
    images: &'a [String],
    system: Option<&'a str>,
) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage {
            role: "system",
            content: system,
            images: &[],
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
        images,
    });
    messages
}

impl VisionChat for OllamaClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
        json_output: bool,
    ) -> Result<String, CollaboratorError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: build_messages(prompt, images, system),
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: 1024,
            },
            format: json_output.then_some("json"),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| CollaboratorError::MalformedResponse(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 30).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn chat_request_shape() {
        let images = vec!["aGVsbG8=".to_string()];
        let body = ChatRequest {
            model: "qwen2.5vl:7b",
            messages: build_messages("classify", &images, Some("sys")),
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: 1024,
            },
            format: Some("json"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["format"], "json");
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json["messages"][0].get("images").is_none());
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["images"][0], "aGVsbG8=");
    }

    #[test]
    fn format_omitted_for_free_text() {
        let body = ChatRequest {
            model: "m",
            messages: build_messages("p", &[], None),
            stream: false,
            options: ChatOptions {
                temperature: 0.0,
                num_predict: 16,
            },
            format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn chat_response_parses() {
        let raw = r#"{"model":"m","message":{"role":"assistant","content":"T4"},"done":true}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "T4");
    }

    #[test]
    fn unreachable_host_is_connection_error() {
        // Port 9 (discard) is closed on any sane test host.
        let client = OllamaClient::new("http://127.0.0.1:9", 2).unwrap();
        match client.is_model_available("qwen2.5vl:7b") {
            Err(CollaboratorError::Connection(url)) => assert_eq!(url, "http://127.0.0.1:9"),
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn tags_response_lists_names() {
        let raw = r#"{"models":[{"name":"qwen2.5vl:7b","size":6000000000},{"name":"llava:13b"}]}"#;
        let parsed: TagsResponse = serde_json::from_str(raw).unwrap();
        let names: Vec<_> = parsed.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["qwen2.5vl:7b", "llava:13b"]);
    }
}

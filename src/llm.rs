//! Chat-completion client that turns the article list into a Markdown report.
//!
//! The request is sent once. Any failure from the API (transport, status,
//! payload) is returned as [`DigestError::ExternalService`] and ends the run.

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Settings, DEFAULT_MODEL};
use crate::error::{DigestError, Result};
use crate::fetcher::Article;
use crate::prompt::{build_llm_prompt, PromptTemplate};

pub const SYSTEM_PROMPT: &str = "You write clear, concise Markdown reports.";

/// Sampling temperature sent to every model except the default one.
pub const TEMPERATURE: f32 = 0.4;

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: &str, prompt: String) -> Self {
        let model = model.trim().to_string();
        // The default model only accepts its built-in sampling settings.
        let temperature = if model.to_lowercase() == DEFAULT_MODEL {
            None
        } else {
            Some(TEMPERATURE)
        };

        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Markdown returned instead of calling the API when no articles were found.
pub fn fallback_report(today: &str) -> String {
    format!("# Daily Research & Idea Report – {}\n\nNo articles found today.", today)
}

pub struct ReportGenerator {
    client: Client,
    settings: Settings,
}

impl fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("client", &"<reqwest::Client>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ReportGenerator {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("feed-digest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Produce the report text for `articles`.
    ///
    /// An empty list short-circuits to [`fallback_report`] without touching
    /// the network or the credential.
    pub async fn generate_report_md(
        &self,
        articles: &[Article],
        template: &PromptTemplate,
        today: &str,
    ) -> Result<String> {
        if articles.is_empty() {
            info!("No articles found, writing fallback report");
            return Ok(fallback_report(today));
        }

        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            DigestError::Config("OPENAI_API_KEY environment variable is not set".to_string())
        })?;

        let prompt = build_llm_prompt(articles, template, today)?;
        let request = ChatRequest::new(&self.settings.model, prompt);

        self.complete(api_key, &request).await
    }

    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_base_url.trim_end_matches('/')
        );
        info!("Requesting report from model '{}'", request.model);
        debug!("POST {} (temperature: {:?})", url, request.temperature);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| DigestError::ExternalService(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::ExternalService(format!(
                "API error: {} - {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            DigestError::ExternalService(format!("Invalid completion response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                DigestError::ExternalService("Completion response had no content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_omits_temperature() {
        let request = ChatRequest::new("gpt-5-nano", "prompt".to_string());
        assert_eq!(request.temperature, None);

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_default_model_match_ignores_case_and_whitespace() {
        let request = ChatRequest::new("  GPT-5-Nano ", "prompt".to_string());
        assert_eq!(request.model, "GPT-5-Nano");
        assert_eq!(request.temperature, None);
    }

    #[test]
    fn test_other_model_sets_temperature() {
        let request = ChatRequest::new("gpt-4o-mini", "prompt".to_string());
        assert_eq!(request.temperature, Some(0.4));

        let json = serde_json::to_value(&request).unwrap();
        let temperature = json["temperature"].as_f64().unwrap();
        assert!((temperature - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_request_messages() {
        let request = ChatRequest::new("gpt-5-nano", "Summarize these".to_string());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-5-nano");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Summarize these");
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_fallback_report() {
        let report = fallback_report("2024-12-09");
        assert!(report.starts_with("# Daily Research & Idea Report – 2024-12-09"));
        assert!(report.ends_with("No articles found today."));
    }

    #[tokio::test]
    async fn test_empty_articles_need_no_credential() {
        let settings = Settings {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
        };
        let generator = ReportGenerator::new(settings).unwrap();
        let template = PromptTemplate::new("$today $articles_block");

        let report = generator
            .generate_report_md(&[], &template, "2024-12-09")
            .await
            .unwrap();

        assert_eq!(report, fallback_report("2024-12-09"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_config_error() {
        let settings = Settings {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: "http://127.0.0.1:9".to_string(),
        };
        let generator = ReportGenerator::new(settings).unwrap();
        let template = PromptTemplate::new("$today $articles_block");
        let articles = vec![Article {
            title: "Title".to_string(),
            link: "https://example.com/1".to_string(),
            summary: String::new(),
            published: String::new(),
            source: "Example".to_string(),
        }];

        let result = generator
            .generate_report_md(&articles, &template, "2024-12-09")
            .await;

        match result {
            Err(DigestError::Config(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}

use crate::api::models::RequestBody;
use crate::api::response::extract_api_error_message;
use crate::api::streaming::{process_streaming_response, StreamEvent};
use crate::error::{ChefChatError, Result};
use crate::models::{Message, ToolCall};
use async_trait::async_trait;
use colored::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Per-request knobs. Absent tools means the model is offered no
/// tool-calling capability at all for this call.
#[derive(Default, Clone)]
pub struct ChatOptions {
    pub tools: Option<Vec<Value>>,
    pub temperature: Option<f32>,
    pub web_search: bool,
}

pub struct ChatOutcome {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// The model endpoint as the agents see it. Kept object-safe so turn
/// logic can run against a scripted backend in tests.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send(
        &self,
        messages: &[Message],
        options: ChatOptions,
        on_event: &mut (dyn FnMut(StreamEvent<'_>) + Send),
    ) -> Result<ChatOutcome>;
}

pub struct ChatClient {
    http: reqwest::Client,
    api_endpoint: String,
    model: String,
    stream_timeout: u64,
    verbose: bool,
}

impl ChatClient {
    pub fn new(
        api_key: &str,
        api_endpoint: impl Into<String>,
        model: impl Into<String>,
        stream_timeout: u64,
        verbose: bool,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ChefChatError::ConfigError(format!("Invalid authorization header: {}", e))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(ChatClient {
            http,
            api_endpoint: api_endpoint.into(),
            model: model.into(),
            stream_timeout,
            verbose,
        })
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn send(
        &self,
        messages: &[Message],
        options: ChatOptions,
        on_event: &mut (dyn FnMut(StreamEvent<'_>) + Send),
    ) -> Result<ChatOutcome> {
        let request_body = RequestBody {
            model: self.model.clone(),
            messages: messages.to_vec(),
            stream: true,
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            tools: options.tools,
            web_search: options.web_search,
        };

        if self.verbose {
            eprintln!(
                "{}",
                format!(
                    "[AI] Request: model={} tools={} web_search={}",
                    self.model,
                    request_body.tools.as_ref().map_or(0, |t| t.len()),
                    request_body.web_search
                )
                .dimmed()
            );
        }

        let response = self
            .http
            .post(&self.api_endpoint)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = extract_api_error_message(&body).unwrap_or(body);
            return Err(ChefChatError::ApiError { status, message });
        }

        process_streaming_response(response, self.stream_timeout, self.verbose, on_event).await
    }
}

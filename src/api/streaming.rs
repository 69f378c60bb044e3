use crate::api::accumulator::ToolCallAccumulator;
use crate::api::client::ChatOutcome;
use crate::api::models::StreamResponse;
use crate::error::{ChefChatError, Result};
use colored::*;
use futures::StreamExt;
use tokio::time::{timeout, Duration};

/// Incremental event delivered while a model response streams in.
///
/// `Content` always carries the full text accumulated so far, not the
/// latest delta. `ToolCallsReady` fires at most once per turn, after
/// every fragment of that turn's tool calls has been applied; content
/// arriving afterwards supersedes nothing the caller should keep.
pub enum StreamEvent<'a> {
    Content(&'a str),
    ToolCallsReady,
}

/// Line-by-line SSE consumer state. Kept separate from the transport
/// loop so frame handling can be exercised without a live response.
pub struct SseConsumer {
    content: String,
    accumulator: ToolCallAccumulator,
    tool_calls_signaled: bool,
    verbose: bool,
}

impl SseConsumer {
    pub fn new(verbose: bool) -> Self {
        SseConsumer {
            content: String::new(),
            accumulator: ToolCallAccumulator::new(),
            tool_calls_signaled: false,
            verbose,
        }
    }

    /// Process one complete line. Returns true when the end sentinel was
    /// seen and consumption should stop.
    pub fn feed_line(
        &mut self,
        line: &str,
        on_event: &mut (dyn FnMut(StreamEvent<'_>) + Send),
    ) -> bool {
        if line.is_empty() || line.starts_with(':') {
            return false;
        }

        let Some(colon_pos) = line.find(':') else {
            return false;
        };
        let field = line[..colon_pos].trim();
        let value = line[colon_pos + 1..].trim_start();

        match field {
            "data" => {
                if value == "[DONE]" {
                    return true;
                }

                match serde_json::from_str::<StreamResponse>(value) {
                    Ok(parsed) => {
                        for choice in parsed.choices.unwrap_or_default() {
                            if let Some(delta) = choice.delta {
                                if let Some(chunk) = delta.content {
                                    if !chunk.is_empty() {
                                        self.content.push_str(&chunk);
                                        on_event(StreamEvent::Content(&self.content));
                                    }
                                }
                                if let Some(fragments) = delta.tool_calls {
                                    for fragment in &fragments {
                                        self.accumulator.apply(fragment);
                                    }
                                }
                            }
                            if choice.finish_reason.as_deref() == Some("tool_calls")
                                && !self.tool_calls_signaled
                            {
                                self.tool_calls_signaled = true;
                                on_event(StreamEvent::ToolCallsReady);
                            }
                        }
                    }
                    Err(e) => {
                        // Malformed frames are skipped, never fatal.
                        eprintln!("{}", format!("[AI] Skipping bad frame: {}", e).dimmed());
                    }
                }
            }
            "event" | "id" | "retry" => {
                if self.verbose {
                    eprintln!("{}", format!("[AI] SSE {}: {}", field, value).dimmed());
                }
            }
            _ => {
                if self.verbose {
                    eprintln!("{}", format!("[AI] Unknown SSE field: {}", field).dimmed());
                }
            }
        }

        false
    }

    pub fn finish(self) -> ChatOutcome {
        ChatOutcome {
            content: self.content,
            tool_calls: if self.accumulator.is_empty() {
                None
            } else {
                Some(self.accumulator.into_calls())
            },
        }
    }
}

pub async fn process_streaming_response(
    response: reqwest::Response,
    timeout_secs: u64,
    verbose: bool,
    on_event: &mut (dyn FnMut(StreamEvent<'_>) + Send),
) -> Result<ChatOutcome> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut incomplete_line = String::new();
    let mut consumer = SseConsumer::new(verbose);
    let chunk_timeout = Duration::from_secs(timeout_secs);

    loop {
        match timeout(chunk_timeout, stream.next()).await {
            Ok(Some(chunk)) => {
                let chunk = chunk.map_err(ChefChatError::NetworkError)?;
                let text = String::from_utf8_lossy(&chunk);
                incomplete_line.push_str(&text);
            }
            Ok(None) => break,
            Err(_) => {
                eprintln!(
                    "{}",
                    format!(
                        "Error: Connection timeout - no data received for {} seconds",
                        timeout_secs
                    )
                    .red()
                );
                return Err(ChefChatError::Timeout);
            }
        }

        // Find last newline to ensure we only process complete lines
        if let Some(last_newline_pos) = incomplete_line.rfind('\n') {
            buffer.push_str(&incomplete_line[..=last_newline_pos]);
            incomplete_line = incomplete_line[last_newline_pos + 1..].to_string();
        } else {
            continue;
        }

        // Process complete lines
        while let Some(line_end) = buffer.find('\n') {
            let line = buffer[..line_end].to_string();
            buffer = buffer[line_end + 1..].to_string();

            if consumer.feed_line(line.trim_end_matches('\r'), on_event) {
                return Ok(consumer.finish());
            }
        }
    }

    // Stream ended without [DONE]; return what accumulated.
    Ok(consumer.finish())
}

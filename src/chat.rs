//! Chat-completion client (Azure OpenAI wire format) and the
//! conversation loop that lets the model call into the toolbox.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::tools::{ToolDefinition, Toolbox};

pub const MAX_TOOL_ROUNDS: usize = 8;

const PERSONA: &str = "You are a helpful health assistant that can manage both exercises and meals. \
You can help users track their workouts, suggest new exercises, \
manage meal plans, and provide nutrition advice. Be positive and encouraging!";

pub fn system_prompt(today: NaiveDate) -> String {
    format!("{PERSONA} Today is {}.", today.format("%A, %B %-d, %Y"))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    pub role: String,
    // assistant messages that only call functions carry null content
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ApiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String, // JSON text
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a ToolDefinition,
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    messages: &'a [ApiMessage],
    tools: &'a [ApiTool<'a>],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiMessage,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Connection settings for a hosted chat deployment.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatSettings {
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

pub struct ChatClient {
    url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            url: settings.completions_url(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client: reqwest::Client::new(),
        }
    }

    async fn complete(
        &self,
        messages: &[ApiMessage],
        tools: &[ApiTool<'_>],
    ) -> Result<ApiMessage, ChatError> {
        let request = ApiRequest {
            messages,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, message });
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(ChatError::EmptyResponse)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Running history of one chat session.
pub struct Conversation {
    history: Vec<ApiMessage>,
    definitions: Vec<ToolDefinition>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            history: vec![ApiMessage::system(system_prompt)],
            definitions: Toolbox::definitions(),
        }
    }

    pub fn history(&self) -> &[ApiMessage] {
        &self.history
    }

    /// Send one user turn and return the assistant's final text.
    ///
    /// Function calls requested by the model are run against `toolbox`
    /// and fed back until the model answers in plain text. On failure the
    /// history keeps the user message but drops the partial exchange.
    pub async fn send(
        &mut self,
        client: &ChatClient,
        toolbox: &mut Toolbox,
        user_input: &str,
    ) -> Result<String, ChatError> {
        self.history.push(ApiMessage::user(user_input));
        let checkpoint = self.history.len();

        let result = self.run_turn(client, toolbox).await;
        if result.is_err() {
            self.history.truncate(checkpoint);
        }
        result
    }

    async fn run_turn(
        &mut self,
        client: &ChatClient,
        toolbox: &mut Toolbox,
    ) -> Result<String, ChatError> {
        let tools: Vec<ApiTool<'_>> = self
            .definitions
            .iter()
            .map(|function| ApiTool {
                tool_type: "function",
                function,
            })
            .collect();

        for _ in 0..MAX_TOOL_ROUNDS {
            let reply = client.complete(&self.history, &tools).await?;

            if reply.tool_calls.is_empty() {
                let text = reply.content.clone().unwrap_or_default();
                self.history.push(ApiMessage::assistant(text.clone()));
                return Ok(text);
            }

            let calls = reply.tool_calls.clone();
            self.history.push(reply);
            for call in calls {
                let output = invoke(toolbox, &call);
                self.history.push(ApiMessage::tool(call.id, output));
            }
        }

        Err(ChatError::TooManyToolRounds(MAX_TOOL_ROUNDS))
    }
}

// Run one requested function and render its result as message text.
fn invoke(toolbox: &mut Toolbox, call: &ToolCall) -> String {
    let name = &call.function.name;
    let args: Value = if call.function.arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!("unparsable arguments for {}: {}", name, e);
                return format!("Error: arguments are not valid JSON: {e}");
            }
        }
    };

    info!("model called {}", name);
    match toolbox.call(name, args) {
        Ok(Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(e) => {
            debug!("tool call rejected: {}", e);
            format!("Error: {e}")
        }
    }
}

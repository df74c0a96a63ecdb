//! Adapter between toolchat types and genai types
//!
//! Conversations go out as genai messages (assistant tool calls and tool
//! responses included) and genai stream events come back as `Fragment`s.

use std::collections::HashSet;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatStreamEvent, ContentPart,
    MessageContent, Tool as GenaiTool, ToolCall as GenaiToolCall,
    ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use crate::types::{ChatMessage, EmptyArgumentsPolicy, Fragment, MessageRole, ToolCall, ToolDescriptor};

use super::error::ProviderResult;
use super::traits::{ProviderModelConfig, StreamChatOptions};

// ============================================================================
// Message Conversion: toolchat -> genai
// ============================================================================

fn to_genai_tool_call(call: &ToolCall) -> ProviderResult<GenaiToolCall> {
    // The provider APIs want an object here even when the model sent garbage;
    // the matching tool message already carries the argument error.
    let arguments = call
        .parse_arguments(EmptyArgumentsPolicy::EmptyObject)
        .unwrap_or_else(|_| json!({}));

    Ok(serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": arguments,
    }))?)
}

/// Convert one message.
///
/// An assistant turn that carries tool calls becomes a single multi-part
/// message: its text first (when there is any), then one part per call.
pub fn to_genai_message(msg: ChatMessage) -> ProviderResult<GenaiMessage> {
    let converted = match msg.role {
        MessageRole::System => GenaiMessage::system(msg.content),
        MessageRole::User => GenaiMessage::user(msg.content),
        MessageRole::Assistant if msg.tool_calls.is_empty() => GenaiMessage::assistant(msg.content),
        MessageRole::Assistant => {
            let mut parts = Vec::with_capacity(msg.tool_calls.len() + 1);
            if !msg.content.is_empty() {
                parts.push(ContentPart::Text(msg.content));
            }
            for call in &msg.tool_calls {
                parts.push(ContentPart::ToolCall(to_genai_tool_call(call)?));
            }
            GenaiMessage::assistant(MessageContent::from_parts(parts))
        }
        MessageRole::Tool => {
            let call_id = msg.tool_call_id.unwrap_or_default();
            GenaiMessage::from(GenaiToolResponse::new(call_id, msg.content))
        }
    };
    Ok(converted)
}

/// Convert a conversation to genai messages
pub fn to_genai_messages(messages: Vec<ChatMessage>) -> ProviderResult<Vec<GenaiMessage>> {
    messages.into_iter().map(to_genai_message).collect()
}

// ============================================================================
// Tool Conversion: toolchat -> genai
// ============================================================================

/// Convert a catalog entry to a genai Tool, keeping the qualified name
pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(&tool.qualified_name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema.clone())
}

/// Convert the catalog to genai tools
pub fn to_genai_tools(tools: &[ToolDescriptor]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolchat -> genai
// ============================================================================

/// Convert StreamChatOptions to genai ChatOptions
pub fn to_genai_options(options: &StreamChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Calls that were never streamed as chunks still show up at the end
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Stream Conversion: genai -> toolchat
// ============================================================================

/// Turns genai stream events into fragments.
///
/// genai reports a streamed tool call as repeated chunks carrying the same
/// call id. Depending on the adapter, the argument value is either the text
/// accumulated so far, a bare delta, or an already-parsed object; the mapper
/// emits only the part not yet forwarded.
#[derive(Debug, Default)]
pub struct FragmentMapper {
    current: Option<String>,
    named: bool,
    forwarded: String,
    seen: HashSet<String>,
}

impl FragmentMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one genai event
    pub fn map_event(&mut self, event: ChatStreamEvent) -> Vec<Fragment> {
        match event {
            ChatStreamEvent::Chunk(chunk) => self.on_text(chunk.content).into_iter().collect(),
            ChatStreamEvent::ToolCallChunk(chunk) => {
                let call = chunk.tool_call;
                self.on_tool_call(&call.call_id, &call.fn_name, &call.fn_arguments)
            }
            ChatStreamEvent::End(end) => {
                let mut fragments = Vec::new();
                if let Some(calls) = end.captured_tool_calls() {
                    for call in calls {
                        fragments.extend(self.on_captured_call(
                            &call.call_id,
                            &call.fn_name,
                            &call.fn_arguments,
                        ));
                    }
                }
                fragments
            }
            _ => Vec::new(),
        }
    }

    /// Assistant text
    pub fn on_text(&mut self, text: String) -> Option<Fragment> {
        if text.is_empty() {
            None
        } else {
            Some(Fragment::Content(text))
        }
    }

    /// A streamed tool-call chunk
    pub fn on_tool_call(&mut self, call_id: &str, fn_name: &str, arguments: &Value) -> Vec<Fragment> {
        let mut fragments = Vec::new();

        if self.current.as_deref() != Some(call_id) {
            self.current = Some(call_id.to_string());
            self.named = false;
            self.forwarded.clear();
            self.seen.insert(call_id.to_string());
            fragments.push(Fragment::call_id(call_id));
        }

        if !self.named && !fn_name.is_empty() {
            self.named = true;
            fragments.push(Fragment::name(fn_name));
        }

        let text = argument_text(arguments);
        let delta = match text.strip_prefix(self.forwarded.as_str()) {
            Some(suffix) => {
                let suffix = suffix.to_string();
                self.forwarded = text;
                suffix
            }
            None => {
                self.forwarded.push_str(&text);
                text
            }
        };
        if !delta.is_empty() {
            fragments.push(Fragment::ArgsDelta(delta));
        }

        fragments
    }

    /// A complete call reported at stream end; ignored if it was streamed
    pub fn on_captured_call(&mut self, call_id: &str, fn_name: &str, arguments: &Value) -> Vec<Fragment> {
        if self.seen.contains(call_id) {
            return Vec::new();
        }
        self.on_tool_call(call_id, fn_name, arguments)
    }
}

fn argument_text(arguments: &Value) -> String {
    match arguments {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Client Creation
// ============================================================================

/// OpenAI-compatible services genai does not know by name
fn openai_compatible_endpoint(provider: &str) -> Option<&'static str> {
    match provider {
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        _ => None,
    }
}

/// Provider prefix of a model string (`openrouter/x` -> `openrouter`)
pub fn extract_provider(model: &str) -> Option<&str> {
    model.split_once('/').map(|(provider, _)| provider)
}

/// Model name without its provider prefix (`openai/gpt-4o` -> `gpt-4o`)
pub fn extract_model_name(model: &str) -> &str {
    model.split_once('/').map(|(_, name)| name).unwrap_or(model)
}

/// Create a genai Client for `config`.
///
/// Without an explicit key genai falls back to its usual environment
/// variables. `api_base` (or a known OpenAI-compatible prefix) redirects the
/// request to another endpoint.
pub fn create_client(config: &ProviderModelConfig) -> Client {
    let mut builder = Client::builder();

    if let Some(key) = config.api_key.clone() {
        builder = builder.with_auth_resolver(AuthResolver::from_resolver_fn(
            move |_model_iden: ModelIden| Ok(Some(AuthData::from_single(key.clone()))),
        ));
    }

    let provider = extract_provider(&config.model).map(str::to_lowercase);
    let compat = provider.as_deref().and_then(openai_compatible_endpoint);
    let endpoint = config.api_base.clone().or_else(|| compat.map(str::to_string));

    if let Some(endpoint) = endpoint {
        let force_openai = compat.is_some();
        builder = builder.with_service_target_resolver(ServiceTargetResolver::from_resolver_fn(
            move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                let ServiceTarget { auth, model, .. } = target;
                let model = if force_openai {
                    ModelIden::new(AdapterKind::OpenAI, model.model_name.clone())
                } else {
                    model
                };
                Ok(ServiceTarget {
                    endpoint: Endpoint::from_owned(endpoint.clone()),
                    auth,
                    model,
                })
            },
        ));
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai::chat::ChatRole as GenaiRole;

    #[test]
    fn test_message_conversion() {
        let converted = to_genai_message(ChatMessage::user("Hello, world!")).unwrap();
        assert!(matches!(converted.role, GenaiRole::User));
        assert_eq!(converted.content.first_text(), Some("Hello, world!"));
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let call = ToolCall::new("c1", "fs_list_dir", r#"{"path":"/tmp"}"#);
        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("list /tmp"),
            ChatMessage::assistant_tool_calls("Looking.", vec![call]),
            ChatMessage::tool("c1", "a.txt\nb.txt"),
        ];

        let converted = to_genai_messages(messages).unwrap();
        assert_eq!(converted.len(), 4);
        assert!(matches!(converted[0].role, GenaiRole::System));
        assert!(matches!(converted[1].role, GenaiRole::User));
        assert!(matches!(converted[2].role, GenaiRole::Assistant));
        assert!(matches!(converted[3].role, GenaiRole::Tool));
    }

    #[test]
    fn test_assistant_text_and_calls_share_one_message() {
        let calls = vec![
            ToolCall::new("c1", "fs_list_dir", r#"{"path":"/tmp"}"#),
            ToolCall::new("c2", "fs_stat", ""),
        ];
        let converted =
            to_genai_message(ChatMessage::assistant_tool_calls("Looking.", calls)).unwrap();

        assert!(matches!(converted.role, GenaiRole::Assistant));
        assert_eq!(converted.content.texts(), vec!["Looking."]);
        let ids: Vec<_> = converted
            .content
            .tool_calls()
            .into_iter()
            .map(|c| c.call_id.clone())
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!(matches!(converted.content.parts()[0], ContentPart::Text(_)));
    }

    #[test]
    fn test_tool_call_with_bad_arguments_still_converts() {
        let call = ToolCall::new("c1", "fs_read", r#"{"path":"#);
        let converted = to_genai_message(ChatMessage::assistant_tool_calls("", vec![call])).unwrap();
        assert!(converted.content.texts().is_empty());
        assert_eq!(converted.content.tool_calls()[0].fn_arguments, serde_json::json!({}));
    }

    #[test]
    fn test_tool_conversion() {
        let tool = ToolDescriptor {
            qualified_name: "weather_get".to_string(),
            description: "Get weather for a location".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "location": { "type": "string" } }
            }),
            server_id: "weather".to_string(),
            original_name: "get".to_string(),
        };

        let genai_tool = to_genai_tool(&tool);
        assert_eq!(genai_tool.name, "weather_get");
    }

    #[test]
    fn test_mapper_cumulative_arguments() {
        let mut mapper = FragmentMapper::new();
        let mut out = mapper.on_tool_call("c1", "fs_list_dir", &json!(""));
        out.extend(mapper.on_tool_call("c1", "fs_list_dir", &json!("{\"pa")));
        out.extend(mapper.on_tool_call("c1", "fs_list_dir", &json!("{\"path\":\"/tmp\"}")));

        assert_eq!(
            out,
            vec![
                Fragment::call_id("c1"),
                Fragment::name("fs_list_dir"),
                Fragment::args_delta("{\"pa"),
                Fragment::args_delta("th\":\"/tmp\"}"),
            ]
        );
    }

    #[test]
    fn test_mapper_delta_arguments() {
        let mut mapper = FragmentMapper::new();
        let mut out = mapper.on_tool_call("c1", "fs_read", &json!("{\"path\""));
        out.extend(mapper.on_tool_call("c1", "", &json!(":\"a\"}")));

        let args: String = out
            .iter()
            .filter_map(|f| match f {
                Fragment::ArgsDelta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(args, "{\"path\":\"a\"}");
    }

    #[test]
    fn test_mapper_parsed_arguments_and_second_call() {
        let mut mapper = FragmentMapper::new();
        let mut out = mapper.on_tool_call("c1", "clock_now", &json!({}));
        out.extend(mapper.on_tool_call("c2", "fs_read", &json!({"path": "x"})));

        assert_eq!(
            out,
            vec![
                Fragment::call_id("c1"),
                Fragment::name("clock_now"),
                Fragment::args_delta("{}"),
                Fragment::call_id("c2"),
                Fragment::name("fs_read"),
                Fragment::args_delta(r#"{"path":"x"}"#),
            ]
        );
    }

    #[test]
    fn test_mapper_captured_calls_not_duplicated() {
        let mut mapper = FragmentMapper::new();
        mapper.on_tool_call("c1", "fs_read", &json!("{}"));

        assert!(mapper.on_captured_call("c1", "fs_read", &json!({})).is_empty());
        assert_eq!(
            mapper.on_captured_call("c2", "fs_stat", &Value::Null),
            vec![Fragment::call_id("c2"), Fragment::name("fs_stat")]
        );
    }

    #[test]
    fn test_mapper_skips_empty_text() {
        let mut mapper = FragmentMapper::new();
        assert_eq!(mapper.on_text(String::new()), None);
        assert_eq!(mapper.on_text("hi".into()), Some(Fragment::content("hi")));
    }

    #[test]
    fn test_model_name_parsing() {
        assert_eq!(extract_provider("openrouter/meta/llama"), Some("openrouter"));
        assert_eq!(extract_provider("gpt-4o"), None);
        assert_eq!(extract_model_name("openai/gpt-4o"), "gpt-4o");
        assert_eq!(extract_model_name("openrouter/meta/llama"), "meta/llama");
        assert_eq!(extract_model_name("claude-3-5-sonnet-latest"), "claude-3-5-sonnet-latest");
    }
}

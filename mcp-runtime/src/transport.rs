use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::tools::{OperationIntent, ToolId, operation_intent};
use crate::{ServeArgs, ToolError, to_pretty_json};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Post an action envelope to the n8n relay, which performs the
    /// Trello call on our behalf.
    Relay,
    /// Call the Trello REST API directly.
    Direct,
}

impl Backend {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Backend::Relay => "relay",
            Backend::Direct => "direct",
        }
    }
}

/// Two opaque Trello credential strings, immutable after startup.
#[derive(Clone, Debug)]
pub(crate) struct Credentials {
    api_key: String,
    api_token: String,
}

impl Credentials {
    pub(crate) fn require(
        api_key: Option<String>,
        api_token: Option<String>,
    ) -> Result<Self, String> {
        match (api_key, api_token) {
            (Some(api_key), Some(api_token)) => Ok(Self { api_key, api_token }),
            _ => Err(
                "TRELLO_API_KEY and TRELLO_API_TOKEN environment variables are required."
                    .to_string(),
            ),
        }
    }
}

/// The transport is chosen once at startup and held for the process
/// lifetime; tool calls never branch on deployment mode themselves.
pub(crate) enum Transport {
    Relay(RelayTransport),
    Direct(DirectTransport),
}

impl Transport {
    pub(crate) fn new(args: &ServeArgs, credentials: Credentials) -> Self {
        let http = reqwest::Client::new();
        match args.backend {
            Backend::Relay => Transport::Relay(RelayTransport {
                http,
                relay_url: args.relay_url.clone(),
                credentials,
            }),
            Backend::Direct => Transport::Direct(DirectTransport {
                http,
                base_url: args.api_base_url.clone(),
                credentials,
            }),
        }
    }

    pub(crate) fn backend(&self) -> Backend {
        match self {
            Transport::Relay(_) => Backend::Relay,
            Transport::Direct(_) => Backend::Direct,
        }
    }

    /// Exactly one outbound call per invocation; no retry, no timeout.
    pub(crate) async fn execute(
        &self,
        tool: ToolId,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match self {
            Transport::Relay(relay) => relay.execute(tool, args).await,
            Transport::Direct(direct) => {
                let intent = operation_intent(tool, args)?;
                direct.execute(intent).await
            }
        }
    }
}

pub(crate) struct RelayTransport {
    http: reqwest::Client,
    relay_url: String,
    credentials: Credentials,
}

impl RelayTransport {
    async fn execute(
        &self,
        tool: ToolId,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let envelope = relay_envelope(tool, args, &self.credentials);
        let response = self
            .http
            .post(&self.relay_url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                ToolError::new(
                    "transport_error",
                    format!("Failed to reach relay at {}: {e}", self.relay_url),
                )
                .with_docs_hint(
                    "Ensure the relay workflow is running and TRELLO_RELAY_URL points to it.",
                )
            })?;

        let body: Value = response.json().await.map_err(|e| {
            ToolError::new(
                "transport_error",
                format!("Relay returned a non-JSON response: {e}"),
            )
        })?;
        relay_outcome(body)
    }
}

/// Wire shape posted to the relay. The relay receives the raw tool
/// arguments plus the fixed action name; it owns the REST translation in
/// this deployment.
#[derive(Serialize)]
struct RelayEnvelope<'a> {
    action: &'static str,
    params: &'a Map<String, Value>,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    #[serde(rename = "apiToken")]
    api_token: &'a str,
}

fn relay_envelope<'a>(
    tool: ToolId,
    args: &'a Map<String, Value>,
    credentials: &'a Credentials,
) -> RelayEnvelope<'a> {
    RelayEnvelope {
        action: tool.action_name(),
        params: args,
        api_key: &credentials.api_key,
        api_token: &credentials.api_token,
    }
}

/// Collapses the relay's `{success, data|error}` envelope. A missing or
/// false `success` is a remote failure.
fn relay_outcome(body: Value) -> Result<Value, ToolError> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body.get("data").cloned().unwrap_or(Value::Null));
    }
    let detail = body.get("error").cloned().unwrap_or(Value::Null);
    Err(ToolError::new(
        "remote_error",
        format!("Trello API error: {}", to_pretty_json(&detail)),
    ))
}

pub(crate) struct DirectTransport {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl DirectTransport {
    async fn execute(&self, intent: OperationIntent) -> Result<Value, ToolError> {
        let mut url = reqwest::Url::parse(&format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            intent.path
        ))
        .map_err(|e| ToolError::new("transport_error", format!("Invalid API URL/path: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", &self.credentials.api_key)
            .append_pair("token", &self.credentials.api_token);

        let mut request = self.http.request(intent.method, url);
        if let Some(body) = &intent.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            ToolError::new(
                "transport_error",
                format!("Failed to reach Trello API at {}: {e}", self.base_url),
            )
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            ToolError::new(
                "transport_error",
                format!("Failed to read Trello API response body: {e}"),
            )
        })?;
        direct_outcome(status, &bytes)
    }
}

/// Collapses a direct HTTP outcome: any non-2xx status is a remote error
/// whose message carries the status and the raw response text.
fn direct_outcome(status: u16, bytes: &[u8]) -> Result<Value, ToolError> {
    if !(200..=299).contains(&status) {
        let text = String::from_utf8_lossy(bytes);
        return Err(ToolError::new(
            "remote_error",
            format!("Trello API error {status}: {}", text.trim()),
        ));
    }
    Ok(parse_response_body(bytes))
}

/// Trello replies with JSON on success; anything unparseable is kept as
/// raw text rather than dropped.
fn parse_response_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

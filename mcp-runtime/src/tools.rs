use std::sync::{Arc, RwLock};

use clap::Args;
use icora_core::auth::{AccessToken, AuthConfig, normalize_base_url};
use icora_core::error::IntentError;
use icora_core::intent::{IntentRequest, build_intent_payload};
use icora_core::tool::ToolResult;
use serde_json::{Map, Value, json};

use crate::token::TokenManager;
use crate::util::{PROBE_TIMEOUT, REQUEST_TIMEOUT, body_text, client, parse_response_body, to_pretty_json};

/// Shown by health checks until a real WireMock URL is configured.
pub const DEFAULT_WIREMOCK_URL: &str = "https://YOUR_WIREMOCK_FUNCTION_URL";

const TOKEN_PREVIEW_CHARS: usize = 20;

/// Fallback values for `icoraintent_configure_auth` arguments.
#[derive(Args, Clone, Debug)]
pub struct AuthDefaults {
    /// Base URL of the WireMock backend
    #[arg(long, env = "WIREMOCK_FUNCTION_URL", default_value = DEFAULT_WIREMOCK_URL)]
    pub wiremock_url: String,
    /// OAuth client id
    #[arg(long, env = "OAUTH_CLIENT_ID", default_value = "test-client")]
    pub client_id: String,
    /// OAuth client secret
    #[arg(long, env = "OAUTH_CLIENT_SECRET", default_value = "test-secret", hide_env_values = true)]
    pub client_secret: String,
    /// Password-grant username
    #[arg(long, env = "OAUTH_USERNAME", default_value = "test-user")]
    pub username: String,
    /// Password-grant password
    #[arg(long, env = "OAUTH_PASSWORD", default_value = "test-password", hide_env_values = true)]
    pub password: String,
    /// Optional OAuth scope
    #[arg(long, env = "OAUTH_SCOPE")]
    pub scope: Option<String>,
}

impl Default for AuthDefaults {
    fn default() -> Self {
        Self {
            wiremock_url: DEFAULT_WIREMOCK_URL.to_string(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            username: "test-user".to_string(),
            password: "test-password".to_string(),
            scope: None,
        }
    }
}

impl AuthDefaults {
    pub fn has_real_wiremock_url(&self) -> bool {
        let url = self.wiremock_url.trim();
        !url.is_empty() && url != DEFAULT_WIREMOCK_URL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ConfigureAuth,
    TestAuth,
    CreateIntent,
    CheckConnectivity,
    HealthCheck,
    ListTools,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::ConfigureAuth,
        Tool::TestAuth,
        Tool::CreateIntent,
        Tool::CheckConnectivity,
        Tool::HealthCheck,
        Tool::ListTools,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ConfigureAuth => "icoraintent_configure_auth",
            Tool::TestAuth => "icoraintent_test_auth",
            Tool::CreateIntent => "icoraintent_create_intent",
            Tool::CheckConnectivity => "check_connectivity",
            Tool::HealthCheck => "health_check",
            Tool::ListTools => "list_tools",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::ConfigureAuth => "Configure TMF921 API authentication against a WireMock backend",
            Tool::TestAuth => "Test authentication by acquiring an access token",
            Tool::CreateIntent => "Create a network intent (TMF921) on the configured backend",
            Tool::CheckConnectivity => "Check connectivity to the WireMock backend",
            Tool::HealthCheck => "Check this MCP server's health",
            Tool::ListTools => "List all available tools",
        }
    }

    pub fn input_schema(self) -> Value {
        match self {
            Tool::ConfigureAuth => json!({
                "type": "object",
                "properties": {
                    "wiremockUrl": { "type": "string" },
                    "clientId": { "type": "string" },
                    "clientSecret": { "type": "string" },
                    "username": { "type": "string" },
                    "password": { "type": "string" },
                    "scope": { "type": "string" }
                },
                "additionalProperties": false
            }),
            Tool::CreateIntent => json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "intentType": {
                        "type": "string",
                        "enum": ["EventLiveBroadcast", "VideoConference", "DataTransfer"],
                        "default": "EventLiveBroadcast"
                    },
                    "deliveryExpectations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "target": { "type": "string" },
                                "params": { "type": "object" }
                            },
                            "required": ["target"]
                        }
                    },
                    "serviceArea": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "longitude": { "type": "number" },
                                "latitude": { "type": "number" }
                            },
                            "required": ["longitude", "latitude"]
                        }
                    },
                    "validFor": {
                        "type": "object",
                        "properties": {
                            "startDateTime": { "type": "string" },
                            "endDateTime": { "type": "string" }
                        },
                        "required": ["startDateTime", "endDateTime"]
                    },
                    "propertyExpectations": { "type": "array" }
                },
                "required": ["name", "description"]
            }),
            _ => json!({ "type": "object", "properties": {} }),
        }
    }
}

struct Connection {
    base_url: String,
    tokens: Arc<TokenManager>,
}

/// Process-wide tool state: default credentials, one HTTP client, and the
/// currently installed backend connection. Shared by reference with every
/// dispatch; `icoraintent_configure_auth` swaps the connection atomically.
pub struct ToolContext {
    defaults: AuthDefaults,
    http: reqwest::Client,
    connection: RwLock<Option<Arc<Connection>>>,
}

impl ToolContext {
    pub fn new(defaults: AuthDefaults) -> Self {
        Self {
            defaults,
            http: client(),
            connection: RwLock::new(None),
        }
    }

    /// Like [`ToolContext::new`], but installs a connection right away when the
    /// defaults name a real WireMock URL.
    pub fn with_startup_config(defaults: AuthDefaults) -> Self {
        let ctx = Self::new(defaults);
        if ctx.defaults.has_real_wiremock_url() {
            match ctx.configure_auth(&Map::new()) {
                Ok(_) => tracing::info!(
                    event = "auth_auto_configured",
                    wiremock_url = %ctx.defaults.wiremock_url,
                    "Auto-configured from environment"
                ),
                Err(err) => tracing::warn!(
                    event = "auth_auto_configure_failed",
                    error = %err,
                    "Auto-configuration failed"
                ),
            }
        }
        ctx
    }

    pub fn defaults(&self) -> &AuthDefaults {
        &self.defaults
    }

    pub fn base_url(&self) -> Option<String> {
        self.connection().map(|c| c.base_url.clone())
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn require_connection(&self) -> Result<Arc<Connection>, IntentError> {
        self.connection().ok_or_else(IntentError::not_configured)
    }

    /// Run `tool` and fold any failure into the error envelope.
    pub async fn dispatch(&self, tool: Tool, args: &Map<String, Value>) -> ToolResult {
        let outcome = match tool {
            Tool::ConfigureAuth => self.configure_auth(args),
            Tool::TestAuth => self.test_auth().await,
            Tool::CreateIntent => self.create_intent(args).await,
            Tool::CheckConnectivity => self.check_connectivity().await,
            Tool::HealthCheck => Ok(self.health_check()),
            Tool::ListTools => Ok(self.list_tools()),
        };
        if let Err(err) = &outcome {
            tracing::warn!(event = "tool_call_failed", tool = tool.name(), error = %err, "Tool call failed");
        }
        ToolResult::from(outcome)
    }

    pub fn configure_auth(&self, args: &Map<String, Value>) -> Result<String, IntentError> {
        let d = &self.defaults;
        let wiremock_url = arg_string(args, "wiremockUrl", &d.wiremock_url)?;
        let base_url = normalize_base_url(&wiremock_url)?;
        let scope = match arg_optional_string(args, "scope")? {
            Some(scope) => Some(scope),
            None => d.scope.clone(),
        };
        let config = AuthConfig::for_wiremock(
            &base_url,
            arg_string(args, "clientId", &d.client_id)?,
            arg_string(args, "clientSecret", &d.client_secret)?,
            arg_string(args, "username", &d.username)?,
            arg_string(args, "password", &d.password)?,
            scope,
        )?;

        let connection = Connection {
            base_url: base_url.clone(),
            tokens: Arc::new(TokenManager::new(config, self.http.clone())),
        };
        *self.connection.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(connection));

        tracing::info!(event = "auth_configured", wiremock_url = %base_url, "Configured WireMock backend");
        Ok(format!(
            "icora intent TMF921 authentication configured for: {base_url}"
        ))
    }

    pub async fn test_auth(&self) -> Result<String, IntentError> {
        let connection = self.require_connection()?;
        let token = connection.tokens.valid_token().await?;
        Ok(format!(
            "Authentication successful! Token: {}...",
            AccessToken::preview(&token, TOKEN_PREVIEW_CHARS)
        ))
    }

    pub async fn create_intent(&self, args: &Map<String, Value>) -> Result<String, IntentError> {
        let connection = self.require_connection()?;
        let request = IntentRequest::from_arguments(Value::Object(args.clone()))?;
        self.submit_intent(&connection, &request).await
    }

    async fn submit_intent(
        &self,
        connection: &Connection,
        request: &IntentRequest,
    ) -> Result<String, IntentError> {
        let token = connection.tokens.valid_token().await?;
        let payload = build_intent_payload(request);
        let intent_url = format!("{}/intent/", connection.base_url);
        tracing::info!(event = "intent_create", url = %intent_url, name = %request.name, "Creating intent");

        let resp = self
            .http
            .post(&intent_url)
            .bearer_auth(&token)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| IntentError::Transport(format!("Error creating intent at {intent_url}: {e}")))?;

        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("N/A")
            .to_string();
        let body = body_text(resp).await;

        if status != 201 {
            tracing::error!(event = "intent_create_failed", status, "Intent creation failed");
            return Err(IntentError::Backend { status, body });
        }

        tracing::info!(event = "intent_created", location = %location, "Intent created");
        Ok(format!(
            "Intent created successfully!\nLocation: {location}\nResponse: {}",
            to_pretty_json(&parse_response_body(&body))
        ))
    }

    pub async fn check_connectivity(&self) -> Result<String, IntentError> {
        let target = self
            .base_url()
            .unwrap_or_else(|| self.defaults.wiremock_url.trim_end_matches('/').to_string());

        let health = self
            .http
            .get(format!("{target}/health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| IntentError::Transport(format!("Cannot reach WireMock at {target}: {e}")))?;

        let status = health.status().as_u16();
        if status != 200 {
            return Err(IntentError::Backend {
                status,
                body: format!("WireMock not responding at {target}"),
            });
        }

        match self.count_mappings(&target).await {
            Some(count) => Ok(format!(
                "WireMock fully accessible! {count} mappings loaded at {target}"
            )),
            None => Ok(format!(
                "WireMock responding but admin not accessible at {target}"
            )),
        }
    }

    async fn count_mappings(&self, target: &str) -> Option<usize> {
        let resp = self
            .http
            .get(format!("{target}/__admin/mappings"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()?;
        if resp.status().as_u16() != 200 {
            return None;
        }
        let body: Value = resp.json().await.ok()?;
        Some(body.get("mappings").and_then(Value::as_array).map_or(0, Vec::len))
    }

    pub fn health_check(&self) -> String {
        let wiremock = self
            .base_url()
            .unwrap_or_else(|| self.defaults.wiremock_url.clone());
        format!("icora intent TMF921 MCP server is healthy! WireMock: {wiremock}")
    }

    pub fn list_tools(&self) -> String {
        let lines: Vec<String> = Tool::ALL
            .iter()
            .map(|tool| format!("• {} - {}", tool.name(), tool.description()))
            .collect();
        format!("Available tools:\n{}", lines.join("\n"))
    }
}

fn arg_string(args: &Map<String, Value>, key: &str, default: &str) -> Result<String, IntentError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(IntentError::validation(format!("'{key}' must be a string"))),
    }
}

fn arg_optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, IntentError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(IntentError::validation(format!("'{key}' must be a string"))),
    }
}

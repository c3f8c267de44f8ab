//! Tools: the local capabilities the model may ask for.
//!
//! A tool is a [`ToolSpec`]: a unique name, a description for the model, an
//! [`InputSchema`] listing its named parameters, and a handler. Specs live in
//! a [`ToolRegistry`] that is filled once at startup and only read afterwards.

use async_trait::async_trait;
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ToolError;
use crate::provider::ToolDeclaration;

/// A request to execute a tool, as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque id chosen by the model; echoed by the matching [`ToolResult`].
    pub call_id: String,

    /// Name of the tool to execute
    pub tool_name: String,

    /// Arguments as the model sent them. Expected to be a JSON object.
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// The outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub status: ToolStatus,

    /// Tool output on success, error description on failure.
    pub payload: Value,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Ok,
            payload,
        }
    }

    pub fn error(call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            status: ToolStatus::Error,
            payload: Value::String(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    /// The payload as text for the wire: strings verbatim, anything else as JSON.
    pub fn payload_text(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// JSON type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    /// Convert near-miss values (a number sent as a string, etc.) to this kind.
    /// Values that cannot be converted are returned untouched for the schema
    /// check to reject.
    fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (ParamKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(s),
            },
            (ParamKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(s)),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(s),
            },
            (ParamKind::String, Value::Number(n)) => Value::String(n.to_string()),
            (ParamKind::String, Value::Bool(b)) => Value::String(b.to_string()),
            (_, other) => other,
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Whether undeclared arguments are tolerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaPolicy {
    /// Extra arguments are ignored.
    #[default]
    Lenient,
    /// Extra arguments fail validation.
    Strict,
}

/// The declared parameters of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required parameter.
    pub fn required(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        });
        self
    }

    /// Declare an optional parameter.
    pub fn optional(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Render as a JSON Schema object, the form both the model and the
    /// validator understand.
    pub fn to_json_schema(&self, policy: SchemaPolicy) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind.json_type(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        });
        if policy == SchemaPolicy::Strict {
            schema["additionalProperties"] = Value::Bool(false);
        }
        schema
    }

    fn coerce(&self, mut arguments: Map<String, Value>) -> Map<String, Value> {
        for param in &self.params {
            if let Some(value) = arguments.remove(&param.name) {
                arguments.insert(param.name.clone(), param.kind.coerce(value));
            }
        }
        arguments
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArgs {
    tool_name: String,
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn new(tool_name: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            values,
        }
    }

    /// A string parameter the schema marks as required.
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name).ok_or_else(|| ToolError::Validation {
            tool_name: self.tool_name.clone(),
            reason: format!("missing string argument '{name}'"),
        })
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn opt_u64(&self, name: &str) -> Option<u64> {
        self.values.get(name).and_then(Value::as_u64)
    }
}

/// The callable half of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with validated arguments.
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError>;

    /// Filesystem paths this call would touch, or `None` when unknown.
    ///
    /// Used to decide whether calls in one batch may run concurrently.
    fn fs_targets(&self, _arguments: &Value) -> Option<Vec<PathBuf>> {
        None
    }
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// A tool's declaration plus its handler.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Build a spec whose handler is an async closure.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        f: F,
    ) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self::new(name, description, input_schema, Arc::new(FnHandler(f)))
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

struct RegisteredTool {
    spec: ToolSpec,
    json_schema: Value,
    validator: JSONSchema,
}

/// A registry of available tools.
///
/// Filled once at startup, then shared read-only (`Arc<ToolRegistry>`):
/// 1. Declarations are sent to the model on every request
/// 2. The executor looks tools up and validates arguments against them
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    policy: SchemaPolicy,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_policy(SchemaPolicy::default())
    }

    pub fn with_policy(policy: SchemaPolicy) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), ToolError> {
        if self.index.contains_key(&spec.name) {
            return Err(ToolError::DuplicateTool(spec.name));
        }

        let json_schema = spec.input_schema.to_json_schema(self.policy);
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&json_schema)
            .map_err(|e| ToolError::InvalidSchema {
                tool_name: spec.name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(tool = %spec.name, "Registered tool");
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            spec,
            json_schema,
            validator,
        });
        Ok(())
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Result<&ToolSpec, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i].spec)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Resolve a request's tool and check its arguments against the schema.
    ///
    /// Never calls the handler.
    pub fn validate(&self, request: &ToolCallRequest) -> Result<(&ToolSpec, ToolArgs), ToolError> {
        let entry = self
            .index
            .get(&request.tool_name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;
        let spec = &entry.spec;

        let Value::Object(raw) = &request.arguments else {
            return Err(ToolError::Validation {
                tool_name: spec.name.clone(),
                reason: "arguments must be a JSON object".into(),
            });
        };

        let coerced = Value::Object(spec.input_schema.coerce(raw.clone()));
        if let Err(errors) = entry.validator.validate(&coerced) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            return Err(ToolError::Validation {
                tool_name: spec.name.clone(),
                reason: messages.join("; "),
            });
        }

        let Value::Object(values) = coerced else {
            return Err(ToolError::Validation {
                tool_name: spec.name.clone(),
                reason: "arguments must be a JSON object".into(),
            });
        };
        Ok((spec, ToolArgs::new(spec.name.clone(), values)))
    }

    /// Get all tool declarations (for sending to the model), in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|t| ToolDeclaration {
                name: t.spec.name.clone(),
                description: t.spec.description.clone(),
                input_schema: t.json_schema.clone(),
            })
            .collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

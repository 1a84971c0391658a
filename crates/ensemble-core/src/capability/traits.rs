use crate::error::EnsembleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub type CapabilityResult = Result<String, EnsembleError>;

/// Declarative description of a capability, as shown to the decision backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, args: Value) -> CapabilityResult;

    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Adapts a plain function of named arguments into a [`Capability`].
///
/// The function may block; it runs on tokio's blocking pool so the registry's
/// call timeout still applies.
pub struct FnCapability<F> {
    descriptor: CapabilityDescriptor,
    func: Arc<F>,
}

impl<F> FnCapability<F>
where
    F: Fn(&Value) -> CapabilityResult + Send + Sync + 'static,
{
    pub fn new(descriptor: CapabilityDescriptor, func: F) -> Self {
        Self {
            descriptor,
            func: Arc::new(func),
        }
    }
}

#[async_trait::async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(&Value) -> CapabilityResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters_schema(&self) -> Value {
        self.descriptor.parameters.clone()
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let func = self.func.clone();
        match tokio::task::spawn_blocking(move || func(&args)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(EnsembleError::execution(self.name(), "Capability panicked")),
            Err(e) => Err(EnsembleError::execution(self.name(), e.to_string())),
        }
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a Value, capability: &str, key: &str) -> Result<&'a str, EnsembleError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            EnsembleError::execution(capability, format!("Missing required parameter: {key}"))
        })
}

/// Schema for capabilities that take a list of required string parameters.
pub fn string_params_schema(params: &[(&str, &str)], required: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = params
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                serde_json::json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

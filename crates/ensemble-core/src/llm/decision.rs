use crate::error::EnsembleError;
use crate::llm::{LlmResponse, ToolCall};
use serde_json::Value;

/// What the backend decided to do with the current conversation.
#[derive(Debug, Clone)]
pub enum Decision {
    Invoke(CapabilityRequest),
    Answer(String),
}

/// A request to run one capability, with its arguments still in the
/// backend's serialized form.
#[derive(Debug, Clone)]
pub struct CapabilityRequest {
    pub call: ToolCall,
}

impl CapabilityRequest {
    pub fn capability(&self) -> &str {
        &self.call.function.name
    }

    /// Decode the argument payload. Empty payloads decode to an empty object;
    /// anything that is not a JSON object is a malformed request.
    pub fn arguments(&self) -> Result<Value, EnsembleError> {
        let raw = self.call.function.arguments.trim();
        if raw.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        let value = self.call.parse_arguments().map_err(|e| {
            EnsembleError::execution(self.capability(), format!("Malformed arguments: {e}"))
        })?;
        if !value.is_object() {
            return Err(EnsembleError::execution(
                self.capability(),
                format!("Arguments must be an object, got: {value}"),
            ));
        }
        Ok(value)
    }
}

impl Decision {
    /// Interpret a backend reply. Only the first tool call is honoured.
    pub fn from_response(response: LlmResponse) -> Self {
        let message = response.message;
        match message.tool_calls.and_then(|calls| calls.into_iter().next()) {
            Some(call) => Decision::Invoke(CapabilityRequest { call }),
            None => Decision::Answer(message.content),
        }
    }
}

use crate::capability::traits::{Capability, CapabilityResult};
use serde_json::Value;

fn no_params() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

pub struct GetTimeTool;

#[async_trait::async_trait]
impl Capability for GetTimeTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time (YYYY-MM-DD HH:MM:SS)."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn invoke(&self, _args: Value) -> CapabilityResult {
        Ok(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

pub struct GetDateTool;

#[async_trait::async_trait]
impl Capability for GetDateTool {
    fn name(&self) -> &str {
        "get_date"
    }

    fn description(&self) -> &str {
        "Get the current local date (YYYY-MM-DD)."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn invoke(&self, _args: Value) -> CapabilityResult {
        Ok(chrono::Local::now().format("%Y-%m-%d").to_string())
    }
}

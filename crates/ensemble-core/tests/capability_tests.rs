mod common;

use common::{answer, test_registry, ScriptedLlm};
use ensemble_core::capability::{
    builtin_registry, Capability, CapabilityDescriptor, CapabilityRegistry, CapabilityResult,
    TextTask, TextTransformTool, WebSearchTool,
};
use ensemble_core::config::ToolSettings;
use ensemble_core::llm::LlmClient;
use ensemble_core::EnsembleError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct SlowTool;

#[async_trait::async_trait]
impl Capability for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Never finishes in time"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _args: Value) -> CapabilityResult {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

struct PanicTool;

#[async_trait::async_trait]
impl Capability for PanicTool {
    fn name(&self) -> &str {
        "panics"
    }

    fn description(&self) -> &str {
        "Panics when invoked"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _args: Value) -> CapabilityResult {
        panic!("boom");
    }
}

fn builtin(settings: &ToolSettings) -> CapabilityRegistry {
    let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new());
    builtin_registry(settings, llm).unwrap()
}

#[tokio::test]
async fn test_unknown_capability_never_faults() {
    let registry = test_registry();
    for name in ["", "teleport", "ECHO", "echo ", "web_search"] {
        let err = registry.invoke(name, json!({})).await.unwrap_err();
        assert!(
            matches!(err, EnsembleError::UnknownCapability(ref n) if n == name),
            "{name}: {err}"
        );
        assert!(err.is_recoverable());
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let mut registry = test_registry();
    let err = registry
        .register_fn(
            CapabilityDescriptor::new("echo", "Second echo", json!({"type": "object"})),
            |_| Ok(String::new()),
        )
        .unwrap_err();
    assert!(matches!(err, EnsembleError::DuplicateCapability(ref n) if n == "echo"));
    assert!(!err.is_recoverable());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_resolve_keeps_registry_order_and_drops_unknown() {
    let registry = test_registry();
    let resolved = registry.resolve(&["fail", "ghost", "echo"]);
    let names: Vec<&str> = resolved.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_becomes_execution_error() {
    let mut registry = CapabilityRegistry::new().with_call_timeout(Duration::from_millis(50));
    registry.register(Box::new(SlowTool)).unwrap();

    let err = registry.invoke("slow", json!({})).await.unwrap_err();

    match err {
        EnsembleError::CapabilityExecution { capability, message } => {
            assert_eq!(capability, "slow");
            assert!(message.contains("Timed out"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_blocking_function_still_times_out() {
    let mut registry = CapabilityRegistry::new().with_call_timeout(Duration::from_millis(100));
    registry
        .register_fn(
            CapabilityDescriptor::new("sleepy", "Blocks its thread", json!({"type": "object"})),
            |_| {
                std::thread::sleep(Duration::from_secs(1));
                Ok("late".to_string())
            },
        )
        .unwrap();

    let started = std::time::Instant::now();
    let err = registry.invoke("sleepy", json!({})).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_millis(900), "{:?}", started.elapsed());
    match err {
        EnsembleError::CapabilityExecution { capability, message } => {
            assert_eq!(capability, "sleepy");
            assert!(message.contains("Timed out"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_panicking_function_becomes_execution_error() {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(
            CapabilityDescriptor::new("explodes", "Panics", json!({"type": "object"})),
            |_| panic!("boom"),
        )
        .unwrap();

    let err = registry.invoke("explodes", json!({})).await.unwrap_err();

    assert!(matches!(err, EnsembleError::CapabilityExecution { ref capability, .. } if capability == "explodes"));
}

#[tokio::test]
async fn test_panic_becomes_execution_error() {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(PanicTool)).unwrap();

    let err = registry.invoke("panics", json!({})).await.unwrap_err();

    assert!(matches!(err, EnsembleError::CapabilityExecution { .. }));
}

#[tokio::test]
async fn test_calculator_through_registry() {
    let registry = builtin(&ToolSettings::default());

    let four = registry
        .invoke("calculator", json!({"expression": "2+2"}))
        .await
        .unwrap();
    assert_eq!(four, "4");

    let rejected = registry
        .invoke("calculator", json!({"expression": "__import__('os')"}))
        .await
        .unwrap();
    assert!(rejected.starts_with("[Calculator error:"), "{rejected}");

    let missing = registry.invoke("calculator", json!({})).await.unwrap_err();
    assert!(matches!(missing, EnsembleError::CapabilityExecution { .. }));
}

#[tokio::test]
async fn test_clock_formats() {
    let registry = builtin(&ToolSettings::default());

    let time = registry.invoke("get_time", json!({})).await.unwrap();
    assert!(chrono::NaiveDateTime::parse_from_str(&time, "%Y-%m-%d %H:%M:%S").is_ok(), "{time}");

    let date = registry.invoke("get_date", json!({})).await.unwrap();
    assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok(), "{date}");
}

#[test]
fn test_builtin_set_and_sandbox_opt_in() {
    let defaults = builtin(&ToolSettings::default());
    assert_eq!(
        defaults.names(),
        vec![
            "web_search",
            "calculator",
            "summarize",
            "translate",
            "extract_entities",
            "sentiment_analysis",
            "get_time",
            "get_date",
            "wikipedia_search",
            "url_reader",
        ]
    );
    assert!(!defaults.contains("code_executor"));

    let mut settings = ToolSettings::default();
    settings.sandbox.enabled = true;
    let sandboxed = builtin(&settings);
    assert!(sandboxed.contains("code_executor"));
}

#[tokio::test]
async fn test_text_transform_delegates_to_llm() {
    let llm = Arc::new(ScriptedLlm::new().fallback(answer("  A short summary.  ")));
    let llm_dyn: Arc<dyn LlmClient> = llm.clone();
    let tool = TextTransformTool::new(TextTask::Summarize, llm_dyn);

    let output = tool.invoke(json!({"text": "The tide rises."})).await.unwrap();

    assert_eq!(output, "A short summary.");
    let prompt = "Summarize the following text in 2 sentences:\nThe tide rises.";
    assert_eq!(llm.conversations(prompt).len(), 1);
}

#[tokio::test]
async fn test_translate_requires_target_language() {
    let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new());
    let tool = TextTransformTool::new(TextTask::Translate, llm);

    let err = tool.invoke(json!({"text": "hola"})).await.unwrap_err();

    match err {
        EnsembleError::CapabilityExecution { message, .. } => {
            assert!(message.contains("target_language"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_web_search_without_key_is_execution_error() {
    let tool = WebSearchTool::new("ENSEMBLE_TEST_KEY_THAT_IS_NEVER_SET");

    let err = tool.invoke(json!({"query": "tides"})).await.unwrap_err();

    assert!(matches!(err, EnsembleError::CapabilityExecution { .. }));
}

#[test]
fn test_descriptors_match_capabilities() {
    let registry = builtin(&ToolSettings::default());
    for descriptor in registry.descriptors() {
        assert!(!descriptor.description.is_empty(), "{}", descriptor.name);
        assert_eq!(descriptor.parameters["type"], "object", "{}", descriptor.name);
    }
}

#![allow(dead_code)]

use ensemble_core::capability::{CapabilityDescriptor, CapabilityRegistry};
use ensemble_core::llm::{LlmClient, LlmResponse, Message, ToolCall};
use ensemble_core::EnsembleError;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(String),
    Call(String, Value),
    RawCall(String, String),
}

pub fn answer(text: &str) -> Reply {
    Reply::Answer(text.to_string())
}

pub fn call(capability: &str, args: Value) -> Reply {
    Reply::Call(capability.to_string(), args)
}

/// Mock backend that replies from a per-persona script, in order. Each chat
/// call is recorded so tests can inspect what an agent was shown.
pub struct ScriptedLlm {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Option<Reply>,
    seen: Mutex<Vec<(String, Vec<Message>)>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: None,
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue replies for the agent whose persona is `persona`.
    pub fn script(self, persona: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(persona.to_string(), replies.into());
        self
    }

    /// Reply used once a script runs dry.
    pub fn fallback(mut self, reply: Reply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Conversations shown to `persona`, one per chat call.
    pub fn conversations(&self, persona: &str) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == persona)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// The goal turn of the first call made for each `act` of `persona`.
    pub fn goals(&self, persona: &str) -> Vec<String> {
        self.conversations(persona)
            .iter()
            .filter(|m| m.len() == 2)
            .map(|m| m[1].content.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(
        &self,
        messages: &[Message],
        _capabilities: &[CapabilityDescriptor],
    ) -> Result<LlmResponse, EnsembleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let persona = messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.seen
            .lock()
            .unwrap()
            .push((persona.clone(), messages.to_vec()));

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&persona)
            .and_then(|queue| queue.pop_front())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Reply::Answer(format!("[unscripted reply for {persona}]")));

        let message = match reply {
            Reply::Answer(text) => Message::assistant(text),
            Reply::Call(name, args) => Message::assistant_with_tools(
                "",
                vec![ToolCall::new(format!("call_{n}"), name, args.to_string())],
            ),
            Reply::RawCall(name, raw) => Message::assistant_with_tools(
                "",
                vec![ToolCall::new(format!("call_{n}"), name, raw)],
            ),
        };
        Ok(LlmResponse {
            message,
            usage: None,
        })
    }
}

/// Registry with `echo` (returns its `text` argument) and `fail` (always errors).
pub fn test_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_fn(
            CapabilityDescriptor::new(
                "echo",
                "Echoes input",
                json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
            ),
            |args| {
                Ok(args
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string())
            },
        )
        .unwrap();
    registry
        .register_fn(
            CapabilityDescriptor::new("fail", "Always fails", json!({"type": "object"})),
            |_| Err(EnsembleError::execution("fail", "Intentional error")),
        )
        .unwrap();
    registry
}

pub fn shared(llm: ScriptedLlm) -> Arc<ScriptedLlm> {
    Arc::new(llm)
}

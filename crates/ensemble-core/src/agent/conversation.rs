use crate::llm::{Message, Role, ToolCall};
use crate::workspace::Envelope;

/// Ordered turns of one agent's conversation: persona first, then the goal,
/// then whatever the decision loop appends.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(persona: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(persona), Message::user(goal)],
        }
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Make `persona` the leading system turn, replacing any existing one.
    pub fn set_persona(&mut self, persona: impl Into<String>) {
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => first.content = persona.into(),
            _ => self.messages.insert(0, Message::system(persona)),
        }
    }

    pub fn persona(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_inbound(&mut self, envelope: &Envelope) {
        self.messages.push(Message::user(format!(
            "[Message from {}]: {}",
            envelope.from, envelope.content
        )));
    }

    pub fn add_tool_request(&mut self, content: impl Into<String>, call: ToolCall) {
        self.messages
            .push(Message::assistant_with_tools(content, vec![call]));
    }

    pub fn add_observation(
        &mut self,
        tool_call_id: impl Into<String>,
        capability: impl Into<String>,
        output: impl Into<String>,
    ) {
        self.messages
            .push(Message::tool_result(tool_call_id, capability, output));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

//! Centralized constants: limits, endpoints and well-known workspace keys.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5-20250929";
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
    pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
    pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";
    pub const DEFAULT_LMSTUDIO_MODEL: &str = "local-model";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
    pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";
    pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
    pub const LMSTUDIO_BASE_URL: &str = "http://localhost:1234";
    pub const SERPER_SEARCH_URL: &str = "https://google.serper.dev/search";
    pub const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
}

// ─── Default Settings ─────────────────────────────────────────────────────────

pub mod defaults {
    pub const MAX_TOKENS: u32 = 4096;

    pub const MAX_ITERATIONS: usize = 5;
    pub const SINGLE_AGENT_MAX_ITERATIONS: usize = 8;
    pub const MAX_REVISIONS: u32 = 3;
    pub const REVISION_MARKER: &str = "needs revision";
    pub const MAX_PARALLEL: usize = 4;

    pub const CALL_TIMEOUT_SECS: u64 = 20;
    pub const URL_MAX_CHARS: usize = 2000;
    pub const URL_TIMEOUT_SECS: u64 = 10;
    pub const SEARCH_API_KEY_ENV: &str = "SERPER_API_KEY";

    pub const SANDBOX_INTERPRETER: &str = "python3";
    pub const SANDBOX_TIMEOUT_SECS: u64 = 5;
    pub const SANDBOX_MAX_OUTPUT_CHARS: usize = 4000;
    pub const SANDBOX_CPU_SECONDS: u64 = 5;
    pub const SANDBOX_MEMORY_KB: u64 = 262_144;

    pub const USER_AGENT: &str = "Ensemble/0.1";
}

// ─── Workspace Keys ───────────────────────────────────────────────────────────

pub mod keys {
    /// Configured agent order, written by the orchestrator before the first hop.
    pub const PIPELINE: &str = "pipeline";
    /// Names of the agents that have run, one entry per hop.
    pub const HISTORY: &str = "history";

    pub fn inbox(agent: &str) -> String {
        format!("msg_{agent}")
    }

    pub fn last_tool_result(agent: &str) -> String {
        format!("{agent}_last_tool_result")
    }

    pub fn last_answer(agent: &str) -> String {
        format!("{agent}_last_answer")
    }
}

// ─── Agent Output ─────────────────────────────────────────────────────────────

/// Returned by an agent that used its whole iteration budget without answering.
pub const INCOMPLETE_ANSWER: &str = "[Agent did not complete the goal in time.]";

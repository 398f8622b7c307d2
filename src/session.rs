//! Session context for iai_core
//!
//! Request/response pairs with context passed explicitly into each prompt.
//! Nothing here persists across process restarts.

use crate::dispatcher::truncate_output;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Turns included when rendering context for the next prompt
const CONTEXT_TURNS: usize = 4;
/// Character budget per response inside the context block
const CONTEXT_RESPONSE_CHARS: usize = 500;

/// One query/response exchange
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

/// An in-memory conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: format!("iai-{}", Uuid::new_v4()),
            turns: Vec::new(),
        }
    }

    /// Continue under a caller-supplied session id
    pub fn resume(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
        }
    }

    pub fn record(&mut self, query: &str, response: &str) {
        self.turns.push(Turn {
            query: query.to_string(),
            response: response.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        });
    }

    /// Render the most recent turns as a context block for the next prompt.
    /// Long responses are clipped so the block stays bounded.
    pub fn context_block(&self) -> String {
        let start = self.turns.len().saturating_sub(CONTEXT_TURNS);
        self.turns[start..]
            .iter()
            .map(|turn| {
                format!(
                    "User: {}\nAssistant: {}",
                    turn.query,
                    truncate_output(&turn.response, CONTEXT_RESPONSE_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble the full prompt sent to the model
pub fn compose_prompt(system_prompt: &str, context: &str, query: &str) -> String {
    format!(
        "{}\n\nPrevious context: {}\n\nUser query: {}",
        system_prompt, context, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_id() {
        let session = Session::new();
        assert!(session.id.starts_with("iai-"));
        assert!(session.turns.is_empty());
    }

    #[test]
    fn test_record_and_context_block() {
        let mut session = Session::new();
        session.record("list rasters", "g.list type=raster");
        let block = session.context_block();
        assert!(block.contains("User: list rasters"));
        assert!(block.contains("Assistant: g.list type=raster"));
    }

    #[test]
    fn test_context_block_keeps_recent_turns_only() {
        let mut session = Session::new();
        for i in 0..6 {
            session.record(&format!("query {}", i), "ok");
        }
        let block = session.context_block();
        assert!(!block.contains("query 0"));
        assert!(!block.contains("query 1"));
        assert!(block.contains("query 2"));
        assert!(block.contains("query 5"));
    }

    #[test]
    fn test_context_block_clips_long_responses() {
        let mut session = Session::new();
        session.record("big", &"x".repeat(2000));
        let block = session.context_block();
        assert!(block.len() < 600);
        assert!(block.contains("..."));
    }

    #[test]
    fn test_compose_prompt_layout() {
        let prompt = compose_prompt("SYSTEM", "CTX", "what now");
        assert!(prompt.starts_with("SYSTEM"));
        assert!(prompt.contains("Previous context: CTX"));
        assert!(prompt.ends_with("User query: what now"));
    }
}

//! Command Dispatch Module for iai_core
//!
//! Routes extracted candidates to one of two execution backends: a
//! structured GRASS module invocation, or a raw process spawn for GDAL
//! tools and shell utilities. Candidates run strictly one at a time; a
//! failure is recorded in its result and never stops the loop.

use crate::exec::run_command;
use crate::extractor::CandidateCommand;
use crate::host::ModuleRunner;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Execution backend a candidate was routed to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Backend {
    Structured,
    Process,
    Unknown,
}

/// Per-candidate execution outcome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub command: String,
    pub backend: Backend,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub timestamp: String,
}

/// Dispatcher configuration, fixed at construction time
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Namespaces routed to the structured backend. A superset of what the
    /// extractor scans for: d.*, ps.* and r3.* commands are runnable even
    /// though they are never extracted.
    pub namespace_prefixes: Vec<String>,
    /// Command prefixes routed to the process backend (gdal*)
    pub tool_family_prefixes: Vec<String>,
    /// Utility names routed to the process backend on substring containment
    pub shell_tools: Vec<String>,
    /// Time budget for one spawned process
    pub process_timeout: Duration,
    /// Character budget for captured output
    pub output_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            namespace_prefixes: ["g", "r", "v", "i", "db", "t", "m", "d", "ps", "r3"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tool_family_prefixes: vec!["gdal".to_string()],
            shell_tools: crate::extractor::default_shell_tools(),
            process_timeout: Duration::from_secs(60),
            output_limit: 500,
        }
    }
}

/// Main dispatcher
pub struct Dispatcher {
    config: DispatchConfig,
    runner: Arc<dyn ModuleRunner>,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration
    pub fn new(runner: Arc<dyn ModuleRunner>) -> Self {
        Self::with_config(runner, DispatchConfig::default())
    }

    /// Create a dispatcher from explicit configuration
    pub fn with_config(runner: Arc<dyn ModuleRunner>, config: DispatchConfig) -> Self {
        Self { config, runner }
    }

    /// Execute candidates sequentially, producing exactly one result per
    /// candidate in the same order. Individual failures never abort the
    /// loop.
    pub async fn dispatch(&self, candidates: &[CandidateCommand]) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let result = self.dispatch_one(&candidate.text).await;
            if result.success {
                debug!(command = %result.command, "command succeeded");
            } else {
                warn!(
                    command = %result.command,
                    error = result.error.as_deref().unwrap_or(""),
                    "command failed"
                );
            }
            results.push(result);
        }
        results
    }

    /// Classify and execute a single command string
    pub async fn dispatch_one(&self, command: &str) -> ExecutionResult {
        match self.classify(command) {
            Backend::Structured => self.run_structured(command).await,
            Backend::Process => self.run_process(command).await,
            Backend::Unknown => ExecutionResult {
                command: command.to_string(),
                backend: Backend::Unknown,
                success: false,
                output: None,
                error: Some("unknown command type".to_string()),
                exit_code: None,
                timestamp: now(),
            },
        }
    }

    /// Pick a backend for a command string. Shell utilities are matched by
    /// substring containment, not by leading token.
    pub fn classify(&self, command: &str) -> Backend {
        if self
            .config
            .namespace_prefixes
            .iter()
            .any(|p| command.starts_with(&format!("{}.", p)))
        {
            return Backend::Structured;
        }
        if self
            .config
            .tool_family_prefixes
            .iter()
            .any(|p| command.starts_with(p.as_str()))
            || self
                .config
                .shell_tools
                .iter()
                .any(|t| command.contains(t.as_str()))
        {
            return Backend::Process;
        }
        Backend::Unknown
    }

    async fn run_structured(&self, command: &str) -> ExecutionResult {
        let mut tokens = command.split_whitespace();
        let Some(module) = tokens.next() else {
            return ExecutionResult {
                command: command.to_string(),
                backend: Backend::Structured,
                success: false,
                output: None,
                error: Some("empty command".to_string()),
                exit_code: None,
                timestamp: now(),
            };
        };
        let params = parse_params(tokens);

        match self.runner.invoke(module, &params).await {
            Ok(text) => ExecutionResult {
                command: command.to_string(),
                backend: Backend::Structured,
                success: true,
                output: Some(truncate_output(&text, self.config.output_limit)),
                error: None,
                exit_code: None,
                timestamp: now(),
            },
            Err(e) => ExecutionResult {
                command: command.to_string(),
                backend: Backend::Structured,
                success: false,
                output: None,
                error: Some(format!("{:#}", e)),
                exit_code: None,
                timestamp: now(),
            },
        }
    }

    async fn run_process(&self, command: &str) -> ExecutionResult {
        let argv: Vec<String> = command.split_whitespace().map(String::from).collect();
        let out = run_command(&argv, Some(self.config.process_timeout)).await;
        let success = out.error.is_none() && out.code == Some(0);

        ExecutionResult {
            command: command.to_string(),
            backend: Backend::Process,
            success,
            output: if success {
                Some(truncate_output(&out.stdout, self.config.output_limit))
            } else {
                None
            },
            error: if success {
                None
            } else {
                Some(out.error.unwrap_or_else(|| out.stderr.trim().to_string()))
            },
            exit_code: out.code,
            timestamp: now(),
        }
    }
}

/// Parse module argument tokens into a key/value map. A token without `=`
/// falls through to the implicit `input` key; when several appear the last
/// one wins.
pub fn parse_params<'a, I>(tokens: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut params = HashMap::new();
    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) => {
                params.insert(key.to_string(), value.to_string());
            }
            None => {
                params.insert("input".to_string(), token.to_string());
            }
        }
    }
    params
}

/// Truncate captured output to a character budget, appending an ellipsis
/// marker when cut.
pub fn truncate_output(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

//! iai_core - AI assistant core for GRASS GIS
//!
//! Forwards a natural-language query to a locally hosted Ollama service
//! together with the current GRASS environment, then scans the response
//! for command-looking substrings and executes them.
//!
//! Modules:
//! - extractor: heuristic command extraction from free-form text
//! - dispatcher: routes candidates to the structured or process backend
//! - host: GRASS module invocation boundary
//! - exec: external process execution with timeout
//! - ollama: local inference HTTP client
//! - context: system introspection and prompt assembly
//! - session: explicit request/response context

pub mod context;
pub mod dispatcher;
pub mod exec;
pub mod extractor;
pub mod host;
pub mod ollama;
pub mod session;

// Re-export key types for convenience
pub use context::{system_prompt, ModuleCatalog, ModuleFamily, RegionInfo, SystemContext};

pub use dispatcher::{Backend, DispatchConfig, Dispatcher, ExecutionResult};

pub use exec::{run_command, CommandOutput};

pub use extractor::{CandidateCommand, CommandExtractor, ExtractorConfig, MatchFamily};

pub use host::{GrassRunner, ModuleRunner};

pub use ollama::OllamaClient;

pub use session::{compose_prompt, Session, Turn};

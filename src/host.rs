//! Structured host-invocation boundary for iai_core
//!
//! GRASS module calls go through the `ModuleRunner` trait: module name and
//! key/value parameters in, output text out, errors carry a message and
//! nothing else. The default `GrassRunner` execs the module binary
//! directly, the way `grass.script` does from inside a session.

use crate::exec::run_command;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ModuleRunner: Send + Sync {
    /// Invoke a module with key=value parameters, returning its output text
    async fn invoke(&self, module: &str, params: &HashMap<String, String>) -> Result<String>;
}

/// Runs GRASS modules as external processes. Needs an active GRASS session
/// environment (GISRC and friends) to actually succeed.
pub struct GrassRunner;

/// Build the argument vector for a module call. The `flags` key becomes a
/// single `-<letters>` argument; everything else is passed as `key=value`.
pub fn build_argv(module: &str, params: &HashMap<String, String>) -> Vec<String> {
    let mut argv = vec![module.to_string()];
    // deterministic order for an unordered map
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    for key in keys {
        let value = &params[key];
        if key == "flags" {
            argv.push(format!("-{}", value));
        } else {
            argv.push(format!("{}={}", key, value));
        }
    }
    argv
}

#[async_trait]
impl ModuleRunner for GrassRunner {
    async fn invoke(&self, module: &str, params: &HashMap<String, String>) -> Result<String> {
        let argv = build_argv(module, params);
        // No explicit time limit: a module call is bounded only by the host
        let output = run_command(&argv, None).await;
        if let Some(error) = output.error {
            bail!("{}: {}", module, error);
        }
        if output.code != Some(0) {
            bail!("{} failed: {}", module, output.stderr.trim());
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_argv_key_values() {
        let argv = build_argv("r.info", &params(&[("map", "elevation")]));
        assert_eq!(argv, vec!["r.info", "map=elevation"]);
    }

    #[test]
    fn test_build_argv_flags_key() {
        let argv = build_argv("g.region", &params(&[("flags", "p")]));
        assert_eq!(argv, vec!["g.region", "-p"]);
    }

    #[test]
    fn test_build_argv_sorted() {
        let argv = build_argv(
            "r.slope.aspect",
            &params(&[("slope", "slp"), ("elevation", "dem"), ("aspect", "asp")]),
        );
        assert_eq!(
            argv,
            vec!["r.slope.aspect", "aspect=asp", "elevation=dem", "slope=slp"]
        );
    }

    #[tokio::test]
    async fn test_invoke_missing_module_reports_error() {
        let runner = GrassRunner;
        let err = runner
            .invoke("definitely.not.a.module", &HashMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("definitely.not.a.module"));
    }
}

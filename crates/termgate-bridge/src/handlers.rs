//! Built-in `system:*` handlers

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::router::Handler;

/// Environment variables `system:env` may reveal. Nothing secret belongs here.
pub const ENV_ALLOWLIST: &[&str] = &["SHELL", "TERM", "LANG", "HOME", "USER", "PATH"];

/// `system:info`: platform facts, no host identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInfoHandler;

#[async_trait]
impl Handler for SystemInfoHandler {
    async fn handle(&self, _args: Vec<Value>) -> Result<Value, String> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Ok(json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "family": std::env::consts::FAMILY,
            "cpus": cpus,
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}

/// `system:cwd`: the back end's working directory
#[derive(Debug, Clone, Copy, Default)]
pub struct CwdHandler;

#[async_trait]
impl Handler for CwdHandler {
    async fn handle(&self, _args: Vec<Value>) -> Result<Value, String> {
        let cwd = std::env::current_dir().map_err(|e| format!("current directory unavailable: {e}"))?;
        Ok(Value::String(cwd.to_string_lossy().into_owned()))
    }
}

/// `system:env`: allowlisted environment variables.
///
/// With no arguments, returns every allowlisted variable that is set. With
/// string arguments, returns only those names; names outside the allowlist
/// are omitted rather than reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvHandler;

#[async_trait]
impl Handler for EnvHandler {
    async fn handle(&self, args: Vec<Value>) -> Result<Value, String> {
        let requested: Vec<&str> = if args.is_empty() {
            ENV_ALLOWLIST.to_vec()
        } else {
            args.iter()
                .map(|arg| arg.as_str().ok_or_else(|| "variable names must be strings".to_string()))
                .collect::<Result<_, _>>()?
        };

        let mut vars = Map::new();
        for name in requested {
            if !ENV_ALLOWLIST.contains(&name) {
                continue;
            }
            if let Ok(value) = std::env::var(name) {
                vars.insert(name.to_string(), Value::String(value));
            }
        }
        Ok(Value::Object(vars))
    }
}

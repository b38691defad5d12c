//! Rewrite and runtime configuration

use crate::consts::{DEFAULT_BOOTSTRAP_OWNER, DEFAULT_MAX_STEPS};
use crate::error::{Error, Result};

/// Settings shared by the rewriter, the runtime and the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Also rewrite `getstatic`/`putstatic`; when false only instance fields are touched
    pub rewrite_static: bool,
    /// Internal name of the class that declares the accessor bootstrap methods
    pub bootstrap_owner: String,
    /// Cross-check constant pool references of the produced class
    pub verify_output: bool,
    /// Instruction budget for one top-level interpreter invocation
    pub max_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rewrite_static: true,
            bootstrap_owner: DEFAULT_BOOTSTRAP_OWNER.to_string(),
            verify_output: true,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl Config {
    pub fn with_rewrite_static(mut self, rewrite_static: bool) -> Self {
        self.rewrite_static = rewrite_static;
        self
    }

    /// Accepts either `pkg.Name` or `pkg/Name`
    pub fn with_bootstrap_owner(mut self, owner: impl Into<String>) -> Self {
        self.bootstrap_owner = owner.into().replace('.', "/");
        self
    }

    pub fn with_verify_output(mut self, verify_output: bool) -> Self {
        self.verify_output = verify_output;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Defaults overlaid with `FIELDLINK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("FIELDLINK_REWRITE_STATIC") {
            self.rewrite_static = parse_bool("FIELDLINK_REWRITE_STATIC", &value)?;
        }
        if let Some(value) = lookup("FIELDLINK_BOOTSTRAP_OWNER") {
            if value.trim().is_empty() {
                return Err(Error::config("FIELDLINK_BOOTSTRAP_OWNER must not be empty"));
            }
            self = self.with_bootstrap_owner(value.trim());
        }
        if let Some(value) = lookup("FIELDLINK_VERIFY") {
            self.verify_output = parse_bool("FIELDLINK_VERIFY", &value)?;
        }
        if let Some(value) = lookup("FIELDLINK_MAX_STEPS") {
            self.max_steps = value.trim().parse().map_err(|_| {
                Error::config(format!("FIELDLINK_MAX_STEPS must be a number, got '{}'", value))
            })?;
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.rewrite_static);
        assert!(config.verify_output);
        assert_eq!(config.bootstrap_owner, DEFAULT_BOOTSTRAP_OWNER);
    }

    #[test]
    fn test_builder_normalizes_owner() {
        let config = Config::default().with_bootstrap_owner("com.example.Links");
        assert_eq!(config.bootstrap_owner, "com/example/Links");
    }

    #[test]
    fn test_env_overlay() {
        let config = Config::default()
            .apply_env(env(&[
                ("FIELDLINK_REWRITE_STATIC", "off"),
                ("FIELDLINK_MAX_STEPS", "42"),
                ("FIELDLINK_BOOTSTRAP_OWNER", "a.B"),
            ]))
            .unwrap();
        assert!(!config.rewrite_static);
        assert_eq!(config.max_steps, 42);
        assert_eq!(config.bootstrap_owner, "a/B");
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = Config::default()
            .apply_env(env(&[("FIELDLINK_VERIFY", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}

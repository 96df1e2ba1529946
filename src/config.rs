//! Optional `jsglue-opt.toml` defaults file: this tool is a one-shot CLI
//! with no persistent state directory, but still accepts a project-local
//! defaults file for the flags that are tedious to repeat on every
//! invocation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::GlueResult;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Passes run when none are given on the command line.
    pub default_passes: Vec<String>,
    pub closure_friendly: bool,
    pub export_es6: bool,
    pub minify_whitespace: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_passes: Vec::new(),
            closure_friendly: false,
            export_es6: false,
            minify_whitespace: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Loads `jsglue-opt.toml` from `dir` if present, else the defaults.
    pub fn load(dir: &Path) -> GlueResult<Self> {
        let path = dir.join("jsglue-opt.toml");
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert!(cfg.default_passes.is_empty());
        assert!(!cfg.verbose);
    }

    #[test]
    fn reads_overlay_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("jsglue-opt.toml"),
            "default_passes = [\"JSDCE\", \"AJSDCE\"]\nverbose = true\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.default_passes, vec!["JSDCE", "AJSDCE"]);
        assert!(cfg.verbose);
    }
}

//! The `// EXTRA_INFO:<json>` sidecar protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::GlueResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtraInfo {
    /// Additional `[jsName, wasmName]` export links for emitDCEGraph,
    /// injected on top of what the pass discovers itself. An ordered list of
    /// pairs, not a map: order must stay deterministic and a `jsName` may
    /// legitimately repeat.
    pub exports: Vec<(String, String)>,
    pub unused_exports: Vec<String>,
    pub unused_imports: Vec<String>,
    /// Pre-assigned minification results: either `{oldName: newName}` when
    /// minifyGlobals already ran, or a bare `[name, …]` of globals that are
    /// known but not yet assigned a minified form.
    pub globals: GlobalsField,
    pub mapping: HashMap<String, String>,
}

/// `extraInfo.globals` accepts either shape the sidecar protocol documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlobalsField {
    Assigned(HashMap<String, String>),
    Named(Vec<String>),
}

impl Default for GlobalsField {
    fn default() -> Self {
        GlobalsField::Assigned(HashMap::new())
    }
}

impl GlobalsField {
    /// Normalizes to `oldName -> newName`. A bare name list has no assigned
    /// minified form yet, so each name maps to itself — reserved, not renamed.
    pub fn to_map(&self) -> HashMap<String, String> {
        match self {
            GlobalsField::Assigned(map) => map.clone(),
            GlobalsField::Named(names) => names.iter().map(|n| (n.clone(), n.clone())).collect(),
        }
    }
}

const MARKER: &str = "// EXTRA_INFO:";

/// Splits a trailing `// EXTRA_INFO:<json>` line off the end of `source`,
/// returning the remaining source and the parsed sidecar, if present.
pub fn split_extra_info(source: &str) -> GlueResult<(&str, Option<ExtraInfo>)> {
    let Some(idx) = source.rfind(MARKER) else {
        return Ok((source, None));
    };
    let code = &source[..idx];
    let json_text = source[idx + MARKER.len()..].trim();
    let info: ExtraInfo = serde_json::from_str(json_text)?;
    Ok((code, Some(info)))
}

pub fn render_suffix(mapping: &HashMap<String, String>) -> GlueResult<String> {
    let json = serde_json::to_string(mapping)?;
    Ok(format!("{MARKER}{json}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_marker_and_parses_json() {
        let src = "var x = 1;\n// EXTRA_INFO:{\"unusedImports\":[\"env_log\"]}";
        let (code, info) = split_extra_info(src).unwrap();
        assert_eq!(code, "var x = 1;\n");
        assert_eq!(info.unwrap().unused_imports, vec!["env_log".to_string()]);
    }

    #[test]
    fn absent_marker_yields_none() {
        let (code, info) = split_extra_info("var x = 1;").unwrap();
        assert_eq!(code, "var x = 1;");
        assert!(info.is_none());
    }

    #[test]
    fn exports_parses_as_ordered_pairs() {
        let src = "x;\n// EXTRA_INFO:{\"exports\":[[\"a\",\"w_a\"],[\"b\",\"w_b\"]]}";
        let (_, info) = split_extra_info(src).unwrap();
        let exports = info.unwrap().exports;
        assert_eq!(
            exports,
            vec![("a".to_string(), "w_a".to_string()), ("b".to_string(), "w_b".to_string())]
        );
    }

    #[test]
    fn globals_accepts_object_form() {
        let src = "x;\n// EXTRA_INFO:{\"globals\":{\"foo\":\"a\"}}";
        let (_, info) = split_extra_info(src).unwrap();
        let map = info.unwrap().globals.to_map();
        assert_eq!(map.get("foo"), Some(&"a".to_string()));
    }

    #[test]
    fn globals_accepts_bare_name_array() {
        let src = "x;\n// EXTRA_INFO:{\"globals\":[\"foo\",\"bar\"]}";
        let (_, info) = split_extra_info(src).unwrap();
        let map = info.unwrap().globals.to_map();
        assert_eq!(map.get("foo"), Some(&"foo".to_string()));
        assert_eq!(map.get("bar"), Some(&"bar".to_string()));
    }
}

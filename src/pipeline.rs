//! The pipeline driver: reads a file, splits its `extraInfo` sidecar, parses
//! it, runs the named passes in order, then re-emits it — a `name ->
//! function` dispatch over a fixed, compile-time pass registry.

use std::collections::HashMap;

use crate::ast::Node;
use crate::errors::{GlueError, GlueResult};
use crate::extra_info::{split_extra_info, ExtraInfo};
use crate::parser::lexer::Comment;
use crate::parser::parse_program;
use crate::passes::minify::NameGenerator;
use crate::passes::{apply_import_and_export_name_changes, dce_graph, heap, jsdce, minify};
use crate::printer::print_program;

/// Mutable state threaded through one invocation's pass sequence. A single
/// `NameGenerator` is shared across every minify pass that runs in this
/// driver: determinism within one run, no leak across runs.
pub struct Driver {
    pub ast: Node,
    pub comments: Vec<Comment>,
    pub extra: ExtraInfo,
    pub name_gen: NameGenerator,
    /// Set by a pass that produces a side text payload instead of mutating
    /// the AST (`emitDCEGraph`'s graph JSON). `dump` hands this straight to
    /// the output sink in place of the printed AST.
    pub dump_text: Option<String>,
    /// Set by `minifyGlobals`; appended to the printed output as a trailing
    /// `// EXTRA_INFO:` comment for a downstream invocation.
    pub suffix: Option<String>,
}

impl Driver {
    pub fn new(source: &str, module: bool) -> GlueResult<Self> {
        let (code, extra) = split_extra_info(source)?;
        let (ast, comments) = parse_program(code, module)?;
        Ok(Driver {
            ast,
            comments,
            extra: extra.unwrap_or_default(),
            name_gen: NameGenerator::new(),
            dump_text: None,
            suffix: None,
        })
    }

    pub fn run_pass(&mut self, name: &str) -> GlueResult<()> {
        let f = PASS_REGISTRY
            .get(name)
            .ok_or_else(|| GlueError::UnknownPass(name.to_string()))?;
        f(self)
    }

    pub fn run_passes(&mut self, names: &[String]) -> GlueResult<()> {
        for name in names {
            tracing::debug!(pass = %name, "running pass");
            self.run_pass(name)?;
        }
        Ok(())
    }

    /// Renders the final output: the `dump` sink's text if a pass produced
    /// one, else the printed AST, with `suffix` appended either way.
    pub fn render(&self, minify_whitespace: bool) -> String {
        let mut out = match &self.dump_text {
            Some(text) => text.clone(),
            None => print_program(&self.ast, minify_whitespace, &self.comments),
        };
        if let Some(suffix) = &self.suffix {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(suffix);
            out.push('\n');
        }
        out
    }
}

fn pass_jsdce(d: &mut Driver) -> GlueResult<()> {
    jsdce::jsdce(&mut d.ast, false);
    Ok(())
}

fn pass_ajsdce(d: &mut Driver) -> GlueResult<()> {
    jsdce::ajsdce(&mut d.ast);
    Ok(())
}

fn pass_apply_import_export_name_changes(d: &mut Driver) -> GlueResult<()> {
    apply_import_and_export_name_changes(&mut d.ast, &d.extra);
    Ok(())
}

fn pass_emit_dce_graph(d: &mut Driver) -> GlueResult<()> {
    let json = dce_graph::emit_dce_graph(&mut d.ast, &d.extra)?;
    d.dump_text = Some(json);
    Ok(())
}

fn pass_apply_dce_graph_removals(d: &mut Driver) -> GlueResult<()> {
    let unused_imports = d.extra.unused_imports.clone();
    let unused_exports = d.extra.unused_exports.clone();
    dce_graph::apply_dce_graph_removals(&mut d.ast, &unused_imports, &unused_exports)
}

fn pass_dump(d: &mut Driver) -> GlueResult<()> {
    if d.dump_text.is_none() {
        tracing::debug!("dump: no prior pass produced a text payload, printing the AST instead");
    }
    Ok(())
}

fn pass_little_endian_heap(d: &mut Driver) -> GlueResult<()> {
    heap::little_endian_heap(&mut d.ast);
    Ok(())
}

fn pass_growable_heap(d: &mut Driver) -> GlueResult<()> {
    heap::growable_heap(&mut d.ast);
    Ok(())
}

fn pass_unsign_pointers(d: &mut Driver) -> GlueResult<()> {
    heap::unsign_pointers(&mut d.ast);
    Ok(())
}

fn pass_asanify(d: &mut Driver) -> GlueResult<()> {
    heap::asanify(&mut d.ast);
    Ok(())
}

fn pass_safe_heap(d: &mut Driver) -> GlueResult<()> {
    heap::safe_heap(&mut d.ast);
    Ok(())
}

fn pass_minify_locals(d: &mut Driver) -> GlueResult<()> {
    let globals = d.extra.globals.to_map();
    let mut gen = std::mem::take(&mut d.name_gen);
    let result = minify::minify_locals(&mut d.ast, &globals, &mut gen);
    d.name_gen = gen;
    result
}

fn pass_minify_globals(d: &mut Driver) -> GlueResult<()> {
    let globals = d.extra.globals.to_map();
    let mut gen = std::mem::take(&mut d.name_gen);
    let mapping: HashMap<String, String> = minify::minify_globals(&mut d.ast, &globals, &mut gen);
    d.name_gen = gen;
    d.suffix = Some(crate::extra_info::render_suffix(&mapping)?);
    Ok(())
}

type PassFn = fn(&mut Driver) -> GlueResult<()>;

static PASS_REGISTRY: phf::Map<&'static str, PassFn> = phf::phf_map! {
    "JSDCE" => pass_jsdce,
    "AJSDCE" => pass_ajsdce,
    "applyImportAndExportNameChanges" => pass_apply_import_export_name_changes,
    "emitDCEGraph" => pass_emit_dce_graph,
    "applyDCEGraphRemovals" => pass_apply_dce_graph_removals,
    "dump" => pass_dump,
    "littleEndianHeap" => pass_little_endian_heap,
    "growableHeap" => pass_growable_heap,
    "unsignPointers" => pass_unsign_pointers,
    "minifyLocals" => pass_minify_locals,
    "asanify" => pass_asanify,
    "safeHeap" => pass_safe_heap,
    "minifyGlobals" => pass_minify_globals,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pass_is_rejected() {
        let mut driver = Driver::new("var x = 1;", false).unwrap();
        let err = driver.run_pass("NotAPass").unwrap_err();
        assert!(matches!(err, GlueError::UnknownPass(name) if name == "NotAPass"));
    }

    #[test]
    fn jsdce_then_print_drops_unused_function() {
        let mut driver = Driver::new("function f(){} var x = 1; var y = 2; use(y);", false).unwrap();
        driver.run_passes(&["JSDCE".to_string()]).unwrap();
        let out = driver.render(false);
        assert!(!out.contains("function f"));
        assert!(!out.contains("var x"));
        assert!(out.contains("use(y)"));
    }

    #[test]
    fn emit_dce_graph_then_dump_renders_json() {
        let src = "var wasmImports = { env_log: _log }; var _malloc = wasmExports['malloc']; function _log(){ _malloc(); }";
        let mut driver = Driver::new(src, false).unwrap();
        driver
            .run_passes(&["emitDCEGraph".to_string(), "dump".to_string()])
            .unwrap();
        let out = driver.render(false);
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn minify_globals_appends_extra_info_suffix() {
        let src = "function instantiate(x) { var foo = 1; return foo; }";
        let mut driver = Driver::new(src, false).unwrap();
        driver.run_passes(&["minifyGlobals".to_string()]).unwrap();
        let out = driver.render(false);
        assert!(out.contains("// EXTRA_INFO:"));
    }
}

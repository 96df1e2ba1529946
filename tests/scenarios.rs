//! End-to-end scenarios driven through `Driver`, exercising the full
//! read -> split extraInfo -> parse -> run passes -> render path rather than
//! calling an individual pass function directly.

use jsglue_opt::pipeline::Driver;

#[test]
fn scenario_a_jsdce_basic() {
    let src = "function f(){} var x = 1; var y = 2; use(y);";
    let mut driver = Driver::new(src, false).unwrap();
    driver.run_passes(&["JSDCE".to_string()]).unwrap();
    let out = driver.render(false);
    assert!(!out.contains("function f"));
    assert!(!out.contains("var x"));
    assert!(out.contains("var y"));
    assert!(out.contains("use(y)"));
}

#[test]
fn scenario_b_jsdce_ajsdce_preserve_side_effects() {
    let src = "var x = sideEffect();";
    let mut driver = Driver::new(src, false).unwrap();
    driver
        .run_passes(&["JSDCE".to_string(), "AJSDCE".to_string()])
        .unwrap();
    let out = driver.render(false);
    assert!(out.contains("sideEffect()"));
}

#[test]
fn ajsdce_is_a_fixed_point_on_a_second_run() {
    let src = "var x = sideEffect(); function f(){} var y = 1; use(y);";
    let mut driver = Driver::new(src, false).unwrap();
    driver
        .run_passes(&["JSDCE".to_string(), "AJSDCE".to_string()])
        .unwrap();
    let once = driver.render(false);
    driver.run_passes(&["AJSDCE".to_string()]).unwrap();
    let twice = driver.render(false);
    assert_eq!(once, twice);
}

#[test]
fn scenario_c_emit_dce_graph_minimal() {
    let src = "var wasmImports = { env_log: _log }; \
               var _malloc = wasmExports['malloc']; \
               function _log(){ _malloc(); }";
    let mut driver = Driver::new(src, false).unwrap();
    driver
        .run_passes(&["emitDCEGraph".to_string(), "dump".to_string()])
        .unwrap();
    let out = driver.render(false);
    let graph: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
    let entries = graph.as_array().unwrap();

    let find = |name: &str| entries.iter().find(|e| e["name"] == name).unwrap();
    assert_eq!(
        find("emcc$defun$_log")["reaches"],
        serde_json::json!(["emcc$export$_malloc"])
    );
    assert_eq!(find("emcc$export$_malloc")["export"], "malloc");
    assert_eq!(
        find("emcc$import$_log")["import"],
        serde_json::json!(["env", "env_log"])
    );
    assert_eq!(
        find("emcc$import$_log")["reaches"],
        serde_json::json!(["emcc$defun$_log"])
    );

    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted, "graph entries must be sorted by name");
}

#[test]
fn scenario_d_apply_dce_graph_removals() {
    let src = "var wasmImports = { env_log: _log }; \
               var _malloc = wasmExports['malloc']; \
               function _log(){ _malloc(); }\n\
               // EXTRA_INFO:{\"unusedImports\":[\"env_log\"],\"unusedExports\":[\"malloc\"]}";
    let mut driver = Driver::new(src, false).unwrap();
    driver
        .run_passes(&["applyDCEGraphRemovals".to_string()])
        .unwrap();
    let out = driver.render(false);
    assert!(!out.contains("env_log"));
    assert!(!out.contains("_malloc = wasmExports"));
}

#[test]
fn apply_dce_graph_removals_rejects_unmatched_entry() {
    let src = "var wasmImports = { env_log: _log };\n\
               // EXTRA_INFO:{\"unusedImports\":[\"nonexistent\"]}";
    let mut driver = Driver::new(src, false).unwrap();
    let err = driver
        .run_passes(&["applyDCEGraphRemovals".to_string()])
        .unwrap_err();
    assert!(matches!(err, jsglue_opt::errors::GlueError::Consistency(_)));
}

#[test]
fn scenario_e_little_endian_heap() {
    let src = "HEAP32[p] = v; x = HEAP32[q];";
    let mut driver = Driver::new(src, false).unwrap();
    driver
        .run_passes(&["littleEndianHeap".to_string()])
        .unwrap();
    let out = driver.render(false);
    assert!(out.contains("LE_HEAP_STORE_I32"));
    assert!(out.contains("LE_HEAP_LOAD_I32"));
}

#[test]
fn scenario_f_unsign_pointers() {
    let mut driver = Driver::new("x = HEAP32[n];", false).unwrap();
    driver.run_passes(&["unsignPointers".to_string()]).unwrap();
    let out = driver.render(false);
    assert!(out.contains(">>>"));

    let mut driver2 = Driver::new("x = HEAP32[n >> 2];", false).unwrap();
    driver2
        .run_passes(&["unsignPointers".to_string()])
        .unwrap();
    let out2 = driver2.render(false);
    assert!(out2.contains(">>>"));
    assert!(!out2.contains(">> 2"));
}

#[test]
fn scenario_g_minifier_determinism() {
    use jsglue_opt::passes::minify::NameGenerator;
    let mut gen = NameGenerator::new();
    let names: Vec<String> = (0..4)
        .map(|i| gen.ensure_minified_names(i).to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

#[test]
fn minify_globals_through_the_driver_appends_extra_info() {
    let src = "function instantiate(x) { var foo = x + 1; return foo; }";
    let mut driver = Driver::new(src, false).unwrap();
    driver.run_passes(&["minifyGlobals".to_string()]).unwrap();
    let out = driver.render(false);
    assert!(out.contains("// EXTRA_INFO:"));
    assert!(out.contains("instantiate"));
}

#[test]
fn unknown_pass_name_is_a_fatal_error() {
    let mut driver = Driver::new("var x = 1;", false).unwrap();
    let err = driver.run_pass("notARealPass").unwrap_err();
    assert!(matches!(err, jsglue_opt::errors::GlueError::UnknownPass(_)));
}

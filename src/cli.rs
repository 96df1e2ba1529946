//! Command-line surface: `<infile> <pass>... [options]`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "jsglue-opt")]
#[command(about = "AST-driven post-processor for wasm-toolchain JS glue code")]
#[command(version)]
pub struct Cli {
    /// JS glue file to read.
    pub infile: PathBuf,

    /// Passes to run, in order (e.g. JSDCE AJSDCE minifyGlobals).
    pub passes: Vec<String>,

    /// Emit output compatible with closure-compiler's ADVANCED mode.
    #[arg(long)]
    pub closure_friendly: bool,

    /// Parse/emit the input as an ES module instead of a script.
    #[arg(long)]
    pub export_es6: bool,

    /// Raise logging to debug level.
    #[arg(long)]
    pub verbose: bool,

    /// Run the requested passes but skip re-emitting the AST.
    #[arg(long)]
    pub no_print: bool,

    /// Emit whitespace-minified output instead of 2-space-indented.
    #[arg(long)]
    pub minify_whitespace: bool,

    /// Write output here instead of stdout.
    #[arg(short = 'o', long)]
    pub outfile: Option<PathBuf>,
}

use std::env;
use std::fs;
use std::time::Instant;

use clap::Parser;
use console::style;
use tracing_subscriber::fmt::time;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use jsglue_opt::cli::Cli;
use jsglue_opt::config::Config;
use jsglue_opt::errors::GlueResult;
use jsglue_opt::pipeline::Driver;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    let fmt_layer = fmt::layer().with_timer(time::UtcTime::rfc_3339());

    Registry::default().with(filter).with(fmt_layer).init();
}

fn main() -> GlueResult<()> {
    let now = Instant::now();
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    tracing::debug!("jsglue-opt starting up");

    let cwd = env::current_dir()?;
    let config = Config::load(&cwd)?;

    let source = fs::read_to_string(&cli.infile)?;
    let mut driver = Driver::new(&source, cli.export_es6)?;

    let passes: Vec<String> = if cli.passes.is_empty() {
        config.default_passes.clone()
    } else {
        cli.passes.clone()
    };
    driver.run_passes(&passes)?;

    if !cli.no_print {
        let minify_whitespace = cli.minify_whitespace || config.minify_whitespace;
        let output = driver.render(minify_whitespace);
        match &cli.outfile {
            Some(path) => fs::write(path, output)?,
            None => print!("{output}"),
        }
    }

    println!(
        "{} in {:.3}s.",
        style("Finished").green().bold(),
        now.elapsed().as_secs_f32()
    );
    Ok(())
}

//! Stagehand CLI - build application assets from the command line.
//!
//! Thin front end over `stagehand-bundler`: parses arguments, initializes
//! logging, runs one build, and prints the result.

mod logger;

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use stagehand_bundler::{BuildRequest, Environment, Pipeline};

/// Build one or more entrypoints the way the asset middleware would.
#[derive(Debug, Parser)]
#[command(name = "stagehand", version, about)]
struct Cli {
    /// Path(s) to build, relative to the root. Separate multiple paths with
    /// a semi-colon.
    path: String,

    /// The application root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Environment to build for.
    #[arg(long, value_enum, default_value_t = EnvArg::Development)]
    env: EnvArg,

    /// Base URL of the application, e.g. https://example.com.
    #[arg(long, default_value = "")]
    base_url: String,

    /// Path to an import map (JSON), relative to the root.
    #[arg(long)]
    import_map: Option<String>,

    /// Environment variables as a JSON object.
    #[arg(long, default_value = "")]
    env_vars: String,

    /// Disable minification and raise log verbosity.
    #[arg(long)]
    debug: bool,

    /// Write build metadata to <root>/meta.json.
    #[arg(long)]
    metafile: bool,

    /// Print produced file contents to stdout instead of a summary.
    #[arg(long)]
    print: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum EnvArg {
    Development,
    Test,
    Production,
}

impl From<EnvArg> for Environment {
    fn from(arg: EnvArg) -> Self {
        match arg {
            EnvArg::Development => Environment::Development,
            EnvArg::Test => Environment::Test,
            EnvArg::Production => Environment::Production,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logger::init(args.debug, args.no_color);

    let root = args.root.canonicalize().into_diagnostic()?;

    let mut request = BuildRequest::new(&args.path, &root)
        .base_url(args.base_url.clone())
        .env_vars(args.env_vars.clone())
        .debug(args.debug)
        .metafile(args.metafile);
    if let Some(import_map) = &args.import_map {
        request = request.import_map_path(import_map.clone());
    }

    let pipeline = Pipeline::new(args.env.into());
    let outcome = pipeline.build(request).await.into_diagnostic()?;

    if !outcome.is_success() {
        for diagnostic in &outcome.diagnostics {
            eprintln!("error: {diagnostic}");
        }
        std::process::exit(1);
    }

    if args.print {
        let mut stdout = std::io::stdout().lock();
        for file in &outcome.outputs {
            stdout.write_all(&file.contents).into_diagnostic()?;
        }
    } else {
        for file in &outcome.outputs {
            println!("{} ({} bytes)", file.path, file.contents.len());
        }
        if outcome.written {
            println!("wrote {} file(s) under public/assets", outcome.outputs.len());
        }
    }

    Ok(())
}

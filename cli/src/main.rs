mod config;
mod emit;
mod test_runner;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use config::{Redefine, Settings, WeaveConfig};
use expander::ExpandOptions;

const SUBCOMMANDS: &[&str] = &["tangle", "test", "help"];

#[derive(Parser)]
#[command(name = "weave", version, about = "Literate programming tangler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve chunks and write file chunks to disk
    Tangle(TangleArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct TangleArgs {
    /// Literate source documents, processed in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory to write output files into [default: out]
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Config file [default: ./weave.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of expansion passes
    #[arg(long)]
    max_passes: Option<usize>,

    /// What a repeated `<<name>>=` does
    #[arg(long, value_enum)]
    redefine: Option<Redefine>,

    /// Resolve only, don't write anything (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// List all chunks after merging
    #[arg(long)]
    list_chunks: bool,

    /// Print one resolved chunk to stdout
    #[arg(long, value_name = "CHUNK")]
    dump: Option<String>,

    /// Print the files that would be written instead of writing them
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() -> ExitCode {
    // `weave doc.lit` behaves like `weave tangle doc.lit`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "tangle".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Tangle(tangle_args) => match do_tangle(tangle_args, cli.no_color) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {:#}", err);
                ExitCode::FAILURE
            }
        },
        Command::Test(test_args) => {
            if test_args.list_categories {
                test_runner::list_categories(&test_args.path);
                return ExitCode::SUCCESS;
            }
            match test_runner::run_tests(&test_args.path, cli.no_color, &test_args.category) {
                0 => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn do_tangle(args: TangleArgs, no_color: bool) -> anyhow::Result<ExitCode> {
    let config = WeaveConfig::load(args.config.as_deref())?;
    let settings = Settings::resolve(config, args.out_dir, args.max_passes, args.redefine);
    log::debug!("settings: {:?}", settings);

    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let reporter = Reporter::new(color_choice);

    // Read every source up front so references may cross files.
    let mut files = SimpleFiles::new();
    let mut documents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read '{}'", path.display()))?;
        let file_id = files.add(path.display().to_string(), source.clone());
        let document = weave::parser::Parser::new(source, file_id).parse();
        if document.is_empty() {
            log::warn!("{}: no chunk fragments found", path.display());
        } else {
            log::info!(
                "{}: {} fragment(s)",
                path.display(),
                document.fragments.len()
            );
        }
        documents.push(document);
    }

    let mut fragments = Vec::new();
    for document in documents {
        reporter.emit_all(&files, document.warnings.iter().map(|w| w.to_diagnostic()));
        fragments.extend(document.fragments);
    }

    let merged = weave::merge(fragments, settings.redefine);
    reporter.emit_all(&files, merged.warnings.iter().map(|w| w.to_diagnostic()));
    let mut chunks = merged.chunks;

    if args.list_chunks {
        for chunk in &chunks {
            let kind = if chunk.is_file() { "(file)" } else { "" };
            println!("<<{}>> {} line(s) {}", chunk.name, chunk.lines.len(), kind);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let options = ExpandOptions {
        max_passes: settings.max_passes,
    };
    let report = match expander::expand(&mut chunks, &options) {
        Ok(report) => report,
        Err(err) => {
            reporter.emit(&files, &err.to_diagnostic());
            return Ok(ExitCode::FAILURE);
        }
    };
    log::info!(
        "resolved {} chunk(s) in {} pass(es), {} substitution(s)",
        chunks.len(),
        report.passes,
        report.substitutions
    );

    if let Some(name) = &args.dump {
        let chunk = chunks
            .get(name)
            .with_context(|| format!("no chunk named `{}`", name))?;
        println!("{}", chunk.render());
        return Ok(ExitCode::SUCCESS);
    }

    let outputs = expander::select_files(&chunks);
    if outputs.is_empty() {
        log::warn!("no file chunks found (a file chunk's name contains `.`)");
    }

    if args.check {
        eprintln!(
            "ok: {} chunk(s) resolved, {} file(s)",
            chunks.len(),
            outputs.len()
        );
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        for name in outputs.keys() {
            println!("{}", emit::output_path(&settings.out_dir, name)?.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let written = emit::write_files(&settings.out_dir, &outputs)?;
    eprintln!(
        "wrote {} file(s) to {}",
        written.len(),
        settings.out_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}

/// Renders diagnostics to stderr.
struct Reporter {
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    fn new(color_choice: ColorChoice) -> Self {
        Reporter {
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    fn emit(&self, files: &SimpleFiles<String, String>, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(&mut self.writer.lock(), &self.config, files, diagnostic);
    }

    fn emit_all<I>(&self, files: &SimpleFiles<String, String>, diagnostics: I)
    where
        I: IntoIterator<Item = Diagnostic<usize>>,
    {
        for diagnostic in diagnostics {
            self.emit(files, &diagnostic);
        }
    }
}

mod config;
mod grade;
mod translator;

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dodona::Reporter;
use turtle::{Canvas, Limits, Raster};

const SUBCOMMANDS: &[&str] = &["judge", "render", "diff", "help"];

#[derive(Parser)]
#[command(name = "turtle-judge", version, about = "Judge for turtle graphics exercises")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grade a submission; the run configuration is read from stdin
    Judge(JudgeArgs),

    /// Print the SVG drawing of a turtle script
    Render(RenderArgs),

    /// Count the pixels in which the drawings of two scripts differ
    Diff(DiffArgs),
}

#[derive(clap::Args)]
struct JudgeArgs {
    /// Read the run configuration from this file instead of stdin
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CanvasArgs {
    #[arg(long, default_value_t = 1000)]
    width: u32,

    #[arg(long, default_value_t = 500)]
    height: u32,
}

impl CanvasArgs {
    fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Turtle script to draw
    file: String,

    #[command(flatten)]
    canvas: CanvasArgs,

    /// Parse only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct DiffArgs {
    first: String,
    second: String,

    #[command(flatten)]
    canvas: CanvasArgs,
}

fn main() {
    // The platform runs the judge without arguments, so anything that is not
    // a subcommand means `judge`.
    let mut args: Vec<String> = std::env::args().collect();
    let wants_help = args
        .iter()
        .skip(1)
        .any(|a| matches!(a.as_str(), "-h" | "--help" | "-V" | "--version"));
    let has_subcommand = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .is_some_and(|a| SUBCOMMANDS.contains(&a.as_str()));
    if !has_subcommand && !wants_help {
        args.insert(1, "judge".to_string());
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.no_color);

    let code = match cli.command {
        Command::Judge(judge_args) => match do_judge(judge_args) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Render(render_args) => do_render(render_args, cli.no_color),
        Command::Diff(diff_args) => do_diff(diff_args, cli.no_color),
    };
    process::exit(code);
}

/// Logs go to stderr: stdout carries the report.
fn init_tracing(no_color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}

fn do_judge(args: JudgeArgs) -> Result<()> {
    let raw_config = match &args.config {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("cannot read the run configuration from stdin")?;
            raw
        }
    };
    debug!(bytes = raw_config.len(), "read run configuration");

    let stdout = std::io::stdout();
    let mut reporter = Reporter::new(stdout.lock());
    grade::grade(&mut reporter, &raw_config)?;
    reporter.into_inner().flush().context("cannot flush the report")?;
    Ok(())
}

/// A script that parsed and ran, or the exit code after its diagnostics were printed.
fn draw(file: &str, canvas: Canvas, no_color: bool, check: bool) -> Result<Option<turtle::Run>, i32> {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            return Err(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let emit = |diagnostic: Diagnostic<usize>| {
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    };

    let program = match turtle::Parser::new(source, file_id).parse() {
        Ok(p) => p,
        Err(errors) => {
            for error in &errors {
                emit(error.to_diagnostic());
            }
            return Err(1);
        }
    };

    if check {
        eprintln!("ok: {} parsed successfully", file);
        return Ok(None);
    }

    match turtle::execute(&program, canvas, &Limits::default()) {
        Ok(run) => {
            eprint!("{}", run.output);
            Ok(Some(run))
        }
        Err(error) => {
            emit(error.to_diagnostic());
            Err(1)
        }
    }
}

fn do_render(args: RenderArgs, no_color: bool) -> i32 {
    match draw(&args.file, args.canvas.canvas(), no_color, args.check) {
        Ok(Some(run)) => {
            print!("{}", run.drawing.to_svg());
            0
        }
        Ok(None) => 0,
        Err(code) => code,
    }
}

fn do_diff(args: DiffArgs, no_color: bool) -> i32 {
    let canvas = args.canvas.canvas();
    let (first, second) = match (
        draw(&args.first, canvas, no_color, false),
        draw(&args.second, canvas, no_color, false),
    ) {
        (Ok(Some(first)), Ok(Some(second))) => (first, second),
        (Err(code), _) | (_, Err(code)) => return code,
        _ => return 1,
    };

    match Raster::render(&first.drawing).difference(&Raster::render(&second.drawing)) {
        Ok(differing) => {
            println!("{}", differing);
            0
        }
        Err(error) => {
            eprintln!("error: {}", error);
            1
        }
    }
}

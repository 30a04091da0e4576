mod embed;
mod runner;
mod settings;
mod worktree;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::runner::{execute, resolve_renderer};
use crate::settings::{parse_magic_line, Settings, Warnings};

#[derive(Debug, Parser)]
#[command(name = "nbmanim")]
#[command(about = "Notebook-style manim cell runner", version = full_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a cell of scene code and print its display payload
    Render {
        /// Cell source file; `-` reads from stdin
        cell: PathBuf,
        /// Magic option line, e.g. "-r 480,854 --base64"
        #[arg(long = "args", default_value = "", allow_hyphen_values = true)]
        line: String,
        /// Renderer executable (overrides NBMANIM_RENDERER and the PATH lookup)
        #[arg(long)]
        renderer: Option<PathBuf>,
        /// Emit a machine-readable report instead of the bare payload
        #[arg(long)]
        json: bool,
    },
    /// Resolve a magic option line without invoking the renderer
    Parse {
        #[arg(default_value = "", allow_hyphen_values = true)]
        line: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            cell,
            line,
            renderer,
            json,
        } => run_render(&cell, &line, renderer.as_deref(), json),
        Commands::Parse { line, json } => run_parse(&line, json),
    }
}

#[derive(Debug, Serialize)]
struct RenderReport<'a> {
    settings: &'a Settings,
    forwarded_args: &'a [String],
    warnings: &'a [String],
    output_path: Option<String>,
    html: Option<&'a str>,
}

fn run_render(cell: &Path, line: &str, renderer_flag: Option<&Path>, json: bool) -> Result<()> {
    let cell_source = read_cell(cell)?;
    let mut warnings = Warnings::default();
    let (settings, residual) = parse_magic_line(line, &mut warnings);
    let renderer = resolve_renderer(renderer_flag);

    let mut out = io::stdout();
    let mut err = io::stderr();
    let outcome = if json {
        // keep stdout machine-readable; renderer passthrough joins the diagnostics
        let mut passthrough = io::stderr();
        execute(
            &renderer,
            &cell_source,
            &settings,
            &residual,
            &mut passthrough,
            &mut err,
            &mut warnings,
        )?
    } else {
        execute(
            &renderer,
            &cell_source,
            &settings,
            &residual,
            &mut out,
            &mut err,
            &mut warnings,
        )?
    };

    if json {
        let report = RenderReport {
            settings: &settings,
            forwarded_args: &residual,
            warnings: warnings.entries(),
            output_path: outcome
                .output_path
                .as_ref()
                .map(|path| path.display().to_string()),
            html: outcome.payload.as_deref(),
        };
        serde_json::to_writer_pretty(&mut out, &report).context("failed to write report")?;
        writeln!(out)?;
    } else if let Some(payload) = &outcome.payload {
        print!("{payload}");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    settings: &'a Settings,
    forwarded_args: &'a [String],
    warnings: &'a [String],
}

fn run_parse(line: &str, json: bool) -> Result<()> {
    let mut warnings = Warnings::default();
    let (settings, residual) = parse_magic_line(line, &mut warnings);

    if json {
        let report = ParseReport {
            settings: &settings,
            forwarded_args: &residual,
            warnings: warnings.entries(),
        };
        serde_json::to_writer_pretty(io::stdout(), &report).context("failed to write report")?;
        println!();
        return Ok(());
    }

    println!(
        "OK: {}x{} ({}), remote={}, silent={}",
        settings.height,
        settings.width,
        if settings.is_gif { "gif" } else { "video" },
        settings.remote,
        settings.silent
    );
    println!("Forwarded: {}", residual.join(" "));
    if !warnings.is_empty() {
        println!("Warnings: {}", warnings.entries().len());
    }
    Ok(())
}

fn read_cell(cell: &Path) -> Result<String> {
    if cell == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read the cell source from stdin")?;
        return Ok(source);
    }
    fs::read_to_string(cell)
        .with_context(|| format!("failed to read cell source {}", cell.display()))
}

fn full_version() -> &'static str {
    match option_env!("NBMANIM_GIT_HASH") {
        Some(hash) => Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str()),
        None => env!("CARGO_PKG_VERSION"),
    }
}

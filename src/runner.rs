use std::env;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};

use crate::embed;
use crate::settings::{Settings, Warnings};
use crate::worktree::WorkTree;

/// The renderer announces its artifact with this stdout line; it is the only
/// success signal the wrapper gets.
pub const PATH_SENTINEL: &str = "File ready at ";

pub const RENDERER_ENV: &str = "NBMANIM_RENDERER";
const DEFAULT_RENDERER: &str = "manim";

pub fn resolve_renderer(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match env::var_os(RENDERER_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_RENDERER),
    }
}

#[derive(Debug)]
pub struct RenderOutcome {
    pub output_path: Option<PathBuf>,
    pub payload: Option<String>,
}

#[derive(Debug)]
struct Capture {
    output_path: Option<PathBuf>,
    stdout: String,
    stderr: String,
}

/// Runs one cell end to end: invoke the renderer on the cell source, locate
/// the artifact via the sentinel line, and build the display payload.
///
/// Renderer output goes to `out` as it arrives (unless silent); diagnostics
/// go to `err`. A missing sentinel is not fatal; a reported artifact that is
/// missing on disk or outside the working tree is.
pub fn execute(
    renderer: &Path,
    cell_source: &str,
    settings: &Settings,
    residual: &[String],
    out: &mut dyn Write,
    err: &mut dyn Write,
    warnings: &mut Warnings,
) -> Result<RenderOutcome> {
    let capture = run_renderer(renderer, cell_source, residual, settings.silent, out)?;
    if !settings.silent {
        err.write_all(capture.stderr.as_bytes())
            .context("failed to forward renderer diagnostics")?;
    }

    let Some(path) = capture.output_path else {
        if !wants_help(residual) {
            warnings.push("could not find the output path in the renderer output");
            if settings.silent {
                // the run was muted; replay it so the failure can be diagnosed
                err.write_all(capture.stdout.as_bytes())
                    .context("failed to flush captured renderer output")?;
                err.write_all(capture.stderr.as_bytes())
                    .context("failed to flush captured renderer diagnostics")?;
            }
        }
        return Ok(RenderOutcome {
            output_path: None,
            payload: None,
        });
    };

    if !path.exists() {
        bail!(
            "renderer reported {} but no such file exists",
            path.display()
        );
    }

    let source = if settings.remote {
        embed::data_uri(&path, settings.is_gif)?
    } else {
        let relative = WorkTree::current()?.relativize(&path)?;
        relative.to_string_lossy().into_owned()
    };

    let payload = if settings.is_gif {
        embed::image_tag(&source, settings)
    } else {
        embed::video_tag(&source, settings)
    };

    Ok(RenderOutcome {
        output_path: Some(path),
        payload: Some(payload),
    })
}

fn run_renderer(
    renderer: &Path,
    cell_source: &str,
    residual: &[String],
    silent: bool,
    out: &mut dyn Write,
) -> Result<Capture> {
    // Scratch file holding the cell source; removed on every exit path when
    // the guard drops.
    let mut scratch = tempfile::Builder::new()
        .prefix("nbmanim-cell-")
        .suffix(".py")
        .tempfile()
        .context("failed to create a scratch file for the cell source")?;
    scratch
        .write_all(cell_source.as_bytes())
        .context("failed to write the cell source")?;
    scratch
        .flush()
        .context("failed to flush the cell source")?;

    let mut command = Command::new(renderer);
    command
        .arg(scratch.path())
        .args(residual)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|error| {
        if error.kind() == ErrorKind::NotFound {
            anyhow!(
                "renderer executable not found ({}). Install manim, or point --renderer or {RENDERER_ENV} at one.",
                renderer.display()
            )
        } else {
            anyhow!("failed to spawn renderer {}: {error}", renderer.display())
        }
    })?;

    // Drain stderr on a helper thread while this thread walks stdout, so
    // neither pipe can fill up and stall the renderer.
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("failed to capture renderer stderr"))?;
    let stderr_reader = thread::spawn(move || -> std::io::Result<String> {
        let mut pipe = stderr_pipe;
        let mut text = String::new();
        pipe.read_to_string(&mut text)?;
        Ok(text)
    });

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to capture renderer stdout"))?;
    let mut captured = String::new();
    let mut output_path = None;
    for line in BufReader::new(stdout_pipe).lines() {
        let line = line.context("failed to read renderer output")?;
        if output_path.is_none() {
            if let Some(rest) = line.strip_prefix(PATH_SENTINEL) {
                output_path = Some(PathBuf::from(rest.trim()));
            }
        }
        if !silent {
            writeln!(out, "{line}").context("failed to forward renderer output")?;
        }
        captured.push_str(&line);
        captured.push('\n');
    }

    let status = child.wait().context("failed waiting for the renderer")?;
    let stderr_text = stderr_reader
        .join()
        .map_err(|_| anyhow!("renderer stderr reader thread panicked"))?
        .context("failed to read renderer stderr")?;

    // The sentinel scan decides the outcome; a bad exit without one will
    // surface through the missing-path warning and the flushed diagnostics.
    if !status.success() {
        log::debug!("renderer exited with {status}");
    }

    Ok(Capture {
        output_path,
        stdout: captured,
        stderr: stderr_text,
    })
}

fn wants_help(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "-h" || arg == "--help")
}

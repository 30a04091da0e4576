use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::settings::Settings;

pub fn mime_type(is_gif: bool) -> &'static str {
    if is_gif {
        "image/gif"
    } else {
        "video/mp4"
    }
}

/// Reads the artifact and packs it into a self-contained `data:` URI so the
/// payload survives being viewed away from the machine that rendered it.
pub fn data_uri(path: &Path, is_gif: bool) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read artifact {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        mime_type(is_gif),
        STANDARD.encode(bytes)
    ))
}

pub fn video_tag(source: &str, settings: &Settings) -> String {
    format!(
        r#"<video
  width="{width}"
  height="{height}"
  src="{source}"
  autoplay="{autoplay}"
  {controls}
  {loop_attr}
>
</video>
"#,
        width = settings.width,
        height = settings.height,
        autoplay = if settings.autoplay { "autoplay" } else { "" },
        controls = if settings.controls { "controls" } else { "" },
        loop_attr = if settings.loop_playback { "loop" } else { "" },
    )
}

pub fn image_tag(source: &str, settings: &Settings) -> String {
    format!(
        r#"<img
  width="{width}"
  height="{height}"
  src="{source}"
>
"#,
        width = settings.width,
        height = settings.height,
    )
}

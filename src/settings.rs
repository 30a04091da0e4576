use serde::Serialize;

pub const DEFAULT_WIDTH: &str = "854";
pub const DEFAULT_HEIGHT: &str = "480";

/// Display and capture settings resolved from a magic option line.
///
/// Width and height stay strings: they are only ever substituted into markup
/// attributes, and the renderer's own `-r` convention is `height,width`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub autoplay: bool,
    pub controls: bool,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub remote: bool,
    pub silent: bool,
    pub width: String,
    pub height: String,
    pub export_variables: bool,
    pub is_gif: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            autoplay: true,
            controls: true,
            loop_playback: true,
            remote: false,
            silent: true,
            width: DEFAULT_WIDTH.to_owned(),
            height: DEFAULT_HEIGHT.to_owned(),
            export_variables: true,
            is_gif: false,
        }
    }
}

/// Append-only collector for non-fatal conditions. Entries are logged as they
/// arrive and kept around so callers (and the `--json` surface) can report
/// them after the fact.
#[derive(Debug, Default)]
pub struct Warnings {
    entries: Vec<String>,
}

impl Warnings {
    pub fn push(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves a magic option line into settings plus the residual tokens to
/// forward to the renderer. Never fails: malformed input degrades to the
/// defaults with a recorded warning.
pub fn parse_magic_line(line: &str, warnings: &mut Warnings) -> (Settings, Vec<String>) {
    let mut settings = Settings::default();
    let mut args: Vec<String> = line.split_whitespace().map(str::to_owned).collect();

    if take_flag(&mut args, "--verbose") {
        settings.silent = false;
    }
    if take_flag(&mut args, "--no-controls") {
        settings.controls = false;
    }
    if take_flag(&mut args, "--no-autoplay") {
        settings.autoplay = false;
    }
    if take_flag(&mut args, "--no-loop") {
        settings.loop_playback = false;
    }

    if let Some(index) = args.iter().position(|arg| arg == "-r" || arg == "--resolution") {
        let flag = args.remove(index);
        if index < args.len() {
            // the value is passed as "height,width"
            let value = args.remove(index);
            let parts: Vec<&str> = value.split(',').collect();
            match parts.as_slice() {
                [height, width] if !height.is_empty() && !width.is_empty() => {
                    settings.height = (*height).to_owned();
                    settings.width = (*width).to_owned();
                }
                _ => warnings.push(format!(
                    "unable to read dimensions from '{value}', falling back to the defaults"
                )),
            }
        } else {
            warnings.push(format!(
                "'{flag}' expects a height,width value, falling back to the defaults"
            ));
        }
    }

    if take_flag(&mut args, "-b") | take_flag(&mut args, "--base64") {
        settings.remote = true;
    }

    // also meaningful to the renderer, so the tokens stay in the residual list
    settings.is_gif = args.iter().any(|arg| arg == "-i" || arg == "--save_as_gif");

    (settings, args)
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let mut found = false;
    args.retain(|arg| {
        if arg == flag {
            found = true;
            false
        } else {
            true
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> (Settings, Vec<String>, Warnings) {
        let mut warnings = Warnings::default();
        let (settings, residual) = parse_magic_line(line, &mut warnings);
        (settings, residual, warnings)
    }

    #[test]
    fn resolution_assigns_height_then_width() {
        let (settings, residual, warnings) = parse("-r 100,200");
        assert_eq!(settings.height, "100");
        assert_eq!(settings.width, "200");
        assert!(residual.is_empty());
        assert!(warnings.is_empty());

        let (settings, _, _) = parse("--resolution 100,200");
        assert_eq!(settings.height, "100");
        assert_eq!(settings.width, "200");
    }

    #[test]
    fn resolution_missing_value_keeps_defaults() {
        let (settings, residual, warnings) = parse("-r");
        assert_eq!(settings.height, DEFAULT_HEIGHT);
        assert_eq!(settings.width, DEFAULT_WIDTH);
        assert!(residual.is_empty());
        assert_eq!(warnings.entries().len(), 1);
    }

    #[test]
    fn resolution_without_comma_keeps_defaults() {
        let (settings, _, warnings) = parse("-r 100x200");
        assert_eq!(settings.height, DEFAULT_HEIGHT);
        assert_eq!(settings.width, DEFAULT_WIDTH);
        assert_eq!(warnings.entries().len(), 1);
    }

    #[test]
    fn resolution_with_extra_comma_keeps_defaults() {
        let (settings, _, warnings) = parse("--resolution 100,200,300");
        assert_eq!(settings.height, DEFAULT_HEIGHT);
        assert_eq!(settings.width, DEFAULT_WIDTH);
        assert_eq!(warnings.entries().len(), 1);
    }

    #[test]
    fn base64_flags_set_remote() {
        let (settings, _, _) = parse("");
        assert!(!settings.remote);

        let (settings, residual, _) = parse("-b");
        assert!(settings.remote);
        assert!(residual.is_empty());

        let (settings, residual, _) = parse("--base64");
        assert!(settings.remote);
        assert!(residual.is_empty());
    }

    #[test]
    fn verbose_disables_silent() {
        let (settings, _, _) = parse("");
        assert!(settings.silent);

        let (settings, residual, _) = parse("--verbose");
        assert!(!settings.silent);
        assert!(residual.is_empty());
    }

    #[test]
    fn off_switches_consume_their_tokens() {
        let (settings, residual, _) = parse("--no-controls --no-autoplay --no-loop");
        assert!(!settings.controls);
        assert!(!settings.autoplay);
        assert!(!settings.loop_playback);
        assert!(residual.is_empty());
    }

    #[test]
    fn gif_flag_stays_in_residual_args() {
        let (settings, residual, _) = parse("-i");
        assert!(settings.is_gif);
        assert_eq!(residual, vec!["-i".to_owned()]);

        let (settings, _, _) = parse("--save_as_gif");
        assert!(settings.is_gif);
    }

    #[test]
    fn unrecognized_tokens_pass_through_in_order() {
        let (settings, residual, _) = parse("Shapes --low_quality --verbose");
        assert!(!settings.silent);
        assert_eq!(residual, vec!["Shapes".to_owned(), "--low_quality".to_owned()]);
    }

    #[test]
    fn defaults_survive_overrides() {
        let (settings, _, _) = parse("--no-autoplay -b");
        assert!(settings.controls, "untouched keys keep their defaults");
        assert!(settings.export_variables);
        assert_eq!(settings.width, DEFAULT_WIDTH);
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xeger_generate::XegerOptions;

use crate::CliError;

pub const DEFAULT_SETTINGS_FILE: &str = "xeger.toml";

/// Windows must stay below the repeat count the engine treats as unbounded.
const MAX_WINDOW: u32 = 1 << 16;

/// Defaults read from `xeger.toml`. Command-line flags win over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed seed for reproducible output; a fresh one is drawn when unset.
    pub seed: Option<u64>,
    pub count: usize,
    pub log_level: String,
    pub log_json: bool,
    pub engine: XegerOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            count: 5,
            log_level: "warn".to_string(),
            log_json: false,
            engine: XegerOptions::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let settings: Settings = toml::from_str(content)?;
        check_engine(&settings.engine)?;
        Ok(settings)
    }
}

fn check_engine(engine: &XegerOptions) -> Result<(), CliError> {
    if engine.attempts == 0 {
        return Err(CliError::InvalidArgs(
            "engine.attempts must be at least 1".to_string(),
        ));
    }
    for (key, window) in [
        ("engine.unbounded_window", engine.unbounded_window),
        ("engine.bounded_window", engine.bounded_window),
    ] {
        if window >= MAX_WINDOW {
            return Err(CliError::InvalidArgs(format!(
                "{key} must be below {MAX_WINDOW}, got {window}"
            )));
        }
    }
    Ok(())
}

/// Loads settings from `explicit`, or from `xeger.toml` in the working
/// directory. Only the implicit file may be missing.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, CliError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !path.exists() {
                return Ok(Settings::default());
            }
            path
        }
    };
    let content = std::fs::read_to_string(&path)?;
    Settings::from_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let settings = Settings::from_toml(
            r#"
seed = 42
log_json = true

[engine]
attempts = 3
"#,
        )
        .unwrap();
        assert_eq!(settings.seed, Some(42));
        assert!(settings.log_json);
        assert_eq!(settings.count, 5);
        assert_eq!(settings.engine.attempts, 3);
        assert_eq!(
            settings.engine.unbounded_window,
            XegerOptions::default().unbounded_window
        );
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn malformed_files_are_rejected() {
        assert!(matches!(
            Settings::from_toml("count = \"many\""),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn engine_values_are_checked() {
        for content in [
            "[engine]\nattempts = 0",
            "[engine]\nbounded_window = 4000000000",
            "[engine]\nunbounded_window = 65536",
        ] {
            assert!(
                matches!(Settings::from_toml(content), Err(CliError::InvalidArgs(_))),
                "{content}"
            );
        }
        let edge = Settings::from_toml("[engine]\nattempts = 1\nbounded_window = 0").unwrap();
        assert_eq!(edge.engine.attempts, 1);
        assert_eq!(edge.engine.bounded_window, 0);
    }

    #[test]
    fn explicit_paths_must_exist() {
        let missing = Path::new("definitely/not/here/xeger.toml");
        assert!(matches!(load_settings(Some(missing)), Err(CliError::Io(_))));
    }
}

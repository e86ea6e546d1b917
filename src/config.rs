use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const HISTORY_VAR: &str = "KLISP_HISTORY";
pub const EDIT_MODE_VAR: &str = "KLISP_EDIT_MODE";
pub const PROMPT_VAR: &str = "KLISP_PROMPT";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{var}: unknown edit mode '{value}', expected 'vi' or 'emacs'")]
    InvalidEditMode { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Emacs,
    Vi,
}

impl FromStr for EditMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("vi") {
            Ok(EditMode::Vi)
        } else if s.eq_ignore_ascii_case("emacs") {
            Ok(EditMode::Emacs)
        } else {
            Err(())
        }
    }
}

/// Settings for the interactive session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplConfig {
    pub history_file: PathBuf,
    pub edit_mode: EditMode,
    pub prompt: String,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            history_file: PathBuf::from("klisp_history.txt"),
            edit_mode: EditMode::default(),
            prompt: "klisp> ".to_string(),
        }
    }
}

impl ReplConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset or empty
    /// variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.is_empty());
        let mut config = ReplConfig::default();
        if let Some(path) = get(HISTORY_VAR) {
            config.history_file = PathBuf::from(path);
        }
        if let Some(mode) = get(EDIT_MODE_VAR) {
            config.edit_mode = mode.parse().map_err(|_| ConfigError::InvalidEditMode {
                var: EDIT_MODE_VAR,
                value: mode.clone(),
            })?;
        }
        if let Some(prompt) = get(PROMPT_VAR) {
            config.prompt = prompt;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ReplConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReplConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]), Ok(ReplConfig::default()));
        assert_eq!(config_from(&[(PROMPT_VAR, "")]), Ok(ReplConfig::default()));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (HISTORY_VAR, "/tmp/h.txt"),
            (EDIT_MODE_VAR, "VI"),
            (PROMPT_VAR, "> "),
        ])
        .unwrap();
        assert_eq!(config.history_file, PathBuf::from("/tmp/h.txt"));
        assert_eq!(config.edit_mode, EditMode::Vi);
        assert_eq!(config.prompt, "> ");
    }

    #[test]
    fn test_invalid_edit_mode() {
        assert_eq!(
            config_from(&[(EDIT_MODE_VAR, "nano")]),
            Err(ConfigError::InvalidEditMode {
                var: EDIT_MODE_VAR,
                value: "nano".to_string()
            })
        );
    }
}

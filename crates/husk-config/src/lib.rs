//! Configuration and logging setup shared by Husk binaries.
//!
//! Configuration lives in a small TOML file:
//!
//! ```toml
//! [parser]
//! mode = "full"
//! indent_width = 4
//!
//! [logging]
//! level = "debug"
//! json = false
//! file = "/tmp/husk.log"
//! ```
//!
//! Library crates only emit `tracing` events; [`init_tracing`] is the single
//! place that installs a subscriber.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HuskConfig {
    /// Parser defaults used when a caller does not pick a mode explicitly.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Global logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How much of each method/initializer body the parser materializes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseModeSetting {
    /// Signatures only; bodies are elided.
    #[default]
    Diet,
    /// Diet pass followed by a body pass over the recorded body ranges.
    DietWithBodies,
    /// Structure and bodies in a single pass.
    Full,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    #[serde(default)]
    pub mode: ParseModeSetting,

    /// Spaces per nesting level in the canonical rendering.
    #[serde(default = "ParserConfig::default_indent_width")]
    pub indent_width: usize,
}

impl ParserConfig {
    fn default_indent_width() -> usize {
        2
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: ParseModeSetting::default(),
            indent_width: Self::default_indent_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Mirror logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path.
    ///
    /// If the file cannot be opened, file logging is disabled while stderr
    /// logging stays active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// `EnvFilter` directives for a configured level. A bare level name is
    /// case-insensitive and `warning` means `warn`; anything else is passed
    /// through as a directive string.
    pub(crate) fn level_directives(level: &str) -> String {
        let level = level.trim();
        if level.is_empty() {
            Self::default_level()
        } else if level.eq_ignore_ascii_case("warning") {
            "warn".to_owned()
        } else if level.contains(|c: char| c == '=' || c == ',') {
            level.to_owned()
        } else {
            level.to_ascii_lowercase()
        }
    }

    /// The effective filter: the configured directives followed by `RUST_LOG`,
    /// if set. An unparsable combination falls back to the configured level
    /// alone, then to `warn`.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = Self::level_directives(&self.level);
        let combined = match std::env::var("RUST_LOG") {
            Ok(env) if !env.trim().is_empty() => format!("{configured},{}", env.trim()),
            _ => configured.clone(),
        };
        EnvFilter::try_new(combined)
            .or_else(|_| EnvFilter::try_new(configured))
            .unwrap_or_else(|_| EnvFilter::new(Self::default_level()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl HuskConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Load a config from a TOML string.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: HuskConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parser.indent_width == 0 || self.parser.indent_width > 16 {
            return Err(ConfigError::Invalid(format!(
                "parser.indent_width must be between 1 and 16 (got {})",
                self.parser.indent_width
            )));
        }
        Ok(())
    }
}

static TRACING_INIT: Once = Once::new();

/// Initializes structured `tracing` logging.
///
/// This function is safe to call multiple times; only the first call installs a
/// global subscriber. Returns `true` when this call installed it.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let mut installed = false;

    TRACING_INIT.call_once(|| {
        let filter = logging.env_filter();

        let file = logging.file.as_ref().and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        let file_open_failed = logging.file.is_some() && file.is_none();

        // `Mutex<File>` implements `MakeWriter` directly.
        let make_writer = match (logging.stderr, file) {
            (true, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
            (false, Some(file)) => BoxMakeWriter::new(Mutex::new(file)),
            (true, None) => BoxMakeWriter::new(std::io::stderr),
            (false, None) => BoxMakeWriter::new(std::io::sink),
        };

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            installed = true;
            if file_open_failed {
                if let Some(path) = logging.file.as_ref() {
                    tracing::warn!(
                        target: "husk.config",
                        path = %path.display(),
                        "failed to open log file; file logging disabled"
                    );
                }
            }
        }
    });

    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = HuskConfig::load_from_str("").unwrap();
        assert_eq!(config, HuskConfig::default());
        assert_eq!(config.parser.mode, ParseModeSetting::Diet);
        assert_eq!(config.parser.indent_width, 2);
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.stderr);
    }

    #[test]
    fn parses_parser_and_logging_sections() {
        let config = HuskConfig::load_from_str(
            r#"
[parser]
mode = "diet_with_bodies"
indent_width = 4

[logging]
level = "Debug"
json = true
"#,
        )
        .unwrap();
        assert_eq!(config.parser.mode, ParseModeSetting::DietWithBodies);
        assert_eq!(config.parser.indent_width, 4);
        assert!(config.logging.json);
        assert_eq!(
            LoggingConfig::level_directives(&config.logging.level),
            "debug"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = HuskConfig::load_from_str("[parser]\nspeed = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
    }

    #[test]
    fn zero_indent_width_is_invalid() {
        let err = HuskConfig::load_from_str("[parser]\nindent_width = 0\n").unwrap_err();
        assert!(err.to_string().contains("indent_width"), "{err}");
    }

    #[test]
    fn level_directives_are_normalized() {
        assert_eq!(LoggingConfig::level_directives(""), "warn");
        assert_eq!(LoggingConfig::level_directives(" WARNING "), "warn");
        assert_eq!(
            LoggingConfig::level_directives("husk_syntax=trace"),
            "husk_syntax=trace"
        );
        assert_eq!(LoggingConfig::level_directives("Info"), "info");
        assert_eq!(
            LoggingConfig::level_directives("warn,husk_syntax=TRACE"),
            "warn,husk_syntax=TRACE"
        );
    }
}

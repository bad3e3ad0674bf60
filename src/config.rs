//! Repository configuration (`.cairn/config.toml`).
//!
//! The store itself never reads this file; it only shapes what the command
//! surface asks of the store: which branch `HEAD` starts on and how diffs
//! are rendered.

use std::fmt;
use std::path::Path;

use cairn_store::{BuiltinDiff, DiffRenderer, ExternalDiff};
use serde::{Deserialize, Serialize};

/// File name of the configuration inside the control directory.
pub const CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level cairn repository configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CairnConfig {
    /// Repository-level settings.
    #[serde(default)]
    pub repo: RepoConfig,

    /// Diff rendering settings.
    #[serde(default)]
    pub diff: DiffConfig,
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

/// Repository-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    /// Branch `HEAD` is attached to after `init` (default: `"main"`).
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

// ---------------------------------------------------------------------------
// DiffConfig
// ---------------------------------------------------------------------------

/// How `show` and `diff` render file changes.
///
/// ```toml
/// [diff]
/// renderer = "builtin"
/// tool = "colordiff"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    /// Which renderer to use.
    #[serde(default)]
    pub renderer: RendererKind,

    /// Program spawned by the external renderer. Must accept `diff`'s
    /// `--unified --show-c-function --label` flags.
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            renderer: RendererKind::default(),
            tool: default_tool(),
        }
    }
}

fn default_tool() -> String {
    "diff".to_owned()
}

impl DiffConfig {
    /// Build the renderer this configuration selects.
    #[must_use]
    pub fn renderer(&self) -> Box<dyn DiffRenderer> {
        match self.renderer {
            RendererKind::External => Box::new(ExternalDiff::new(self.tool.clone())),
            RendererKind::Builtin => Box::new(BuiltinDiff),
        }
    }
}

/// Diff renderer selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Spawn an external `diff`-compatible program.
    #[default]
    External,
    /// In-process line diff.
    Builtin,
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => write!(f, "external"),
            Self::Builtin => write!(f, "builtin"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// A `config.toml` that could not be read, parsed, or written.
#[derive(Debug)]
pub struct ConfigError {
    /// Config file involved; `None` for in-memory text.
    pub path: Option<std::path::PathBuf>,
    /// What went wrong. Parse failures start with `line N:`.
    pub message: String,
}

impl ConfigError {
    fn in_memory(message: String) -> Self {
        Self {
            path: None,
            message,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}: {}", p.display(), self.message),
            None => write!(f, "invalid cairn config: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl CairnConfig {
    /// Read the config at `path`. A repository without one runs on defaults.
    ///
    /// # Errors
    /// Unreadable files and malformed contents, tagged with `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse `config.toml` text.
    ///
    /// # Errors
    /// Syntax errors, wrong value types, and keys cairn does not know.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| {
            let message = match e.span() {
                Some(span) => format!("line {}: {}", line_of(text, span.start), e.message()),
                None => e.message().to_owned(),
            };
            ConfigError::in_memory(message)
        })
    }

    /// The file `init` writes: every setting spelled out at its value.
    ///
    /// # Errors
    /// Only if a value cannot be expressed in TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::in_memory(e.to_string()))
    }
}

/// One-based line holding byte `offset` of `text`.
fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

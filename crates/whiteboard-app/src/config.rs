// Configuration loading and validation (config/whiteboard.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the single config file under `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "whiteboard.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// The assembled application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub board: BoardConfig,
    pub catalog: CatalogConfig,
    /// Resolved SQLite path (never empty).
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Draft classes a user may switch between.
    pub draft_classes: Vec<String>,
    /// Class opened at startup.
    pub default_class: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// CSV file imported into the players table at startup, if set.
    #[serde(default)]
    pub import_csv: Option<String>,
}

/// Raw deserialization target for whiteboard.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    board: BoardConfig,
    database: DatabaseSection,
    #[serde(default)]
    catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

impl Config {
    /// Whether `class` is one of the configured draft classes.
    pub fn is_known_class(&self, class: &str) -> bool {
        self.board.draft_classes.iter().any(|c| c == class)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/whiteboard.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Parse config text. `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let db_path = if file.database.path.trim().is_empty() {
        default_db_path()?
    } else {
        file.database.path
    };

    let config = Config {
        board: file.board,
        catalog: file.catalog,
        db_path,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/whiteboard.toml` into `config/` if it is not there yet.
/// Returns the files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the crate root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let source = defaults_dir.join(CONFIG_FILE);
    let target = config_dir.join(CONFIG_FILE);
    if target.exists() || !source.is_file() {
        return Ok(vec![]);
    }

    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;

    Ok(vec![target])
}

/// Load config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// `<data dir>/whiteboard.db`, creating the directory.
fn default_db_path() -> Result<String, ConfigError> {
    let dirs = directories::ProjectDirs::from("com", "wedraft", "whiteboard").ok_or_else(|| {
        ConfigError::ValidationError {
            field: "database.path".into(),
            message: "empty and no home directory to fall back on".into(),
        }
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::ValidationError {
        field: "database.path".into(),
        message: format!("cannot create {}: {e}", data_dir.display()),
    })?;
    Ok(data_dir.join("whiteboard.db").to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let classes = &config.board.draft_classes;
    if classes.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "board.draft_classes".into(),
            message: "must list at least one class".into(),
        });
    }

    if let Some(bad) = classes.iter().find(|c| c.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "board.draft_classes".into(),
            message: format!("class names must not be blank, got {bad:?}"),
        });
    }

    if !config.is_known_class(&config.board.default_class) {
        return Err(ConfigError::ValidationError {
            field: "board.default_class".into(),
            message: format!(
                "{} is not one of {:?}",
                config.board.default_class, classes
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

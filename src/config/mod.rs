//! Broker configuration management for `hotspec.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! ├── types/         # ConfigError
//! ├── util.rs        # Config file lookup, path resolution
//! └── mod.rs         # HotspecConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[endpoint]`  | Socket location, server/client ids               |
//! | `[compiler]`  | Compile command, failure policy                  |
//! | `[startup]`   | Support entry, changed-file warm-up              |
//! | `[watch]`     | Watched roots                                    |
//! | `[client]`    | Requester timeout                                |

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, resolve_against};

use crate::utils::path::normalize_path;

pub use section::{
    ClientConfig, CompilerConfig, EndpointConfig, FailurePolicy, StartupConfig, Transport,
    WatchConfig,
};
pub use types::ConfigError;

use crate::cli::{Cli, Commands, PreprocessArgs, ServeArgs};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hotspec.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotspecConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Socket endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Compile command settings
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Startup warm-up settings
    #[serde(default)]
    pub startup: StartupConfig,

    /// Watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Requester settings
    #[serde(default)]
    pub client: ClientConfig,
}

impl HotspecConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. Without one, defaults
    /// apply and the project root is the cwd.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, config_path) = match find_config_file(&cli.config) {
            Some(path) => (Self::from_path(&path)?, path),
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd.join(&cli.config))
            }
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        config.config_path = config_path;
        config.finalize(&root, cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        crate::log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Resolve paths and apply CLI options.
    fn finalize(&mut self, root: &Path, cli: &Cli) {
        self.set_root(root);
        self.normalize_paths();
        self.apply_command_options(cli);
    }

    /// Make every configured path absolute against the project root.
    fn normalize_paths(&mut self) {
        let root = self.root.clone();

        // Canonical where they exist, so they match watcher events
        self.startup.support_file =
            normalize_path(&resolve_against(&root, &self.startup.support_file));
        for dir in &mut self.startup.changed_roots {
            *dir = normalize_path(&resolve_against(&root, dir));
        }
        for dir in &mut self.watch.roots {
            *dir = normalize_path(&resolve_against(&root, dir));
        }
        if let Some(cwd) = &self.compiler.cwd {
            self.compiler.cwd = Some(resolve_against(&root, cwd));
        }
        if let Some(socket_root) = &self.endpoint.socket_root {
            self.endpoint.socket_root = Some(resolve_against(&root, socket_root));
        }
    }

    /// Validate values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server_id = &self.endpoint.server_id;
        if server_id.is_empty() {
            return Err(ConfigError::Validation(
                "`endpoint.server_id` must not be empty".into(),
            ));
        }
        if server_id.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "`endpoint.server_id` must not contain path separators: `{server_id}`"
            )));
        }
        if self.endpoint.client_id.is_empty() {
            return Err(ConfigError::Validation(
                "`endpoint.client_id` must not be empty".into(),
            ));
        }
        if self.endpoint.transport == Transport::Tcp && self.endpoint.port == 0 {
            return Err(ConfigError::Validation(
                "`endpoint.port` must be set when `transport = \"tcp\"`".into(),
            ));
        }
        if self
            .compiler
            .command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "`compiler.command` must start with a program name".into(),
            ));
        }
        Ok(())
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve { args } => self.apply_serve_args(args),
            Commands::Preprocess { args } => self.apply_preprocess_args(args),
        }
    }

    fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.watch.enable, args.watch.as_ref());
        Self::update_option(&mut self.compiler.failure_policy, args.failure_policy.as_ref());
        Self::update_option(&mut self.startup.eager_limit, args.eager_limit.as_ref());
    }

    fn apply_preprocess_args(&mut self, args: &PreprocessArgs) {
        Self::update_option(&mut self.client.request_timeout_ms, args.timeout.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }
}

/// Parse a config snippet for tests, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HotspecConfig {
    let (parsed, ignored) = HotspecConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

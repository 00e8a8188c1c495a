// Copyright 2026 The Firstlight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Config
//!
//! Compiled-in defaults, then a TOML file, then command line flags.  The file is optional unless
//! named explicitly with `--config`.
//!
//! ```toml
//! [application]
//! name = "Vulkan Example"
//! engine = "Vulkan Engine"
//!
//! [window]
//! width = 1280
//! height = 720
//! title = "Vulkan Example"
//! backend = "auto"          # auto | x11 | wayland
//!
//! [vulkan]
//! validation = false
//! present = false
//! ```

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::{debug, info, warn};

use firstlight_vulkan::context::AppInfo;

use crate::window::{WindowConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::Args;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{key} must be {expected}")]
    Type {
        key: &'static str,
        expected: &'static str,
    },

    #[error("{key} = {value} is out of range")]
    OutOfRange { key: &'static str, value: i64 },

    #[error("unknown window backend {0:?}")]
    Backend(String),

    #[error("window size {width}x{height} has a zero dimension")]
    ZeroExtent { width: u32, height: u32 },
}

/// Which window system `winit` should connect to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Let the platform decide
    #[default]
    Auto,
    /// Force an X11 connection (Linux)
    X11,
    /// Force a Wayland connection (Linux)
    Wayland,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    /// Defaults to the application name.
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
    pub backend: Backend,
    /// Perform one acquire/present handoff after bring-up.
    pub present: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppInfo::default(),
            title: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            backend: Backend::Auto,
            present: false,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        match &args.config {
            Some(path) => config.merge_file(path)?,
            None => match default_path() {
                Some(path) if path.exists() => config.merge_file(&path)?,
                Some(path) => debug!("no config at {}, using defaults", path.display()),
                None => debug!("no config directory, using defaults"),
            },
        }

        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        info!("loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        self.merge_toml(&table)
    }

    pub fn merge_toml(&mut self, table: &toml::Table) -> Result<(), ConfigError> {
        for (section, entries) in table {
            let Some(entries) = entries.as_table() else {
                warn!("ignoring top level config key {section:?}");
                continue;
            };
            for (key, value) in entries {
                match (section.as_str(), key.as_str()) {
                    ("application", "name") => {
                        self.app.application = string(value, "application.name")?
                    }
                    ("application", "engine") => {
                        self.app.engine = string(value, "application.engine")?
                    }
                    ("window", "title") => self.title = Some(string(value, "window.title")?),
                    ("window", "width") => self.width = dimension(value, "window.width")?,
                    ("window", "height") => self.height = dimension(value, "window.height")?,
                    ("window", "backend") => {
                        let name = string(value, "window.backend")?;
                        self.backend = Backend::from_str(&name, true)
                            .map_err(|_| ConfigError::Backend(name))?;
                    }
                    ("vulkan", "validation") => {
                        self.app.validation = boolean(value, "vulkan.validation")?
                    }
                    ("vulkan", "present") => self.present = boolean(value, "vulkan.present")?,
                    _ => warn!("ignoring unknown config key {section}.{key}"),
                }
            }
        }
        Ok(())
    }

    /// Flags only ever switch things on; sizes and backend replace file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.width = width;
        }
        if let Some(height) = args.height {
            self.height = height;
        }
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        self.app.validation |= args.validation;
        self.present |= args.present;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroExtent {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| self.app.application.clone()),
            width: self.width,
            height: self.height,
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("firstlight").join("config.toml"))
}

fn string(value: &toml::Value, key: &'static str) -> Result<String, ConfigError> {
    value.as_str().map(str::to_owned).ok_or(ConfigError::Type {
        key,
        expected: "a string",
    })
}

fn boolean(value: &toml::Value, key: &'static str) -> Result<bool, ConfigError> {
    value.as_bool().ok_or(ConfigError::Type {
        key,
        expected: "a boolean",
    })
}

fn dimension(value: &toml::Value, key: &'static str) -> Result<u32, ConfigError> {
    let raw = value.as_integer().ok_or(ConfigError::Type {
        key,
        expected: "an integer",
    })?;
    u32::try_from(raw).map_err(|_| ConfigError::OutOfRange { key, value: raw })
}

#[cfg(test)]
mod test {
    use super::*;

    fn table(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    fn args(argv: &[&str]) -> Args {
        use clap::Parser;
        Args::parse_from(std::iter::once("firstlight").chain(argv.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.backend, Backend::Auto);
        assert!(!config.present);
        assert_eq!(config.window().title, "Vulkan Example");
        config.validate().unwrap();
    }

    #[test]
    fn test_merge_all_keys() {
        let mut config = Config::default();
        config
            .merge_toml(&table(
                r#"
                [application]
                name = "Chapter 10"
                engine = "Bring-up"

                [window]
                width = 800
                height = 600
                title = "Swapchain"
                backend = "Wayland"

                [vulkan]
                validation = true
                present = true
                "#,
            ))
            .unwrap();

        assert_eq!(config.app.application, "Chapter 10");
        assert_eq!(config.app.engine, "Bring-up");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.window().title, "Swapchain");
        assert_eq!(config.backend, Backend::Wayland);
        assert!(config.app.validation);
        assert!(config.present);
    }

    #[test]
    fn test_title_follows_application_name() {
        let mut config = Config::default();
        config
            .merge_toml(&table("[application]\nname = \"Chapter 6\""))
            .unwrap();
        assert_eq!(config.window().title, "Chapter 6");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut config = Config::default();
        config
            .merge_toml(&table("stray = 1\n[window]\ndepth = 3\n[audio]\nrate = 48000"))
            .unwrap();
        assert_eq!((config.width, config.height), (1280, 720));
    }

    #[test]
    fn test_wrong_types_rejected() {
        let mut config = Config::default();
        let err = config
            .merge_toml(&table("[window]\nwidth = \"wide\""))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Type { key: "window.width", .. }));

        let err = config
            .merge_toml(&table("[vulkan]\nvalidation = 1"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Type { key: "vulkan.validation", .. }));
    }

    #[test]
    fn test_out_of_range_dimension() {
        let mut config = Config::default();
        let err = config
            .merge_toml(&table("[window]\nheight = -720"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "window.height",
                value: -720
            }
        ));
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = Config::default();
        let err = config
            .merge_toml(&table("[window]\nbackend = \"win32\""))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Backend(name) if name == "win32"));
    }

    #[test]
    fn test_args_override_file() {
        let mut config = Config::default();
        config
            .merge_toml(&table("[window]\nwidth = 800\nheight = 600\nbackend = \"x11\""))
            .unwrap();
        config.apply_args(&args(&["--width", "1024", "--backend", "auto", "--validation"]));
        assert_eq!((config.width, config.height), (1024, 600));
        assert_eq!(config.backend, Backend::Auto);
        assert!(config.app.validation);
        assert!(!config.present);
    }

    #[test]
    fn test_zero_extent_rejected() {
        let mut config = Config::default();
        config.apply_args(&args(&["--height", "0"]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroExtent {
                width: 1280,
                height: 0
            })
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let path = std::env::temp_dir().join("firstlight-test-missing/config.toml");
        let err = Config::load(&Args {
            config: Some(path),
            ..Args::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_file_then_args() {
        let dir = std::env::temp_dir().join(format!("firstlight-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[window]\nwidth = 640\nheight = 480\n").unwrap();

        let mut parsed = args(&["--height", "400", "--present"]);
        parsed.config = Some(path);
        let config = Config::load(&parsed).unwrap();
        assert_eq!((config.width, config.height), (640, 400));
        assert!(config.present);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_malformed_file() {
        let dir = std::env::temp_dir().join(format!("firstlight-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[window\nwidth = ").unwrap();

        let mut config = Config::default();
        let err = config.merge_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

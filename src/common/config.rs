//! Configuration schema, defaults, and layered loading.
//!
//! Precedence: defaults < config file < environment < CLI
use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::share::archive::Archiver;
use crate::share::link::FIRST_WORDS_FILE;
use crate::transport::local::BindScope;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DOWNLOADS: u64 = 1;
pub const ENV_PREFIX: &str = "HTTPSHARE_";
pub const WORDS_SUBDIR: &str = "words";

pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "httpshare")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("httpshare.toml"))
}

/// Fully resolved application configuration after all layers merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    /// 0 means unlimited.
    pub downloads: u64,
    pub archiver: Archiver,
    pub bind: BindScope,
    /// Directory holding `first_words.txt` and `second_words.txt`.
    pub words_dir: Option<PathBuf>,
    pub show_qr: bool,
    pub clipboard: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            downloads: DEFAULT_DOWNLOADS,
            archiver: Archiver::default(),
            bind: BindScope::default(),
            words_dir: None,
            show_qr: false,
            clipboard: true,
        }
    }
}

impl AppConfig {
    /// Word list directory: `words_dir` when set, otherwise next to the
    /// executable (`<exe dir>/words`, then `<exe dir>`).
    pub fn resolved_words_dir(&self) -> Option<PathBuf> {
        self.words_dir.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(words_dir_near))
        })
    }

    /// Rejects values that cannot be served.
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.words_dir {
            ensure!(
                !dir.as_os_str().is_empty(),
                "Invalid config: words_dir must not be empty"
            );
        }
        Ok(())
    }
}

fn words_dir_near(exe_dir: &Path) -> PathBuf {
    let bundled = exe_dir.join(WORDS_SUBDIR);
    if bundled.join(FIRST_WORDS_FILE).is_file() {
        bundled
    } else {
        exe_dir.to_path_buf()
    }
}

/// Values supplied on the command line. `None` leaves lower layers alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archiver: Option<Archiver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<BindScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_qr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clipboard: Option<bool>,
}

fn figment(overrides: &ConfigOverrides) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(overrides))
}

/// Loads config from defaults/file/env, then applies CLI overrides.
pub fn load_config(overrides: &ConfigOverrides) -> Result<AppConfig> {
    let config: AppConfig = figment(overrides)
        .extract()
        .context("Failed to load configuration")?;

    config.validate()?;

    Ok(config)
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::system::history::DEFAULT_CAPACITY;
use crate::theme::ThemeMode;

pub const DEFAULT_INTERVAL_SECS: f64 = 2.0;
pub const MIN_INTERVAL_SECS: f64 = 0.25;
pub const MAX_INTERVAL_SECS: f64 = 10.0;
pub const INTERVAL_STEP_SECS: f64 = 0.5;

pub const DEFAULT_ZOOM: f64 = 1.0;
pub const MIN_ZOOM: f64 = 0.6;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 0.1;
/// `font_size` in legacy files maps to `zoom = font_size / BASE_FONT_SIZE`.
const BASE_FONT_SIZE: f64 = 10.0;

pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

pub const MIN_HISTORY: usize = 2;
pub const MAX_HISTORY: usize = 3600;

/// Settings threaded explicitly through constructors. Never mutated in
/// place; adjustments return a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub interval_seconds: f64,
    pub theme: ThemeMode,
    pub zoom: f64,
    pub history_len: usize,
    pub sample_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interval_seconds: DEFAULT_INTERVAL_SECS,
            theme: ThemeMode::Auto,
            zoom: DEFAULT_ZOOM,
            history_len: DEFAULT_CAPACITY,
            sample_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn clamp_interval(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
    } else {
        DEFAULT_INTERVAL_SECS
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        DEFAULT_ZOOM
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(clamp_interval(self.interval_seconds))
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms.max(1))
    }

    pub fn with_interval(&self, secs: f64) -> Self {
        Config {
            interval_seconds: clamp_interval(secs),
            ..self.clone()
        }
    }

    pub fn slower(&self) -> Self {
        self.with_interval(self.interval_seconds + INTERVAL_STEP_SECS)
    }

    pub fn faster(&self) -> Self {
        self.with_interval(self.interval_seconds - INTERVAL_STEP_SECS)
    }

    pub fn with_theme(&self, theme: ThemeMode) -> Self {
        Config {
            theme,
            ..self.clone()
        }
    }

    pub fn with_zoom(&self, zoom: f64) -> Self {
        Config {
            zoom: clamp_zoom(zoom),
            ..self.clone()
        }
    }

    pub fn zoomed_in(&self) -> Self {
        self.with_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoomed_out(&self) -> Self {
        self.with_zoom(self.zoom - ZOOM_STEP)
    }

    pub fn zoom_reset(&self) -> Self {
        self.with_zoom(DEFAULT_ZOOM)
    }

    pub fn to_file_string(&self) -> String {
        format!(
            "# sysmon settings\n\
             interval = {}\n\
             theme = {}\n\
             zoom = {}\n\
             history = {}\n\
             timeout_ms = {}\n",
            self.interval_seconds, self.theme, self.zoom, self.history_len, self.sample_timeout_ms
        )
    }

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        let positive_f64 = |v: &str| -> std::result::Result<f64, String> {
            match v.parse::<f64>() {
                Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
                _ => Err(format!("`{key}` must be a positive number, got `{v}`")),
            }
        };
        let positive_u64 = |v: &str| -> std::result::Result<u64, String> {
            match v.parse::<u64>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(format!("`{key}` must be a positive integer, got `{v}`")),
            }
        };

        match key {
            "interval" => self.interval_seconds = clamp_interval(positive_f64(value)?),
            "update_interval_ms" => {
                self.interval_seconds = clamp_interval(positive_u64(value)? as f64 / 1000.0);
            }
            "theme" | "theme_mode" => {
                self.theme = ThemeMode::from_str_config(value)
                    .ok_or_else(|| format!("unknown theme `{value}` (dark|light|auto)"))?;
            }
            "zoom" => self.zoom = clamp_zoom(positive_f64(value)?),
            "font_size" => self.zoom = clamp_zoom(positive_u64(value)? as f64 / BASE_FONT_SIZE),
            "history" => {
                let len = positive_u64(value)?;
                if !(MIN_HISTORY as u64..=MAX_HISTORY as u64).contains(&len) {
                    return Err(format!(
                        "`{key}` must be between {MIN_HISTORY} and {MAX_HISTORY}, got `{value}`"
                    ));
                }
                self.history_len = len as usize;
            }
            "timeout_ms" => self.sample_timeout_ms = positive_u64(value)?,
            other => return Err(format!("unknown key `{other}`")),
        }
        Ok(())
    }
}

/// Parse a flat `key = value` file. Bad lines are reported and skipped; the
/// affected key keeps its default.
pub fn parse_config(contents: &str) -> (Config, Vec<Error>) {
    let mut config = Config::default();
    let mut problems = Vec::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with(';')
            || (line.starts_with('[') && line.ends_with(']'))
        {
            continue;
        }
        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            problems.push(Error::ConfigMalformed {
                line: idx + 1,
                reason: format!("expected `key = value`, got `{line}`"),
            });
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().trim_matches('"');
        if let Err(reason) = config.apply(&key, value) {
            problems.push(Error::ConfigMalformed {
                line: idx + 1,
                reason,
            });
        }
    }

    (config, problems)
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysmon").join("sysmon.cfg"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Config::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable config, using defaults");
            return Config::default();
        }
    };
    let (config, problems) = parse_config(&contents);
    for problem in &problems {
        tracing::warn!(path = %path.display(), "{problem}");
    }
    config
}

/// Write every key, replacing the file atomically.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("cfg.tmp");
    std::fs::write(&tmp, config.to_file_string())?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

/// Shared access to the current [`Config`]. Updates swap in a whole new
/// value that subscribers observe on their next read.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }

    pub fn replace(&self, config: Config) -> Arc<Config> {
        self.tx.send_replace(Arc::new(config))
    }

    /// Derive the next config from the current one and swap it in.
    pub fn update(&self, f: impl FnOnce(&Config) -> Config) -> Arc<Config> {
        let next = f(&self.current());
        self.replace(next);
        self.current()
    }
}

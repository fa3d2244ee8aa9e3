//! Theme selection for presentation layers.
//!
//! `Auto` is resolved once at startup through a [`ThemeDetector`]; nothing
//! re-queries the environment afterwards.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Dark,
    Light,
    #[default]
    Auto,
}

impl ThemeMode {
    pub fn next(self) -> Self {
        match self {
            ThemeMode::Auto => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Auto,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
            ThemeMode::Auto => "auto",
        }
    }

    pub fn from_str_config(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Some(ThemeMode::Dark),
            "light" => Some(ThemeMode::Light),
            "auto" => Some(ThemeMode::Auto),
            _ => None,
        }
    }

    /// Undetectable environments fall back to dark.
    pub fn resolve(self, detector: &dyn ThemeDetector) -> ResolvedTheme {
        match self {
            ThemeMode::Dark => ResolvedTheme::Dark,
            ThemeMode::Light => ResolvedTheme::Light,
            ThemeMode::Auto => detector.detect().unwrap_or(ResolvedTheme::Dark),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Dark,
    Light,
}

impl ResolvedTheme {
    pub fn label(self) -> &'static str {
        match self {
            ResolvedTheme::Dark => "dark",
            ResolvedTheme::Light => "light",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ResolvedTheme::Dark => Palette::dark(),
            ResolvedTheme::Light => Palette::light(),
        }
    }
}

/// Capability for asking the desktop or terminal which scheme is active.
pub trait ThemeDetector {
    fn detect(&self) -> Option<ResolvedTheme>;
}

/// A detector with a predetermined answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTheme(pub Option<ResolvedTheme>);

impl ThemeDetector for FixedTheme {
    fn detect(&self) -> Option<ResolvedTheme> {
        self.0
    }
}

/// Reads the `COLORFGBG` convention (`"fg;bg"`) set by many terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorFgBg;

impl ColorFgBg {
    pub fn parse(value: &str) -> Option<ResolvedTheme> {
        let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
        // ANSI 0-6 and 8 are dark backgrounds; 7 and 9-15 are light.
        match bg {
            0..=6 | 8 => Some(ResolvedTheme::Dark),
            7 | 9..=15 => Some(ResolvedTheme::Light),
            _ => None,
        }
    }
}

impl ThemeDetector for ColorFgBg {
    fn detect(&self) -> Option<ResolvedTheme> {
        let value = std::env::var("COLORFGBG").ok()?;
        Self::parse(&value)
    }
}

/// Hex colors for each role in a themed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub bg: &'static str,
    pub panel: &'static str,
    pub fg: &'static str,
    pub accent: &'static str,
    pub warn: &'static str,
    pub crit: &'static str,
    pub disk: &'static str,
    pub swap: &'static str,
    pub status: &'static str,
}

impl Palette {
    pub fn dark() -> Self {
        Palette {
            bg: "#121212",
            panel: "#1e1e1e",
            fg: "#e0e0e0",
            accent: "#4caf50",
            warn: "#ff9800",
            crit: "#f44336",
            disk: "#03a9f4",
            swap: "#9c27b0",
            status: "#888888",
        }
    }

    pub fn light() -> Self {
        Palette {
            bg: "#f5f5f5",
            panel: "#e0e0e0",
            fg: "#202020",
            accent: "#388e3c",
            warn: "#f57c00",
            crit: "#d32f2f",
            disk: "#0288d1",
            swap: "#7b1fa2",
            status: "#555555",
        }
    }

    pub fn load_color(&self, pct: f32) -> &'static str {
        match LoadLevel::classify(pct) {
            LoadLevel::Normal => self.accent,
            LoadLevel::Elevated => self.warn,
            LoadLevel::Critical => self.crit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    Normal,
    Elevated,
    Critical,
}

impl LoadLevel {
    pub fn classify(pct: f32) -> Self {
        if pct < 50.0 {
            LoadLevel::Normal
        } else if pct < 75.0 {
            LoadLevel::Elevated
        } else {
            LoadLevel::Critical
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            LoadLevel::Normal => " ",
            LoadLevel::Elevated => "!",
            LoadLevel::Critical => "!!",
        }
    }
}

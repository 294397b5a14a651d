use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;
pub const MAX_REFRESH_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Clamp a requested refresh interval into the supported range.
pub fn clamp_interval(ms: i64) -> u64 {
    ms.clamp(MIN_REFRESH_INTERVAL_MS as i64, MAX_REFRESH_INTERVAL_MS as i64) as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Unknown names fall back to the dark theme.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Dark => &DARK_PALETTE,
            Theme::Light => &LIGHT_PALETTE,
        }
    }
}

/// Named hex colours a presentation layer paints a theme with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub root: &'static str,
    pub panel: &'static str,
    pub card: &'static str,
    pub line: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub entry: &'static str,
    pub entry_fg: &'static str,
    pub accent: &'static str,
    pub accent_hover: &'static str,
    pub accent_press: &'static str,
    pub accent_text: &'static str,
    pub select: &'static str,
}

const DARK_PALETTE: Palette = Palette {
    root: "#0f172a",
    panel: "#111827",
    card: "#0b1220",
    line: "#1f2937",
    text: "#e2e8f0",
    muted: "#94a3b8",
    entry: "#020617",
    entry_fg: "#dbeafe",
    accent: "#2563eb",
    accent_hover: "#3b82f6",
    accent_press: "#1d4ed8",
    accent_text: "#eff6ff",
    select: "#2563eb",
};

const LIGHT_PALETTE: Palette = Palette {
    root: "#f1f5f9",
    panel: "#ffffff",
    card: "#f8fafc",
    line: "#dbe3ee",
    text: "#0f172a",
    muted: "#475569",
    entry: "#ffffff",
    entry_fg: "#0f172a",
    accent: "#2563eb",
    accent_hover: "#3b82f6",
    accent_press: "#1d4ed8",
    accent_text: "#eff6ff",
    select: "#93c5fd",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub theme: Theme,
    pub refresh_interval_ms: u64,
    pub auto_refresh: bool,
    pub favorites: IndexMap<String, String>,
    pub web_shortcuts: IndexMap<String, String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Self::with_home(&home)
    }
}

impl AppSettings {
    /// Defaults with favorites rooted at `home`.
    pub fn with_home(home: &Path) -> Self {
        let documents = home.join("Documents").display().to_string();
        let downloads = home.join("Downloads").display().to_string();

        let mut favorites = IndexMap::new();
        favorites.insert("Documents".to_string(), documents.clone());
        favorites.insert("Downloads".to_string(), downloads);
        favorites.insert("Projects".to_string(), documents);

        let mut web_shortcuts = IndexMap::new();
        web_shortcuts.insert("YouTube".to_string(), "https://www.youtube.com".to_string());
        web_shortcuts.insert("GitHub".to_string(), "https://github.com".to_string());

        Self {
            theme: Theme::Dark,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            auto_refresh: true,
            favorites,
            web_shortcuts,
        }
    }

    /// Overlay a persisted document onto `defaults` key by key and repair every
    /// field. Anything that is not a JSON object overlays nothing.
    pub fn overlay(defaults: Self, persisted: &Value) -> Self {
        let Some(fields) = persisted.as_object() else {
            warn!(event = "settings.overlay_skipped", reason = "not an object");
            return defaults;
        };

        let mut settings = defaults;

        if let Some(theme) = fields.get("theme") {
            settings.theme = theme.as_str().map(Theme::from_name).unwrap_or_default();
        }
        if let Some(interval) = fields.get("refresh_interval_ms") {
            settings.refresh_interval_ms = interval_from_value(interval);
        }
        if let Some(auto) = fields.get("auto_refresh") {
            settings.auto_refresh = truthy(auto);
        }
        if let Some(favorites) = fields.get("favorites") {
            if let Some(map) = favorites.as_object() {
                settings.favorites = string_entries("favorites", map);
            }
        }
        if let Some(shortcuts) = fields.get("web_shortcuts") {
            if let Some(map) = shortcuts.as_object() {
                settings.web_shortcuts = string_entries("web_shortcuts", map);
            }
        }

        settings
    }

    pub fn set_refresh_interval(&mut self, ms: i64) {
        self.refresh_interval_ms = clamp_interval(ms);
    }

    /// Copy with the interval forced back into range, used before every write.
    pub fn validated(&self) -> Self {
        let mut copy = self.clone();
        copy.refresh_interval_ms = copy
            .refresh_interval_ms
            .clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS);
        copy
    }
}

fn interval_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(number) => {
            if let Some(ms) = number.as_i64() {
                return clamp_interval(ms);
            }
            // Integers past 64 bits keep their literal text; clamp them by sign.
            let text = number.to_string();
            let (negative, digits) = match text.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, text.as_str()),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                DEFAULT_REFRESH_INTERVAL_MS
            } else if negative {
                MIN_REFRESH_INTERVAL_MS
            } else {
                MAX_REFRESH_INTERVAL_MS
            }
        }
        _ => DEFAULT_REFRESH_INTERVAL_MS,
    }
}

/// Truthiness: null, false, zero, and empty strings, arrays or objects are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn string_entries(field: &str, map: &Map<String, Value>) -> IndexMap<String, String> {
    map.iter()
        .filter_map(|(name, target)| match target.as_str() {
            Some(target) => Some((name.clone(), target.to_string())),
            None => {
                warn!(
                    event = "settings.entry_dropped",
                    field = field,
                    name = name.as_str(),
                    "dropping non-string entry"
                );
                None
            }
        })
        .collect()
}

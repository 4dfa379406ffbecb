use crate::game::scroll::{DEFAULT_SCROLL_SPEED_MS, ScrollDirection, ScrollSettings};
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_PATH: &str = "mania.ini";

// --- Options file ---

/// `[Section]` / `Key=Value` pairs of the options file. Later keys win.
#[derive(Debug, Default)]
pub struct OptionsIni {
    values: HashMap<(String, String), String>,
}

impl OptionsIni {
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        let mut section = "";
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with([';', '#']) {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim();
                continue;
            }
            if let Some((key, value)) = line.split_once('=')
                && !key.trim().is_empty()
            {
                values.insert(
                    (section.to_string(), key.trim().to_string()),
                    value.trim().to_string(),
                );
            }
        }
        Self { values }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.values
            .get(&(section.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Typed read; `None` when absent or unparsable.
    fn value<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.get(section, key).and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    pub scroll_speed_ms: f64,
    pub scroll_direction: ScrollDirection,
    /// Key-count variant to load when the beatmap does not say.
    pub key_count: usize,
    pub screen_width: u32,
    pub screen_height: u32,
    /// 0 = run frames back to back.
    pub target_fps: u32,
    /// Drawn note height in pixels; 0 = derive from the note texture.
    pub note_height: f32,
    pub skin_dir: PathBuf,
    pub beatmap: Option<PathBuf>,
    /// Write the resolved descriptor tree as JSON next to the config.
    pub dump_skin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            scroll_speed_ms: DEFAULT_SCROLL_SPEED_MS,
            scroll_direction: ScrollDirection::Down,
            key_count: 4,
            screen_width: 1024,
            screen_height: 768,
            target_fps: 60,
            note_height: 0.0,
            skin_dir: PathBuf::from("skin"),
            beatmap: None,
            dump_skin: false,
        }
    }
}

impl Config {
    pub fn scroll_settings(&self) -> ScrollSettings {
        ScrollSettings::new(self.scroll_direction, self.scroll_speed_ms)
    }

    pub fn screen_size(&self) -> [f32; 2] {
        [self.screen_width as f32, self.screen_height as f32]
    }

    /// Builds a config from the options file, using defaults for any
    /// missing or malformed keys.
    pub fn from_ini(conf: &OptionsIni) -> Self {
        let default = Self::default();
        Self {
            log_level: conf.value("Options", "LogLevel").unwrap_or(default.log_level),
            scroll_speed_ms: conf
                .value::<f64>("Options", "ScrollSpeedMs")
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default.scroll_speed_ms),
            scroll_direction: conf
                .value("Options", "ScrollDirection")
                .unwrap_or(default.scroll_direction),
            key_count: conf.value("Options", "KeyCount").unwrap_or(default.key_count),
            screen_width: conf
                .value::<u32>("Options", "ScreenWidth")
                .filter(|v| *v > 0)
                .unwrap_or(default.screen_width),
            screen_height: conf
                .value::<u32>("Options", "ScreenHeight")
                .filter(|v| *v > 0)
                .unwrap_or(default.screen_height),
            target_fps: conf.value("Options", "TargetFps").unwrap_or(default.target_fps),
            note_height: conf
                .value::<f32>("Options", "NoteHeight")
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default.note_height),
            skin_dir: conf
                .get("Paths", "SkinDir")
                .filter(|v| !v.is_empty())
                .map_or(default.skin_dir, PathBuf::from),
            beatmap: conf
                .get("Paths", "Beatmap")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            dump_skin: conf
                .value::<u8>("Options", "DumpSkin")
                .map_or(default.dump_skin, |v| v != 0),
        }
    }
}

// --- File I/O ---

fn default_config_text() -> String {
    let default = Config::default();
    let mut content = String::new();
    content.push_str("[Options]\n");
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push_str(&format!("ScrollSpeedMs={}\n", default.scroll_speed_ms));
    content.push_str(&format!("ScrollDirection={}\n", default.scroll_direction.as_str()));
    content.push_str(&format!("KeyCount={}\n", default.key_count));
    content.push_str(&format!("ScreenWidth={}\n", default.screen_width));
    content.push_str(&format!("ScreenHeight={}\n", default.screen_height));
    content.push_str(&format!("TargetFps={}\n", default.target_fps));
    content.push_str(&format!("NoteHeight={}\n", default.note_height));
    content.push_str(&format!("DumpSkin={}\n", u8::from(default.dump_skin)));
    content.push('\n');
    content.push_str("[Paths]\n");
    content.push_str(&format!("SkinDir={}\n", default.skin_dir.display()));
    content.push_str("Beatmap=\n");
    content
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, default_config_text())
}

/// Loads the config at `path`, writing a default file first if none exists.
/// Never fails: unreadable files fall back to defaults with a warning.
pub fn load<P: AsRef<Path>>(path: P) -> Config {
    let path = path.as_ref();
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg = Config::from_ini(&OptionsIni::parse(&content));
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}; using defaults.", path.display());
            Config::default()
        }
    }
}

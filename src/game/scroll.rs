use std::str::FromStr;

/// Approach time used when the player has not picked one.
pub const DEFAULT_SCROLL_SPEED_MS: f64 = 542.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    /// Notes fall toward a judgement line near the bottom.
    #[default]
    Down,
    /// Notes rise toward a judgement line near the top.
    Up,
}

impl ScrollDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "Down",
            Self::Up => "Up",
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" | "downscroll" => Ok(Self::Down),
            "up" | "upscroll" | "reverse" => Ok(Self::Up),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSettings {
    pub direction: ScrollDirection,
    /// Time in ms a note spends travelling from the spawn edge to the
    /// judgement line. Larger is slower.
    pub speed_ms: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            direction: ScrollDirection::Down,
            speed_ms: DEFAULT_SCROLL_SPEED_MS,
        }
    }
}

impl ScrollSettings {
    pub fn new(direction: ScrollDirection, speed_ms: f64) -> Self {
        let speed_ms = if speed_ms.is_finite() && speed_ms > 0.0 {
            speed_ms
        } else {
            DEFAULT_SCROLL_SPEED_MS
        };
        Self {
            direction,
            speed_ms,
        }
    }
}

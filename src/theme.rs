use ratatui::style::Color;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, error, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::Rgb(13, 17, 23),
                foreground: Color::Rgb(230, 237, 243),
                muted: Color::Rgb(125, 133, 144),
                accent: Color::Rgb(0, 210, 106),
                highlight: Color::Rgb(33, 38, 45),
                border: Color::Rgb(48, 54, 61),
                warning: Color::Rgb(210, 153, 34),
            },
            Theme::Light => Palette {
                background: Color::Rgb(255, 255, 255),
                foreground: Color::Rgb(31, 35, 40),
                muted: Color::Rgb(101, 109, 118),
                accent: Color::Rgb(26, 127, 55),
                highlight: Color::Rgb(234, 238, 242),
                border: Color::Rgb(208, 215, 222),
                warning: Color::Rgb(154, 103, 0),
            },
        }
    }

    /// Guess from the terminal's `COLORFGBG` ("fg;bg"), light when the
    /// background is white or light grey.
    pub fn from_colorfgbg(value: &str) -> Option<Theme> {
        let bg = value.rsplit(';').next()?.trim().parse::<u8>().ok()?;
        Some(if matches!(bg, 7 | 15) {
            Theme::Light
        } else {
            Theme::Dark
        })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme \"{other}\", expected dark or light")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight: Color,
    pub border: Color,
    pub warning: Color,
}

/// Remembers the chosen theme between runs.
#[derive(Debug, Clone)]
pub struct ThemeStore {
    path: Option<PathBuf>,
}

impl ThemeStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Option<Theme> {
        let path = self.path.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        match content.parse::<Theme>() {
            Ok(theme) => Some(theme),
            Err(e) => {
                debug!("Ignoring stored theme in {:?}: {e}", path);
                None
            }
        }
    }

    pub fn save(&self, theme: Theme) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        match fs::write(path, theme.to_string()) {
            Ok(_) => trace!("Stored theme {theme} in {:?}", path),
            Err(e) => error!("Could not store theme in {:?}: {e}", path),
        }
    }

    /// Stored choice first, then the terminal hint, then dark.
    pub fn preferred(&self, terminal_hint: Option<&str>) -> Theme {
        self.load()
            .or_else(|| terminal_hint.and_then(Theme::from_colorfgbg))
            .unwrap_or_default()
    }
}

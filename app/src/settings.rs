use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use pixmines_core::{CellCount, Coord, GameConfig, GameError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown difficulty '{0}', expected beginner, intermediate, expert or WxH/BOMBS")]
pub struct ParseDifficultyError(String);

/// Board preset, or a custom `WxH/BOMBS` board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Expert,
    Custom {
        width: Coord,
        height: Coord,
        bombs: CellCount,
    },
}

impl Difficulty {
    pub fn config(self) -> Result<GameConfig, GameError> {
        match self {
            Self::Beginner => Ok(GameConfig::beginner()),
            Self::Intermediate => Ok(GameConfig::intermediate()),
            Self::Expert => Ok(GameConfig::expert()),
            Self::Custom {
                width,
                height,
                bombs,
            } => GameConfig::try_new((width, height), bombs),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let err = || ParseDifficultyError(text.to_owned());
        match text.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "expert" => Ok(Self::Expert),
            custom => {
                let (size, bombs) = custom.split_once('/').ok_or_else(err)?;
                let (width, height) = size.split_once('x').ok_or_else(err)?;
                Ok(Self::Custom {
                    width: width.trim().parse().map_err(|_| err())?,
                    height: height.trim().parse().map_err(|_| err())?,
                    bombs: bombs.trim().parse().map_err(|_| err())?,
                })
            }
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => f.write_str("beginner"),
            Self::Intermediate => f.write_str("intermediate"),
            Self::Expert => f.write_str("expert"),
            Self::Custom {
                width,
                height,
                bombs,
            } => write!(f, "{}x{}/{}", width, height, bombs),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = ParseDifficultyError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Integer zoom applied to every sprite.
    pub scale: u32,
    /// Ticks the left button has to stay down on a cell before it counts as a long press.
    pub hold_ticks: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            scale: 2,
            hold_ticks: 5,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read settings from {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}

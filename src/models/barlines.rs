//! Barlines and repeats
//!
//! A measure has independent left and right barlines; a `Barline` element
//! inside a measure becomes a mid-measure barline.

use serde::{Deserialize, Serialize};

/// Bar style as drawn
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BarStyle {
    #[default]
    Regular,
    Dotted,
    Dashed,
    Heavy,
    LightLight,
    LightHeavy,
    HeavyLight,
    HeavyHeavy,
    Tick,
    Short,
    None,
}

impl BarStyle {
    pub fn xml_name(&self) -> &'static str {
        match self {
            BarStyle::Regular => "regular",
            BarStyle::Dotted => "dotted",
            BarStyle::Dashed => "dashed",
            BarStyle::Heavy => "heavy",
            BarStyle::LightLight => "light-light",
            BarStyle::LightHeavy => "light-heavy",
            BarStyle::HeavyLight => "heavy-light",
            BarStyle::HeavyHeavy => "heavy-heavy",
            BarStyle::Tick => "tick",
            BarStyle::Short => "short",
            BarStyle::None => "none",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatDirection {
    Forward,
    Backward,
}

impl RepeatDirection {
    pub fn xml_name(&self) -> &'static str {
        match self {
            RepeatDirection::Forward => "forward",
            RepeatDirection::Backward => "backward",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repeat {
    pub direction: RepeatDirection,
    #[serde(default)]
    pub times: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Barline {
    #[serde(default)]
    pub style: BarStyle,
    #[serde(default)]
    pub repeat: Option<Repeat>,
    #[serde(default)]
    pub fermata: bool,
}

impl Barline {
    pub fn styled(style: BarStyle) -> Self {
        Self { style, repeat: None, fermata: false }
    }

    /// `|:` start of a repeated section
    pub fn repeat_forward() -> Self {
        Self {
            style: BarStyle::HeavyLight,
            repeat: Some(Repeat { direction: RepeatDirection::Forward, times: None }),
            fermata: false,
        }
    }

    /// `:|` end of a repeated section
    pub fn repeat_backward(times: Option<u32>) -> Self {
        Self {
            style: BarStyle::LightHeavy,
            repeat: Some(Repeat { direction: RepeatDirection::Backward, times }),
            fermata: false,
        }
    }
}

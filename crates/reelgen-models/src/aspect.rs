//! Output aspect ratios and their render dimensions.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target aspect ratio for generated frames and clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    /// Landscape 16:9 (standard promo / YouTube)
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    /// Portrait 9:16 (Reels / Shorts)
    #[serde(rename = "9:16")]
    Tall,
    /// Square 1:1
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Square => "1:1",
        }
    }

    /// Pixel dimensions used for frame synthesis.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Wide => (1920, 1080),
            AspectRatio::Tall => (1080, 1920),
            AspectRatio::Square => (1024, 1024),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error parsing an aspect ratio string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported aspect ratio: {0}")]
pub struct AspectRatioParseError(pub String);

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Wide),
            "9:16" => Ok(AspectRatio::Tall),
            "1:1" => Ok(AspectRatio::Square),
            other => Err(AspectRatioParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert_eq!(AspectRatio::Wide.dimensions(), (1920, 1080));
        assert_eq!(AspectRatio::Tall.dimensions(), (1080, 1920));
        assert_eq!(AspectRatio::Square.dimensions(), (1024, 1024));
    }

    #[test]
    fn test_parse_round_trip() {
        for ratio in [AspectRatio::Wide, AspectRatio::Tall, AspectRatio::Square] {
            assert_eq!(ratio.as_str().parse::<AspectRatio>().unwrap(), ratio);
        }
        assert!("4:3".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_serde_tags() {
        let json = serde_json::to_string(&AspectRatio::Tall).unwrap();
        assert_eq!(json, "\"9:16\"");
        let back: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(back, AspectRatio::Square);
    }
}

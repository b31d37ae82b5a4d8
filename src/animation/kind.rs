use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Fixed animation vocabulary.
///
/// Canonical identifiers are kebab-case (`pan-left-to-right`, `zoom-in`, ...). The short names used
/// by the browser front-end (`lr`, `rl`, `tb`, `bt`, `panH`, `panV`, `zoomIn`, `zoomOut`, `none`)
/// are accepted as aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationKind {
    /// Horizontal pan, left edge to right edge.
    #[serde(alias = "lr", alias = "panH")]
    PanLeftToRight,
    /// Horizontal pan, right edge to left edge.
    #[serde(alias = "rl")]
    PanRightToLeft,
    /// Vertical pan, top edge to bottom edge.
    #[serde(alias = "tb", alias = "panV")]
    PanTopToBottom,
    /// Vertical pan, bottom edge to top edge.
    #[serde(alias = "bt")]
    PanBottomToTop,
    /// Centered zoom from the base scale up to the zoom factor.
    #[serde(alias = "zoomIn")]
    ZoomIn,
    /// Centered zoom from the zoom factor back down to the base scale.
    #[serde(alias = "zoomOut")]
    ZoomOut,
    /// No motion.
    #[serde(alias = "none")]
    Static,
}

impl AnimationKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::PanLeftToRight,
        Self::PanRightToLeft,
        Self::PanTopToBottom,
        Self::PanBottomToTop,
        Self::ZoomIn,
        Self::ZoomOut,
        Self::Static,
    ];

    /// Canonical identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PanLeftToRight => "pan-left-to-right",
            Self::PanRightToLeft => "pan-right-to-left",
            Self::PanTopToBottom => "pan-top-to-bottom",
            Self::PanBottomToTop => "pan-bottom-to-top",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::Static => "static",
        }
    }

    /// Parse a canonical identifier or a front-end alias.
    pub fn parse(s: &str) -> KenBurnsResult<Self> {
        let kind = match s.trim() {
            "pan-left-to-right" | "lr" | "panH" => Self::PanLeftToRight,
            "pan-right-to-left" | "rl" => Self::PanRightToLeft,
            "pan-top-to-bottom" | "tb" | "panV" => Self::PanTopToBottom,
            "pan-bottom-to-top" | "bt" => Self::PanBottomToTop,
            "zoom-in" | "zoomIn" => Self::ZoomIn,
            "zoom-out" | "zoomOut" => Self::ZoomOut,
            "static" | "none" => Self::Static,
            other => {
                return Err(KenBurnsError::invalid_animation_kind(format!(
                    "unknown animation '{other}' (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                )));
            }
        };
        Ok(kind)
    }
}

impl FromStr for AnimationKind {
    type Err = KenBurnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/kind.rs"]
mod tests;

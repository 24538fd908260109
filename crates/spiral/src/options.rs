use crate::error::MenuError;
use crate::geometry::RING_MARGIN;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Construction settings of a [`crate::Menu`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuOptions {
    /// Diameter of the circular area in pixels.
    pub size: f64,
    /// Grow the root disc and its image in when drawn.
    pub animate: bool,
    /// Length of every transition, in milliseconds.
    pub animation_length: u64,
    /// Most slices shown at once; the page size.
    pub max_slices: usize,
    pub auto_scroll: bool,
    /// Autoscroll interval, in milliseconds.
    pub auto_scroll_length: u64,
    /// Initial offset into the root's children.
    pub page_start: usize,
    /// Keep text icons over background images.
    pub always_show_text_icon: bool,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self {
            size: 400.0,
            animate: true,
            animation_length: 500,
            max_slices: 12,
            auto_scroll: false,
            auto_scroll_length: 2500,
            page_start: 0,
            always_show_text_icon: false,
        }
    }
}

impl MenuOptions {
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_length)
    }

    pub fn auto_scroll_interval(&self) -> Duration {
        Duration::from_millis(self.auto_scroll_length)
    }

    pub fn validate(&self) -> Result<(), MenuError> {
        if self.max_slices == 0 {
            return Err(MenuError::InvalidOption {
                name: "max_slices",
                reason: "at least one slice must be shown".into(),
            });
        }
        if !self.size.is_finite() || self.size <= RING_MARGIN {
            return Err(MenuError::InvalidOption {
                name: "size",
                reason: format!("{} leaves no room for the ring", self.size),
            });
        }
        if self.auto_scroll_length == 0 {
            return Err(MenuError::InvalidOption {
                name: "auto_scroll_length",
                reason: "the interval must be positive".into(),
            });
        }
        Ok(())
    }
}

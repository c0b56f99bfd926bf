//! Panel mode selection and the per-frame view handed to the render layer.

use crate::types::{Identity, Profile};
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Two-state info panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Idle screen, nobody recently seen.
    Active,
    /// Showing a person's card.
    Info,
}

/// INFO while anyone is visible or a held cursor remains, ACTIVE otherwise.
pub fn mode_for(visible: &[Identity], cursor: Option<&Identity>) -> DisplayMode {
    if !visible.is_empty() || cursor.is_some() {
        DisplayMode::Info
    } else {
        DisplayMode::Active
    }
}

/// Everything the render layer needs to draw one person's card.
#[derive(Debug, Clone)]
pub struct DisplayCard {
    pub identity: Identity,
    pub profile: Profile,
    pub portrait: Option<Arc<DynamicImage>>,
}

/// Output of one processed frame.
#[derive(Debug, Clone)]
pub struct PanelView {
    pub at: Duration,
    pub mode: DisplayMode,
    pub card: Option<DisplayCard>,
}

impl PanelView {
    pub fn identity(&self) -> Option<&Identity> {
        self.card.as_ref().map(|c| &c.identity)
    }
}

//! The host player seam
//!
//! The plugin never touches playback or the page itself. Everything it needs
//! from the host goes through [`Player`], and everything the host reports
//! back arrives as a [`PlayerEvent`].

use crate::overlay::{OverlayNode, OverlayState};

/// The video player hosting the plugin
pub trait Player: Send + Sync {
    /// Resume playback
    fn play(&self);

    /// Add a CSS class to the player's root element
    fn add_class(&self, class: &str);

    /// Mount the overlay inside the player's root element
    fn append_overlay(&self, overlay: &OverlayNode);

    /// Show or hide the mounted overlay without removing it
    fn set_overlay_state(&self, state: OverlayState);

    /// Remove the mounted overlay
    fn remove_overlay(&self);
}

/// Events the host forwards to the plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Pause,
    Play,
    /// The overlay's close button was activated
    CloseClicked,
    /// The overlay's creative was activated
    OverlayClicked,
    Dispose,
}

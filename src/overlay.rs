use crate::error::{Result, VastError};
use crate::models::Variation;
use crate::player::Player;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub const OVERLAY_CLASS: &str = "nonlinear-ad";
pub const CLOSE_BUTTON_CLASS: &str = "nonlinear-ad-btn";
pub const CLOSE_BUTTON_LABEL: &str = "Close (x)";

/// Visibility of the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    Hidden,
    Visible,
}

/// The overlay to mount on the player: a sized image link and a close button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayNode {
    pub class_name: String,
    pub width: u32,
    pub height: u32,
    pub image_src: String,
    pub click_through: Option<String>,
    pub target: String,
    pub close_class_name: String,
    pub close_label: String,
}

impl OverlayNode {
    /// Build the node for a variation, or `None` if it cannot be drawn
    pub fn for_variation(variation: &Variation) -> Option<Self> {
        if !variation.is_image() {
            return None;
        }
        let image_src = variation.static_resource.clone()?;

        Some(Self {
            class_name: OVERLAY_CLASS.to_string(),
            width: variation.width,
            height: variation.height,
            image_src,
            click_through: variation.nonlinear_click_through_url_template.clone(),
            target: "_blank".to_string(),
            close_class_name: CLOSE_BUTTON_CLASS.to_string(),
            close_label: CLOSE_BUTTON_LABEL.to_string(),
        })
    }

    /// Markup for hosts that mount HTML
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str(&format!("<div class=\"{}\">", escape(&self.class_name)));
        html.push_str("<div>");

        html.push_str("<a");
        if let Some(href) = &self.click_through {
            html.push_str(&format!(" href=\"{}\"", escape(href)));
        }
        html.push_str(&format!(
            " target=\"{}\" style=\"width: {}px; height: {}px;\">",
            escape(&self.target),
            self.width,
            self.height
        ));
        html.push_str(&format!(
            "<img width=\"{}\" height=\"{}\" src=\"{}\">",
            self.width,
            self.height,
            escape(&self.image_src)
        ));
        html.push_str("</a>");

        html.push_str(&format!(
            "<div class=\"{}\">{}</div>",
            escape(&self.close_class_name),
            escape(&self.close_label)
        ));

        html.push_str("</div></div>");
        html
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Owns the single overlay mounted on a player
#[derive(Debug)]
pub struct OverlayController {
    node: Option<OverlayNode>,
    state: OverlayState,
}

impl OverlayController {
    pub fn new() -> Self {
        Self {
            node: None,
            state: OverlayState::Hidden,
        }
    }

    pub fn node(&self) -> Option<&OverlayNode> {
        self.node.as_ref()
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Mount the overlay for a variation.
    ///
    /// Returns `Ok(false)` without mounting anything when the variation is not
    /// an image with a static resource.
    pub fn render(&mut self, variation: &Variation, player: &dyn Player) -> Result<bool> {
        if self.node.is_some() {
            return Err(VastError::OverlayAlreadyMounted);
        }

        let Some(node) = OverlayNode::for_variation(variation) else {
            debug!("Variation type {:?} is not renderable", variation.r#type);
            return Ok(false);
        };

        info!(
            "Rendering overlay {}x{} from {}",
            node.width, node.height, node.image_src
        );
        player.append_overlay(&node);
        self.node = Some(node);
        self.state = OverlayState::Visible;
        Ok(true)
    }

    pub fn show(&mut self, player: &dyn Player) {
        if self.node.is_none() {
            debug!("No overlay to show");
            return;
        }
        self.state = OverlayState::Visible;
        player.set_overlay_state(OverlayState::Visible);
    }

    /// Hide the overlay and resume playback
    pub fn hide(&mut self, player: &dyn Player) {
        if self.node.is_some() {
            self.state = OverlayState::Hidden;
            player.set_overlay_state(OverlayState::Hidden);
        } else {
            debug!("No overlay to hide");
        }
        player.play();
    }

    pub fn teardown(&mut self, player: &dyn Player) {
        if self.node.take().is_some() {
            player.remove_overlay();
        }
        self.state = OverlayState::Hidden;
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new()
    }
}

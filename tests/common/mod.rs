#![allow(dead_code)]

use async_trait::async_trait;
use nonlin_vast::{
    Ad, AdResolver, AdResponse, Beacon, Creative, CreativeType, ErrorCode, ErrorReporter,
    OverlayNode, OverlayState, Player, Variation,
};
use std::sync::Mutex;
use url::Url;

/// Player recording every call the plugin makes
#[derive(Default)]
pub struct RecordingPlayer {
    pub calls: Mutex<Vec<String>>,
    pub mounted: Mutex<Vec<OverlayNode>>,
}

impl RecordingPlayer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mounted(&self) -> Vec<OverlayNode> {
        self.mounted.lock().unwrap().clone()
    }
}

impl Player for RecordingPlayer {
    fn play(&self) {
        self.calls.lock().unwrap().push("play".to_string());
    }

    fn add_class(&self, class: &str) {
        self.calls.lock().unwrap().push(format!("add_class {}", class));
    }

    fn append_overlay(&self, overlay: &OverlayNode) {
        self.calls.lock().unwrap().push("append_overlay".to_string());
        self.mounted.lock().unwrap().push(overlay.clone());
    }

    fn set_overlay_state(&self, state: OverlayState) {
        self.calls.lock().unwrap().push(format!("overlay {:?}", state));
    }

    fn remove_overlay(&self) {
        self.calls.lock().unwrap().push("remove_overlay".to_string());
    }
}

/// Error reporter and beacon that keep what they were given
#[derive(Default)]
pub struct Recorder {
    pub reports: Mutex<Vec<(Vec<String>, ErrorCode)>>,
    pub fired: Mutex<Vec<Url>>,
}

impl ErrorReporter for Recorder {
    fn report(&self, templates: &[String], code: ErrorCode) {
        self.reports.lock().unwrap().push((templates.to_vec(), code));
    }
}

impl Beacon for Recorder {
    fn fire(&self, url: Url) {
        self.fired.lock().unwrap().push(url);
    }
}

/// Resolver answering with a fixed response and remembering the URL it was asked for
pub struct StaticResolver {
    pub response: Option<AdResponse>,
    pub requested: Mutex<Vec<String>>,
}

impl StaticResolver {
    pub fn new(response: Option<AdResponse>) -> Self {
        Self {
            response,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AdResolver for StaticResolver {
    async fn resolve(&self, url: &str) -> Option<AdResponse> {
        self.requested.lock().unwrap().push(url.to_string());
        self.response.clone()
    }
}

/// Resolver that never answers
pub struct HangingResolver;

#[async_trait]
impl AdResolver for HangingResolver {
    async fn resolve(&self, _url: &str) -> Option<AdResponse> {
        std::future::pending().await
    }
}

pub fn variation(kind: &str) -> Variation {
    Variation {
        id: None,
        r#type: Some(kind.to_string()),
        width: 300,
        height: 250,
        static_resource: Some("http://x/img.png".to_string()),
        nonlinear_click_through_url_template: Some("http://x/click".to_string()),
        nonlinear_click_tracking_url_templates: Vec::new(),
    }
}

pub fn single_ad(kind: &str) -> AdResponse {
    AdResponse {
        ads: vec![Ad {
            id: Some("overlay-1".to_string()),
            creatives: vec![Creative {
                id: None,
                r#type: CreativeType::Nonlinear,
                variations: vec![variation(kind)],
            }],
            ..Ad::default()
        }],
    }
}

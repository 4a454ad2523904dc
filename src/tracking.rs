//! Tracking pixels and ad-server error reporting
//!
//! URL templates coming from the ad server carry macros such as
//! `[ERRORCODE]` or `[CACHEBUSTING]`. They are expanded here, validated and
//! handed to a [`Beacon`], which fires them without waiting for an answer.

use crate::error::Result;
use crate::resolver::http_client;
use log::{debug, warn};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use url::Url;

/// VAST error code sent back to the ad server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    /// Couldn't find a media file supported by this player
    pub const MEDIA_FILE_NOT_SUPPORTED: ErrorCode = ErrorCode(403);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fire-and-forget delivery of a tracking URL
pub trait Beacon: Send + Sync {
    fn fire(&self, url: Url);
}

/// Notifies the ad server that one of its ads was rejected
pub trait ErrorReporter: Send + Sync {
    fn report(&self, templates: &[String], code: ErrorCode);
}

/// Beacon that issues a GET for each URL on the current tokio runtime.
///
/// Requests run in the background; [`HttpBeacon::flush`] waits for the ones
/// fired so far, which a short-lived process must do before its runtime stops.
pub struct HttpBeacon {
    client: reqwest::Client,
    in_flight: Mutex<JoinSet<()>>,
}

impl HttpBeacon {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(http_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    /// Number of requests not yet collected by `flush`
    pub fn pending(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every request fired so far
    pub async fn flush(&self) {
        let mut requests =
            std::mem::take(&mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner));

        while let Some(result) = requests.join_next().await {
            if let Err(e) = result {
                warn!("Tracking request task failed: {}", e);
            }
        }
    }
}

impl Beacon for HttpBeacon {
    fn fire(&self, url: Url) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, dropping tracking request to {}", url);
            return;
        };

        let client = self.client.clone();
        let request = async move {
            match client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Tracking request to {} returned {}", url, response.status());
                }
                Ok(response) => {
                    warn!("Tracking request to {} returned {}", url, response.status());
                }
                Err(e) => {
                    warn!("Tracking request to {} failed: {}", url, e);
                }
            }
        };

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn_on(request, &runtime);
    }
}

/// Error reporter that expands the templates and fires them as pixels
pub struct PixelErrorReporter {
    beacon: Arc<dyn Beacon>,
}

impl PixelErrorReporter {
    pub fn new(beacon: Arc<dyn Beacon>) -> Self {
        Self { beacon }
    }
}

impl ErrorReporter for PixelErrorReporter {
    fn report(&self, templates: &[String], code: ErrorCode) {
        let mut macros = HashMap::new();
        macros.insert("ERRORCODE", code.to_string());
        track(self.beacon.as_ref(), templates, &macros);
    }
}

/// Expand and fire every template through the beacon.
///
/// `[CACHEBUSTING]` is filled with a fresh random value unless the caller
/// supplies one. Templates that do not form a valid URL after expansion are
/// skipped.
pub fn track(beacon: &dyn Beacon, templates: &[String], macros: &HashMap<&str, String>) {
    for template in templates {
        let mut values = macros.clone();
        values.entry("CACHEBUSTING").or_insert_with(cache_buster);

        let expanded = expand_template(template, &values);
        match Url::parse(&expanded) {
            Ok(url) => beacon.fire(url),
            Err(e) => warn!("Skipping invalid tracking URL {:?}: {}", expanded, e),
        }
    }
}

/// Replace `[NAME]` and `%5BNAME%5D` macros with their values
pub fn expand_template(template: &str, macros: &HashMap<&str, String>) -> String {
    let mut url = template.to_string();
    for (name, value) in macros {
        url = url
            .replace(&format!("[{}]", name), value)
            .replace(&format!("%5B{}%5D", name), value);
    }
    url
}

fn cache_buster() -> String {
    format!("{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

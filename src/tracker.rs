use crate::models::{Ad, Creative, Variation};
use crate::tracking::{self, Beacon};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

type ClickThroughObserver = Box<dyn Fn(&str) + Send + Sync>;

/// Tracking handle bound to the selected ad, creative and variation
pub struct AdTracker {
    ad: Ad,
    creative: Creative,
    variation: Variation,
    beacon: Arc<dyn Beacon>,
    clickthrough_observers: Vec<ClickThroughObserver>,
    impressed: bool,
}

impl AdTracker {
    pub fn new(ad: Ad, creative: Creative, variation: Variation, beacon: Arc<dyn Beacon>) -> Self {
        Self {
            ad,
            creative,
            variation,
            beacon,
            clickthrough_observers: Vec::new(),
            impressed: false,
        }
    }

    pub fn ad(&self) -> &Ad {
        &self.ad
    }

    pub fn creative(&self) -> &Creative {
        &self.creative
    }

    pub fn variation(&self) -> &Variation {
        &self.variation
    }

    /// Register an observer called with the click-through URL on every click
    pub fn on_clickthrough<F>(&mut self, observer: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.clickthrough_observers.push(Box::new(observer));
    }

    /// Record a viewer click on the creative.
    ///
    /// Fires the click tracking templates and notifies observers. Returns the
    /// click-through URL, if the variation has one.
    pub fn click(&self) -> Option<String> {
        tracking::track(
            self.beacon.as_ref(),
            &self.variation.nonlinear_click_tracking_url_templates,
            &HashMap::new(),
        );

        let url = self.variation.nonlinear_click_through_url_template.clone()?;
        info!("Click-through to {}", url);
        for observer in &self.clickthrough_observers {
            observer(&url);
        }
        Some(url)
    }

    /// Fire the impression templates. Only the first call has an effect.
    pub fn track_impression(&mut self) {
        if self.impressed {
            debug!("Impression already tracked for ad {:?}", self.ad.id);
            return;
        }
        self.impressed = true;
        tracking::track(
            self.beacon.as_ref(),
            &self.ad.impression_url_templates,
            &HashMap::new(),
        );
    }
}

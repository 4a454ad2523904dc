use crate::models::{Ad, Creative, Variation};
use crate::selector::SelectedCreative;
use crate::tracker::AdTracker;
use crate::tracking::Beacon;
use std::sync::Arc;

/// The single ad bound for display on a player
pub struct AdSession {
    tracker: AdTracker,
}

impl AdSession {
    pub fn new(selected: SelectedCreative, beacon: Arc<dyn Beacon>) -> Self {
        let SelectedCreative { ad, creative, variation } = selected;
        Self {
            tracker: AdTracker::new(ad, creative, variation, beacon),
        }
    }

    pub fn ad(&self) -> &Ad {
        self.tracker.ad()
    }

    pub fn creative(&self) -> &Creative {
        self.tracker.creative()
    }

    pub fn variation(&self) -> &Variation {
        self.tracker.variation()
    }

    pub fn tracker(&self) -> &AdTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut AdTracker {
        &mut self.tracker
    }
}

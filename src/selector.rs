use crate::models::{Ad, AdResponse, Creative, Variation};
use crate::tracking::{ErrorCode, ErrorReporter};
use log::{debug, info};

/// The ad, creative and variation chosen for display
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCreative {
    pub ad: Ad,
    pub creative: Creative,
    pub variation: Variation,
}

/// Outcome of scanning an ad response
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(SelectedCreative),
    NoneFound,
}

/// Pick the first non-linear creative with at least one variation.
///
/// Ads are scanned in response order and creatives in document order; the
/// first match wins and its first variation is taken. Every ad scanned
/// without a match is reported to the ad server before moving on.
pub fn select(response: &AdResponse, reporter: &dyn ErrorReporter) -> Selection {
    for (index, ad) in response.ads.iter().enumerate() {
        if let Some((creative, variation)) = first_eligible(ad) {
            info!(
                "Selected ad {} ({:?}), variation {:?} {}x{}",
                index, ad.id, variation.r#type, variation.width, variation.height
            );
            return Selection::Selected(SelectedCreative {
                ad: ad.clone(),
                creative: creative.clone(),
                variation: variation.clone(),
            });
        }

        // Inform ad server we can't find suitable media file for this ad
        debug!("Ad {} ({:?}) has no usable non-linear creative", index, ad.id);
        reporter.report(&ad.error_url_templates, ErrorCode::MEDIA_FILE_NOT_SUPPORTED);
    }

    info!("No eligible creative among {} ads", response.ads.len());
    Selection::NoneFound
}

/// The first non-linear creative of the ad that has variations, with its first variation
pub fn first_eligible(ad: &Ad) -> Option<(&Creative, &Variation)> {
    ad.creatives
        .iter()
        .filter(|creative| creative.is_nonlinear())
        .find_map(|creative| creative.variations.first().map(|v| (creative, v)))
}

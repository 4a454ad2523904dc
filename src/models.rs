use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Represents the resolved answer of an ad server for one playback session
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct AdResponse {
    /// The candidate ads, in the order the ad server returned them
    #[serde(default)]
    pub ads: Vec<Ad>,
}

/// Represents one candidate Ad within a response
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    /// The ad ID
    #[serde(default)]
    pub id: Option<String>,

    /// The ad sequence number (for ad pods)
    #[serde(default)]
    pub sequence: Option<u32>,

    /// Creative elements, in document order
    #[serde(default, deserialize_with = "lenient_vec")]
    pub creatives: Vec<Creative>,

    /// Error tracking URL templates, notified when this ad is rejected
    #[serde(rename = "errorURLTemplates", default)]
    pub error_url_templates: Vec<String>,

    /// Impression tracking URL templates
    #[serde(rename = "impressionURLTemplates", default)]
    pub impression_url_templates: Vec<String>,
}

/// The kind of a creative element
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreativeType {
    Linear,
    #[serde(alias = "nonLinear")]
    Nonlinear,
    Companion,
    #[default]
    #[serde(other)]
    Other,
}

/// Represents a creative element
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Creative {
    /// The creative ID
    #[serde(default)]
    pub id: Option<String>,

    /// Linear, nonlinear or companion
    #[serde(default, deserialize_with = "null_as_default")]
    pub r#type: CreativeType,

    /// Media renditions of this creative, in document order
    #[serde(default, deserialize_with = "lenient_vec")]
    pub variations: Vec<Variation>,
}

/// Represents a single rendition of a non-linear creative
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    /// The variation ID
    #[serde(default)]
    pub id: Option<String>,

    /// The MIME type of the resource (e.g. "image/png"); absent for HTML and iframe resources
    #[serde(default)]
    pub r#type: Option<String>,

    /// Width in pixels
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: u32,

    /// Height in pixels
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: u32,

    /// The static resource URL
    #[serde(default)]
    pub static_resource: Option<String>,

    /// The click-through URL
    #[serde(rename = "nonlinearClickThroughURLTemplate", default)]
    pub nonlinear_click_through_url_template: Option<String>,

    /// Click tracking URL templates
    #[serde(rename = "nonlinearClickTrackingURLTemplates", default)]
    pub nonlinear_click_tracking_url_templates: Vec<String>,
}

impl Creative {
    pub fn is_nonlinear(&self) -> bool {
        self.r#type == CreativeType::Nonlinear
    }
}

impl Variation {
    /// Whether the resource is an image, the only media the overlay can draw
    pub fn is_image(&self) -> bool {
        self.r#type.as_deref().is_some_and(|kind| kind.starts_with("image"))
    }
}

/// Decode a list, dropping entries that do not fit `T`.
///
/// Linear and companion renditions share the `variations` key with very
/// different shapes; one of them must not void the whole response.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping undecodable entry: {}", e);
                None
            }
        })
        .collect())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub mod config;
pub mod error;
pub mod models;
pub mod overlay;
pub mod player;
pub mod plugin;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod tracker;
pub mod tracking;

pub use config::PluginOptions;
pub use error::{AdFailure, Result, VastError};
pub use models::{Ad, AdResponse, Creative, CreativeType, Variation};
pub use overlay::{OverlayController, OverlayNode, OverlayState};
pub use player::{Player, PlayerEvent};
pub use plugin::{AdEvent, AdState, NonlinVast, PluginHandle};
pub use resolver::{AdResolver, HttpAdResolver};
pub use selector::{select, Selection, SelectedCreative};
pub use session::AdSession;
pub use tracker::AdTracker;
pub use tracking::{Beacon, ErrorCode, ErrorReporter, HttpBeacon, PixelErrorReporter};

/// Name the plugin registers under on the host player
pub const PLUGIN_NAME: &str = "nonlinVast";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod async_api {
    use crate::error::Result;
    use crate::resolver::HttpAdResolver;
    use crate::selector::{self, Selection};
    use crate::tracking::ErrorReporter;

    /// Fetch an ad response and run creative selection on it
    pub async fn resolve_and_select(
        resolver: &HttpAdResolver,
        url: &str,
        reporter: &dyn ErrorReporter,
    ) -> Result<Selection> {
        let response = resolver.fetch(url).await?;
        Ok(selector::select(&response, reporter))
    }
}

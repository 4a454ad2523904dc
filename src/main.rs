use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

// Import the library
use nonlin_vast::async_api;
use nonlin_vast::resolver::http_client;
use nonlin_vast::{
    HttpAdResolver, HttpBeacon, NonlinVast, OverlayNode, OverlayState, PixelErrorReporter, Player,
    PlayerEvent, PluginOptions,
};

/// Non-linear VAST ad selection and lifecycle
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an ad response and print the selected creative
    Select {
        /// Path to the ad response file or URL
        #[arg(short, long)]
        input: String,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Run the plugin against a console player
    Simulate {
        /// Path to the ad response file or URL
        #[arg(short, long, conflicts_with = "options")]
        input: Option<String>,

        /// JSON plugin options file (must contain "url")
        #[arg(short, long)]
        options: Option<PathBuf>,

        /// Pause playback once the ad settles
        #[arg(long)]
        pause: bool,

        /// Click the creative
        #[arg(long)]
        click: bool,

        /// Click the close button
        #[arg(long)]
        close: bool,
    },
}

/// Player that logs every call
struct ConsolePlayer;

impl Player for ConsolePlayer {
    fn play(&self) {
        info!("player: play");
    }

    fn add_class(&self, class: &str) {
        info!("player: add class {}", class);
    }

    fn append_overlay(&self, overlay: &OverlayNode) {
        println!("{}", overlay.to_html());
    }

    fn set_overlay_state(&self, state: OverlayState) {
        info!("player: overlay {:?}", state);
    }

    fn remove_overlay(&self) {
        info!("player: overlay removed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    // One client for the ad request and every tracking pixel
    let client = http_client()?;
    let beacon = Arc::new(HttpBeacon::with_client(client.clone()));
    let resolver = HttpAdResolver::with_client(client);

    match cli.command {
        Commands::Select { input, pretty } => {
            let reporter = PixelErrorReporter::new(beacon.clone());

            let selection = async_api::resolve_and_select(&resolver, &input, &reporter).await?;

            if pretty {
                println!("{:#?}", selection);
            } else {
                println!("{:?}", selection);
            }
        }
        Commands::Simulate { input, options, pause, click, close } => {
            let options = match (input, options) {
                (_, Some(path)) => PluginOptions::from_file(path)?,
                (Some(input), None) => PluginOptions::new(input),
                (None, None) => return Err("either --input or --options is required".into()),
            };

            let (plugin, mut events) =
                NonlinVast::with_http_tracking(Arc::new(ConsolePlayer), options, beacon.clone());
            let mut state = plugin.subscribe_state();
            let handle = plugin.spawn(Arc::new(resolver))?;

            // Wait for the request to settle before interacting
            state.wait_for(|s| s.has_session() || *s == nonlin_vast::AdState::Cancelled).await?;

            if click {
                handle.send(PlayerEvent::OverlayClicked);
            }
            if close {
                handle.send(PlayerEvent::CloseClicked);
            }
            if pause {
                handle.send(PlayerEvent::Pause);
            }
            handle.shutdown().await;

            while let Ok(event) = events.try_recv() {
                println!("{}: {:?}", event.name(), event);
            }
        }
    }

    // Error, impression and click pixels still in flight
    info!("Waiting for {} tracking requests", beacon.pending());
    beacon.flush().await;

    Ok(())
}

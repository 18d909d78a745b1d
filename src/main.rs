//! Parabridge CLI - shares a parametric model with remote clients.
//!
//! This is the main binary entry point. See the `parabridge` library for
//! the synchronization engine itself.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parabridge::constants::HOST_IDLE_TICK;
use parabridge::control;
use parabridge::mesh::{LocalisedMesh, Mesh, MeshFace};
use parabridge::model::{
    BooleanToggle, ColourPicker, DialKnob, NumberSlider, ParamSource, ValueList, ValueListItem,
};
use parabridge::params::{self, ListMode, SharedParameter};
use parabridge::transport::memory::{LoopbackBroker, LoopbackTransport};
use parabridge::transport::{ConnectOptions, Transport};
use parabridge::{Bridge, Config, Document, TopicSet};

/// Global allocator; mimalloc performs better than the system allocator
/// under the multi-threaded publish/receive load.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Global flag for signal-triggered shutdown (as Arc for signal-hook
/// compatibility).
static SHUTDOWN_FLAG: std::sync::LazyLock<Arc<AtomicBool>> =
    std::sync::LazyLock::new(|| Arc::new(AtomicBool::new(false)));

#[derive(Parser)]
#[command(name = "parabridge", version, about = "Parametric model / pub-sub bridge")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a self-contained demo session over the in-process broker.
    ///
    /// A sample document is shared and a scripted viewer client echoes a
    /// toggle edit back, exercising the full round trip.
    Demo {
        /// How long to keep the session alive, in seconds.
        #[arg(long, default_value_t = 5)]
        duration: u64,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Demo { duration: 5 }) {
        Command::Demo { duration } => run_demo(duration),
        Command::Config => show_config(),
    }
}

/// Print the effective configuration (file plus environment overrides).
fn show_config() -> Result<()> {
    let config = Config::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Run the demo session: bridge plus scripted viewer on a loopback broker.
fn run_demo(duration: u64) -> Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::flag;
    flag::register(SIGINT, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGTERM, Arc::clone(&SHUTDOWN_FLAG))?;

    let config = Config::load()?;
    println!(
        "Starting parabridge demo (base topic: {}, {}s)...",
        config.base_topic, duration
    );

    let broker = LoopbackBroker::new();
    let (mut bridge, requests) = Bridge::new(config, Arc::new(broker.client()))?;
    let mut document = demo_document();

    // The viewer plays the remote client: it watches the share topics and
    // echoes one toggle edit back on the control topic.
    let viewer = broker.client();
    let viewer_topics = bridge.topics().clone();
    bridge.runtime_handle().spawn(async move {
        if let Err(e) = run_demo_viewer(viewer, viewer_topics).await {
            log::warn!("[Viewer] Stopped: {e}");
        }
    });

    let deadline = Instant::now() + Duration::from_secs(duration);
    while Instant::now() < deadline && !SHUTDOWN_FLAG.load(Ordering::Relaxed) {
        let _ = requests.wait(HOST_IDLE_TICK);
        let outcome = bridge.solve(&mut document);
        if outcome.commands_applied > 0 {
            println!("Applied {} remote edit(s).", outcome.commands_applied);
        }
        for warning in &outcome.warnings {
            log::warn!("[Demo] {warning}");
        }
    }

    println!("Demo finished.");
    Ok(())
}

/// A small document exercising every parameter kind (including the
/// unsupported colour picker) and one localized quad mesh.
fn demo_document() -> Document {
    let mut document = Document::new();
    document.sources = vec![
        ParamSource::Slider(NumberSlider::new("Radius", "R", 2.5, 0.0, 10.0)),
        ParamSource::Toggle(BooleanToggle::new("Show roof", "roof", true)),
        ParamSource::List(ValueList::new(
            "Material",
            "mat",
            ListMode::DropDown,
            vec![
                ValueListItem::new("Wood", "0"),
                ValueListItem::new("Steel", "1"),
                ValueListItem::new("Glass", "2"),
            ],
        )),
        ParamSource::Knob(DialKnob::new("Rotation", "rot", 0.0, 0.0, 360.0)),
        ParamSource::Colour(ColourPicker::new("Tint", "tint", [255, 128, 0])),
    ];

    let slab = Mesh {
        vertices: vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [10.0, 0.0, 10.0],
            [0.0, 0.0, 10.0],
        ],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        faces: vec![MeshFace::quad(0, 1, 2, 3)],
    };
    if let Some(localised) = LocalisedMesh::new(slab, 47.2692, 8.5342, 45.0) {
        document.meshes.push(localised);
    }
    document
}

/// The scripted remote client used by the demo.
async fn run_demo_viewer(viewer: LoopbackTransport, topics: TopicSet) -> Result<()> {
    viewer
        .connect(ConnectOptions {
            address: "loopback".to_string(),
            client_id: "demo-viewer".to_string(),
            last_will_topic: format!("{}/status/demo-viewer", topics.base),
            last_will_payload: "offline".to_string(),
            last_will_retain: true,
        })
        .await?;
    viewer
        .subscribe(&[
            topics.status.clone(),
            topics.meshes.clone(),
            topics.parameter_share.clone(),
            topics.position_share.clone(),
        ])
        .await?;
    let mut incoming = viewer
        .take_incoming()
        .ok_or_else(|| anyhow::anyhow!("viewer incoming handle already taken"))?;

    let mut echoed = false;
    while let Some(message) = incoming.recv().await {
        println!("[Viewer] Rcv[{}]: {} bytes", message.topic, message.payload.len());

        if message.topic == topics.parameter_share && !echoed {
            // Echo the first toggle back with its value flipped, as a
            // remote edit.
            let batch = control::decode_parameter_batch(&message.payload)
                .map_err(|e| anyhow::anyhow!("viewer could not parse parameters: {e}"))?;
            if let Some(SharedParameter::Toggle { guid, name, nick_name, value }) = batch
                .parameters
                .into_iter()
                .find(|p| matches!(p, SharedParameter::Toggle { .. }))
            {
                let edit = SharedParameter::Toggle {
                    guid,
                    name,
                    nick_name,
                    value: !value,
                };
                let payload = params::encode_batch(&[edit])?;
                println!("[Viewer] Flipping toggle, sending control message.");
                viewer
                    .publish(&topics.parameter_control, &payload, false)
                    .await?;
                echoed = true;
            }
        }
    }

    Ok(())
}

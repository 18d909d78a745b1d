//! Parabridge - parametric model synchronization daemon.
//!
//! This crate bridges a live, editable parametric model to remote
//! viewer/control clients over a publish/subscribe bus, keeping both sides
//! eventually consistent: geometry and control values flow outward as they
//! change; user-originated edits from remote clients flow back in and are
//! applied to the authoritative model.
//!
//! # Architecture
//!
//! The crate follows a centralized engine pattern:
//!
//! - **Bridge** - the synchronization engine; owns the session and runs one
//!   evaluation pass per host request
//! - **Document** - the authoritative model (parameter sources, meshes,
//!   position block); mutated only on the host context
//! - **Transport** - black-box pub/sub client behind a trait
//! - **Router** - receive-context adapter staging inbound control messages
//!
//! # Modules
//!
//! - [`bridge`] - synchronization cycle, host trigger, inbound router
//! - [`control`] - inbound command parsing and application
//! - [`registry`] - per-cycle live parameter handles
//! - [`params`] / [`mesh`] - wire codecs
//! - [`snapshot`] / [`debounce`] / [`inbound`] - change detection, publish
//!   coalescing, inbound staging
//! - [`transport`] - transport trait and the in-process loopback broker
//! - [`config`] - configuration loading/saving

// Library modules
pub mod bridge;
pub mod config;
pub mod constants;
pub mod control;
pub mod debounce;
pub mod inbound;
pub mod mesh;
pub mod model;
pub mod params;
pub mod registry;
pub mod snapshot;
pub mod topics;
pub mod transport;

// Re-export commonly used types
pub use bridge::{Bridge, CycleOutcome, SolveRequests, SolveTrigger};
pub use config::Config;
pub use mesh::{GeometryPosition, LocalisedMesh, Mesh, MeshFace};
pub use model::Document;
pub use params::SharedParameter;
pub use topics::TopicSet;
pub use transport::Transport;

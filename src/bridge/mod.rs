//! Bridge - the bidirectional synchronization engine.
//!
//! The Bridge owns everything one session needs: the transport session, the
//! snapshot cache, the per-channel debouncers, the inbound staging queues,
//! and the async runtime their tasks run on. The host drives it by calling
//! [`Bridge::solve`] once per evaluation pass on its own single-threaded
//! context.
//!
//! # Architecture
//!
//! ```text
//!             host context                      other contexts
//!  ┌────────────────────────────┐   ┌─────────────────────────────────┐
//!  │ Bridge::solve(&mut doc)    │   │ router task (receive context)   │
//!  │   ensure session           │◄──┤   stages payloads, fires trigger│
//!  │   rebuild registry         │   ├─────────────────────────────────┤
//!  │   drain + apply inbound ───┼──►│ debounce timers (publish tasks) │
//!  │   encode, compare, publish │   │   publish + commit snapshot     │
//!  └────────────────────────────┘   └─────────────────────────────────┘
//! ```
//!
//! # Evaluation pass
//!
//! Each pass drains the inbound queues first. If any command mutated the
//! model, the pass short-circuits: it requests a re-evaluation and returns
//! without computing outbound data — the next pass publishes the new state.
//! Otherwise it recomputes the outbound payloads, compares each against its
//! snapshot, and schedules a debounced publish for whatever changed.
//! Presence-style channels (status, geometry positions) bypass debouncing
//! and publish synchronously.

pub mod router;
pub mod trigger;

pub use trigger::{SolveRequests, SolveTrigger};

use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::constants::{EMPTY_BATCH, STATUS_OFFLINE, STATUS_ONLINE};
use crate::control::{self, ApplyReport};
use crate::debounce::Debouncer;
use crate::inbound::InboundQueue;
use crate::mesh;
use crate::model::Document;
use crate::params;
use crate::registry;
use crate::snapshot::SnapshotCache;
use crate::topics::TopicSet;
use crate::transport::{ConnectOptions, Transport, TransportError};

/// What one evaluation pass did, for logging and tests.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Inbound commands that mutated the model this pass.
    pub commands_applied: usize,
    /// True when the pass short-circuited and asked the host to re-run.
    pub reevaluate_requested: bool,
    /// Topics whose publish was handed to a debouncer this pass.
    pub scheduled_publishes: Vec<String>,
    /// Topics published synchronously this pass.
    pub immediate_publishes: Vec<String>,
    /// Everything reported along the way (skipped items, dropped messages,
    /// count mismatches, unsupported sources).
    pub warnings: Vec<String>,
}

/// The synchronization engine for one bridge session.
pub struct Bridge {
    config: Config,
    topics: TopicSet,
    transport: Arc<dyn Transport>,
    snapshots: Arc<SnapshotCache>,
    mesh_debounce: Debouncer,
    parameter_debounce: Debouncer,
    parameter_control: Arc<InboundQueue>,
    position_control: Arc<InboundQueue>,
    trigger: SolveTrigger,
    /// Async runtime for the router, debounce timers, and publish tasks.
    runtime: tokio::runtime::Runtime,
    session_online: bool,
    subscribed: bool,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("topics", &self.topics)
            .field("session_online", &self.session_online)
            .field("subscribed", &self.subscribed)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Create a bridge over `transport` and spawn its router task.
    ///
    /// Returns the bridge and the receiving side of the host trigger; the
    /// host loop waits on the latter between passes.
    ///
    /// # Errors
    ///
    /// Fails if the async runtime cannot be created or the transport's
    /// incoming handle was already taken.
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
    ) -> anyhow::Result<(Self, SolveRequests)> {
        let runtime = tokio::runtime::Runtime::new()?;
        let topics = TopicSet::new(&config.base_topic, &config.client_id);

        let snapshots = Arc::new(SnapshotCache::new());
        // An empty model matches the seeded baseline, so nothing publishes
        // until there is actual content.
        snapshots.seed(&topics.meshes, EMPTY_BATCH);
        snapshots.seed(&topics.parameter_share, EMPTY_BATCH);
        snapshots.seed(&topics.position_share, EMPTY_BATCH);

        let parameter_control = Arc::new(InboundQueue::new());
        let position_control = Arc::new(InboundQueue::new());
        let (trigger, requests) = trigger::channel();

        let incoming = transport
            .take_incoming()
            .context("transport incoming handle already taken")?;
        router::spawn(
            runtime.handle(),
            incoming,
            topics.clone(),
            router::RouterQueues {
                parameter_control: Arc::clone(&parameter_control),
                position_control: Arc::clone(&position_control),
            },
            trigger.clone(),
        );

        let mesh_debounce = Debouncer::new(config.mesh_quiet(), runtime.handle().clone());
        let parameter_debounce =
            Debouncer::new(config.parameter_quiet(), runtime.handle().clone());

        Ok((
            Self {
                config,
                topics,
                transport,
                snapshots,
                mesh_debounce,
                parameter_debounce,
                parameter_control,
                position_control,
                trigger,
                runtime,
                session_online: false,
                subscribed: false,
            },
            requests,
        ))
    }

    /// The topic set this session uses.
    #[must_use]
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// A clone of the host trigger, for contexts that want to request a
    /// pass directly.
    #[must_use]
    pub fn solve_trigger(&self) -> SolveTrigger {
        self.trigger.clone()
    }

    /// Handle onto the bridge's async runtime.
    #[must_use]
    pub fn runtime_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Run one evaluation pass against the authoritative document.
    ///
    /// Must be called from the host's single-threaded context; this is the
    /// only place live parameter handles are read or mutated.
    pub fn solve(&mut self, document: &mut Document) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();
        log::debug!("[Bridge] Evaluation pass starting.");

        self.ensure_session(&mut outcome);

        // Live handles are rebuilt every pass; upstream wiring may have
        // changed since the last one.
        let build = registry::rebuild(&document.sources);
        for warning in &build.warnings {
            log::warn!("[Bridge] {warning}");
            outcome.warnings.push(warning.clone());
        }

        for payload in self.parameter_control.drain_all() {
            let report =
                control::apply_parameter_message(&payload, &build.registry, &mut document.sources);
            self.absorb_report(report, &mut outcome);
        }
        let mesh_count = document.meshes.len();
        for payload in self.position_control.drain_all() {
            let report = control::apply_position_message(&payload, mesh_count, document);
            self.absorb_report(report, &mut outcome);
        }

        if outcome.commands_applied > 0 {
            log::info!(
                "[Bridge] {} inbound command(s) applied, requesting re-evaluation.",
                outcome.commands_applied
            );
            // The mutated model is picked up fresh on the next pass; that
            // pass publishes the new state.
            self.trigger.request();
            outcome.reevaluate_requested = true;
            return outcome;
        }

        match mesh::encode_meshes(&document.meshes) {
            Ok(payload) => {
                self.stage_debounced(&self.topics.meshes, payload, &self.mesh_debounce, &mut outcome);
            }
            Err(e) => {
                let warning = format!("could not serialize meshes, not publishing: {e}");
                log::warn!("[Bridge] {warning}");
                outcome.warnings.push(warning);
            }
        }

        match params::encode_batch(&build.snapshot) {
            Ok(payload) => {
                self.stage_debounced(
                    &self.topics.parameter_share,
                    payload,
                    &self.parameter_debounce,
                    &mut outcome,
                );
            }
            Err(e) => {
                let warning = format!("could not serialize parameters, not publishing: {e}");
                log::warn!("[Bridge] {warning}");
                outcome.warnings.push(warning);
            }
        }

        self.stage_positions(document, &mut outcome);

        outcome
    }

    /// Establish (or re-establish) the transport session.
    ///
    /// Subscriptions happen once per session; the retained online status is
    /// re-published on every reconnect, synchronously — presence signaling
    /// matters more than coalescing.
    fn ensure_session(&mut self, outcome: &mut CycleOutcome) {
        if self.session_online && self.transport.is_connected() {
            return;
        }

        let options = ConnectOptions {
            address: self.config.broker_address.clone(),
            client_id: self.config.client_id.clone(),
            last_will_topic: self.topics.status.clone(),
            last_will_payload: STATUS_OFFLINE.to_string(),
            last_will_retain: true,
        };
        let fresh = !self.subscribed;
        let transport = Arc::clone(&self.transport);
        let topics = self.topics.clone();

        log::info!(
            "[Bridge] Connecting to {} as {}",
            options.address,
            options.client_id
        );
        let result = self.runtime.block_on(async move {
            transport.connect(options).await?;
            if fresh {
                transport.subscribe(&topics.subscriptions()).await?;
            }
            transport.publish(&topics.status, STATUS_ONLINE, true).await?;
            Ok::<(), TransportError>(())
        });

        match result {
            Ok(()) => {
                self.session_online = true;
                self.subscribed = true;
                outcome.immediate_publishes.push(self.topics.status.clone());
                log::info!("[Bridge] Session online.");
            }
            Err(e) => {
                let warning = format!("transport session not established: {e}");
                log::warn!("[Bridge] {warning}");
                outcome.warnings.push(warning);
            }
        }
    }

    /// Fold one message's apply report into the cycle outcome.
    fn absorb_report(&self, report: ApplyReport, outcome: &mut CycleOutcome) {
        outcome.commands_applied += report.applied;
        for warning in report.warnings {
            log::warn!("[Bridge] {warning}");
            outcome.warnings.push(warning);
        }
        if let Some(error) = report.dropped {
            let warning = format!("control message dropped: {error}");
            log::warn!("[Bridge] {warning}");
            outcome.warnings.push(warning);
        }
    }

    /// Compare `payload` against the channel's snapshot and, on change,
    /// hand a publish-then-commit action to the channel's debouncer.
    fn stage_debounced(
        &self,
        topic: &str,
        payload: String,
        debouncer: &Debouncer,
        outcome: &mut CycleOutcome,
    ) {
        if !self.snapshots.has_changed(topic, &payload) {
            return;
        }
        log::info!(
            "[Bridge] Change detected on {topic}, publishing in {:?}.",
            debouncer.quiet_window()
        );

        let transport = Arc::clone(&self.transport);
        let snapshots = Arc::clone(&self.snapshots);
        let topic_owned = topic.to_string();
        debouncer.schedule(async move {
            match transport.publish(&topic_owned, &payload, true).await {
                Ok(()) => {
                    log::debug!(
                        "[Bridge] Published {} bytes to {topic_owned}",
                        payload.len()
                    );
                    snapshots.commit(&topic_owned, payload);
                }
                // No commit: the change stays detected and is retried.
                Err(e) => log::warn!("[Bridge] Publish to {topic_owned} failed: {e}"),
            }
        });
        outcome.scheduled_publishes.push(topic.to_string());
    }

    /// Publish the geometry-position block synchronously when it changed.
    fn stage_positions(&self, document: &Document, outcome: &mut CycleOutcome) {
        let payload = document.geometry_positions.clone();
        if !self.snapshots.has_changed(&self.topics.position_share, &payload) {
            return;
        }

        let positions = match mesh::decode_positions(&payload) {
            Ok(positions) => positions,
            Err(e) => {
                let warning = format!("could not parse geometry positions, not publishing: {e}");
                log::warn!("[Bridge] {warning}");
                outcome.warnings.push(warning);
                return;
            }
        };
        if positions.len() != document.meshes.len() {
            let warning = format!(
                "the number of meshes ({}) differs from the number of positions ({})",
                document.meshes.len(),
                positions.len()
            );
            log::warn!("[Bridge] {warning}");
            outcome.warnings.push(warning);
        }

        log::info!(
            "[Bridge] Geometry position change detected, publishing {} entr(ies).",
            positions.len()
        );
        let transport = Arc::clone(&self.transport);
        let snapshots = Arc::clone(&self.snapshots);
        let topic = self.topics.position_share.clone();
        self.runtime.spawn(async move {
            match transport.publish(&topic, &payload, true).await {
                Ok(()) => snapshots.commit(&topic, payload),
                Err(e) => log::warn!("[Bridge] Publish to {topic} failed: {e}"),
            }
        });
        outcome
            .immediate_publishes
            .push(self.topics.position_share.clone());
    }
}

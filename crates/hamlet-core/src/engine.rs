//! Engine lifecycle, control surface, and subscriber fan-out.
//!
//! The engine owns the world state and the tick loop task. Lifecycle:
//! `Uninitialized -> Initialized -> Running <-> Paused -> Stopped`.
//! While paused, wall time continues but world time does not advance
//! and no character logic runs; control commands still mutate flags.
//! Stopping cancels in-flight LLM work and persists a final snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hamlet_agents::catalog::ActionCatalog;
use hamlet_store::StateStore;
use hamlet_types::{ActivityLogEntry, WorldSnapshot};
use hamlet_world::WorldAtlas;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::SimClock;
use crate::config::WorldConfig;
use crate::decision::{BehaviorPolicy, ConversationPolicy, EpisodePolicy};
use crate::error::{EngineError, ValidationError};
use crate::publish::{Publisher, Subscription};
use crate::simulate::StepDeps;
use crate::state::WorldState;
use crate::tick::{materialize_schedules, run_tick, DefaultSchedules};

/// Observable engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Constructed, not yet initialised.
    Uninitialized,
    /// Initialised (state restored, schedules materialised).
    Initialized,
    /// The tick loop is running.
    Running,
    /// The tick loop is alive but world time is frozen.
    Paused,
    /// The tick loop has exited; the engine cannot restart.
    Stopped,
}

/// A control command from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Freeze world time.
    Pause,
    /// Resume world time.
    Unpause,
    /// Toggle the paused flag.
    Toggle,
    /// Start the tick loop.
    Start,
    /// Stop the engine for good.
    Stop,
}

impl ControlAction {
    /// Parse a control action string from the API.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for anything but the five known
    /// actions.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "pause" => Ok(Self::Pause),
            "unpause" => Ok(Self::Unpause),
            "toggle" => Ok(Self::Toggle),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(ValidationError {
                raw: other.to_owned(),
            }),
        }
    }
}

/// Result of a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlOutcome {
    /// Whether the engine is paused after the command.
    pub is_paused: bool,
    /// Whether the tick loop is running after the command.
    pub is_running: bool,
}

/// Operational metadata returned alongside state reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineMeta {
    /// Real milliseconds per tick.
    pub tick_rate: u64,
    /// Whether the engine is paused.
    pub is_paused: bool,
    /// Whether the tick loop is running.
    pub is_running: bool,
    /// State plus log subscriber count.
    pub subscriber_count: usize,
}

/// The decision-making collaborators, owned by the tick task once
/// started.
pub struct Policies {
    /// Behaviour decider.
    pub behavior: Box<dyn BehaviorPolicy>,
    /// Conversation turn driver.
    pub conversation: Box<dyn ConversationPolicy>,
    /// Mini-episode generator.
    pub episodes: Box<dyn EpisodePolicy>,
}

/// World state and clock under one lock.
struct EngineWorld {
    state: WorldState,
    clock: SimClock,
}

/// Shared engine internals.
struct EngineInner {
    atlas: Arc<WorldAtlas>,
    catalog: Arc<ActionCatalog>,
    config: WorldConfig,
    store: Arc<dyn StateStore>,
    default_schedules: DefaultSchedules,
    world: Mutex<EngineWorld>,
    policies: Mutex<Option<Policies>>,
    status: Mutex<EngineStatus>,
    paused: AtomicBool,
    running: AtomicBool,
    stop_requested: AtomicBool,
    /// Set by the LLM error monitor when policy dictates a pause.
    pause_requested: Arc<AtomicBool>,
    state_pub: Publisher<WorldSnapshot>,
    log_pub: Publisher<ActivityLogEntry>,
}

/// The simulation engine.
pub struct Engine {
    inner: Arc<EngineInner>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Engine {
    /// Construct an engine over prepared collaborators. The engine
    /// starts [`EngineStatus::Uninitialized`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        atlas: Arc<WorldAtlas>,
        catalog: Arc<ActionCatalog>,
        config: WorldConfig,
        store: Arc<dyn StateStore>,
        world: WorldState,
        clock: SimClock,
        default_schedules: DefaultSchedules,
        policies: Policies,
    ) -> Self {
        Self::with_pause_signal(
            atlas,
            catalog,
            config,
            store,
            world,
            clock,
            default_schedules,
            policies,
            Arc::new(AtomicBool::new(false)),
        )
    }

    /// Like [`Engine::new`], with an externally shared pause-request
    /// flag (the LLM error monitor writes it, the tick loop consumes
    /// it).
    #[allow(clippy::too_many_arguments)]
    pub fn with_pause_signal(
        atlas: Arc<WorldAtlas>,
        catalog: Arc<ActionCatalog>,
        config: WorldConfig,
        store: Arc<dyn StateStore>,
        world: WorldState,
        clock: SimClock,
        default_schedules: DefaultSchedules,
        policies: Policies,
        pause_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                atlas,
                catalog,
                config,
                store,
                default_schedules,
                world: Mutex::new(EngineWorld {
                    state: world,
                    clock,
                }),
                policies: Mutex::new(Some(policies)),
                status: Mutex::new(EngineStatus::Uninitialized),
                paused: AtomicBool::new(false),
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                pause_requested: pause_signal,
                state_pub: Publisher::new(),
                log_pub: Publisher::new(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Initialise the engine: restore persisted state when present and
    /// materialise default schedules for the current day. Idempotent.
    pub fn initialize(&self) -> Result<(), EngineError> {
        let mut status = self.lock_status()?;
        if *status != EngineStatus::Uninitialized {
            return Ok(());
        }

        let mut world = self.lock_world()?;
        let restored = self
            .inner
            .store
            .load_state()
            .unwrap_or_else(|e| {
                warn!(error = %e, "state restore failed, starting fresh");
                None
            });
        if let Some(snapshot) = restored {
            info!(tick = snapshot.tick, time = %snapshot.time, "State restored");
            world.state.characters = snapshot.characters;
            world.state.npcs = snapshot.npcs;
            world.state.current_map_id = snapshot.current_map_id;
            world.state.time = snapshot.time;
            world.state.tick = snapshot.tick;
            world.clock = SimClock::from_parts(
                snapshot.tick,
                snapshot.time,
                self.inner.config.timing.minutes_per_tick,
            )?;
        }

        materialize_schedules(
            self.inner.store.as_ref(),
            &self.inner.default_schedules,
            &world.state,
            world.state.time.day(),
        );
        drop(world);

        *status = EngineStatus::Initialized;
        info!("Engine initialized");
        Ok(())
    }

    /// Start the tick loop. Requires a non-empty map set and at least
    /// one character.
    pub fn start(&self) -> Result<(), EngineError> {
        {
            let status = self.lock_status()?;
            match *status {
                EngineStatus::Uninitialized => return Err(EngineError::NotInitialized),
                EngineStatus::Running | EngineStatus::Paused => {
                    return Err(EngineError::AlreadyRunning);
                }
                EngineStatus::Stopped => return Err(EngineError::Stopped),
                EngineStatus::Initialized => {}
            }
        }

        let characters = self.lock_world()?.state.characters.len();
        let maps = self.inner.atlas.map_count();
        if maps == 0 || characters == 0 {
            return Err(EngineError::EmptyWorld { maps, characters });
        }

        let Some(policies) = self
            .inner
            .policies
            .lock()
            .map_err(|_e| EngineError::Poisoned {
                context: String::from("policies"),
            })?
            .take()
        else {
            return Err(EngineError::AlreadyRunning);
        };

        self.inner.running.store(true, Ordering::Release);
        self.set_status(EngineStatus::Running)?;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(tick_loop(inner, policies));
        match self.task.lock() {
            Ok(mut slot) => *slot = Some(handle),
            Err(_poisoned) => handle.abort(),
        }

        info!(maps, characters, "Engine started");
        Ok(())
    }

    /// Stop the engine: cancel in-flight LLM work, persist a final
    /// snapshot, and wait for the tick loop to exit.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.inner.stop_requested.store(true, Ordering::Release);
        let handle = match self.task.lock() {
            Ok(mut slot) => slot.take(),
            Err(_poisoned) => None,
        };
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "tick task join failed");
        }
        self.inner.running.store(false, Ordering::Release);
        self.set_status(EngineStatus::Stopped)?;
        info!("Engine stopped");
        Ok(())
    }

    /// Apply a control command.
    pub fn control(&self, action: ControlAction) -> Result<ControlOutcome, EngineError> {
        match action {
            ControlAction::Pause => self.set_paused(true)?,
            ControlAction::Unpause => self.set_paused(false)?,
            ControlAction::Toggle => {
                let next = !self.inner.paused.load(Ordering::Acquire);
                self.set_paused(next)?;
            }
            ControlAction::Start => self.start()?,
            ControlAction::Stop => {
                // Fire-and-forget from the control surface; the loop
                // drains and exits on its own.
                self.inner.stop_requested.store(true, Ordering::Release);
                self.inner.running.store(false, Ordering::Release);
                self.set_status(EngineStatus::Stopped)?;
            }
        }
        Ok(self.control_outcome())
    }

    /// Current pause/running flags.
    pub fn control_outcome(&self) -> ControlOutcome {
        ControlOutcome {
            is_paused: self.inner.paused.load(Ordering::Acquire),
            is_running: self.inner.running.load(Ordering::Acquire),
        }
    }

    /// Current snapshot plus operational metadata.
    pub fn get_state(&self) -> Result<(WorldSnapshot, EngineMeta), EngineError> {
        let snapshot = self.lock_world()?.state.snapshot();
        Ok((
            snapshot,
            EngineMeta {
                tick_rate: self.inner.config.timing.tick_rate_ms,
                is_paused: self.inner.paused.load(Ordering::Acquire),
                is_running: self.inner.running.load(Ordering::Acquire),
                subscriber_count: self.subscriber_count(),
            },
        ))
    }

    /// Subscribe to world snapshots. The current snapshot is delivered
    /// immediately; the returned handle's `cancel` is idempotent.
    pub fn subscribe(
        &self,
        callback: impl Fn(&WorldSnapshot) + Send + 'static,
    ) -> Result<Subscription<WorldSnapshot>, EngineError> {
        let snapshot = self.lock_world()?.state.snapshot();
        callback(&snapshot);
        Ok(self.inner.state_pub.subscribe(callback))
    }

    /// Subscribe to activity log entries.
    pub fn subscribe_to_logs(
        &self,
        callback: impl Fn(&ActivityLogEntry) + Send + 'static,
    ) -> Subscription<ActivityLogEntry> {
        self.inner.log_pub.subscribe(callback)
    }

    /// Total subscriber count across both publishers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .state_pub
            .subscriber_count()
            .saturating_add(self.inner.log_pub.subscriber_count())
    }

    /// The pause-request flag the LLM error monitor sets when its
    /// policy demands an engine pause.
    pub fn pause_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.pause_requested)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> EngineStatus {
        self.lock_status().map_or(EngineStatus::Stopped, |s| *s)
    }

    // -- internals ---------------------------------------------------------

    fn set_paused(&self, paused: bool) -> Result<(), EngineError> {
        self.inner.paused.store(paused, Ordering::Release);
        let snapshot = {
            let mut world = self.lock_world()?;
            world.state.is_paused = paused;
            world.state.snapshot()
        };
        // Push the flip immediately so stream observers see it without
        // waiting for the next tick.
        self.inner.state_pub.publish(&snapshot);
        if self.inner.running.load(Ordering::Acquire) {
            self.set_status(if paused {
                EngineStatus::Paused
            } else {
                EngineStatus::Running
            })?;
        }
        Ok(())
    }

    fn set_status(&self, status: EngineStatus) -> Result<(), EngineError> {
        *self.lock_status()? = status;
        Ok(())
    }

    fn lock_world(&self) -> Result<std::sync::MutexGuard<'_, EngineWorld>, EngineError> {
        self.inner.world.lock().map_err(|_e| EngineError::Poisoned {
            context: String::from("world"),
        })
    }

    fn lock_status(&self) -> Result<std::sync::MutexGuard<'_, EngineStatus>, EngineError> {
        self.inner
            .status
            .lock()
            .map_err(|_e| EngineError::Poisoned {
                context: String::from("status"),
            })
    }
}

/// The tick loop task.
async fn tick_loop(inner: Arc<EngineInner>, mut policies: Policies) {
    let tick_rate = Duration::from_millis(inner.config.timing.tick_rate_ms.max(1));

    loop {
        if inner.stop_requested.load(Ordering::Acquire) {
            shutdown(&inner, &mut policies);
            return;
        }

        if !inner.paused.load(Ordering::Acquire) {
            run_one_tick(&inner, &mut policies);
        }

        // An error-policy pause lands in the same tick it was raised.
        if inner.pause_requested.swap(false, Ordering::AcqRel) {
            apply_error_pause(&inner);
        }

        tokio::time::sleep(tick_rate).await;
    }
}

/// Execute one tick under the world lock, then publish.
fn run_one_tick(inner: &Arc<EngineInner>, policies: &mut Policies) {
    let mut logs_buffer = Vec::new();
    let report = {
        let Ok(mut world) = inner.world.lock() else {
            warn!("world lock poisoned, skipping tick");
            return;
        };
        let EngineWorld { state, clock } = &mut *world;

        let mut deps = StepDeps {
            atlas: &inner.atlas,
            catalog: &inner.catalog,
            store: inner.store.as_ref(),
            behavior: policies.behavior.as_mut(),
            conversation: policies.conversation.as_mut(),
            episodes: policies.episodes.as_mut(),
            behavior_cfg: &inner.config.behavior,
            movement: &inner.config.movement,
            decay: &inner.config.decay_rates,
            delta_seconds: millis_to_seconds(inner.config.timing.tick_rate_ms),
            affinity_limit: inner.config.conversation.affinity_limit,
            episode_probability: inner.config.mini_episode.probability,
            logs: &mut logs_buffer,
        };

        match run_tick(state, clock, &mut deps, &inner.default_schedules) {
            Ok(report) => {
                state.is_paused = inner.paused.load(Ordering::Acquire);
                persist(inner, state);
                Some((state.snapshot(), report))
            }
            Err(e) => {
                warn!(error = %e, "tick failed");
                None
            }
        }
    };

    // Publish outside the world lock; callbacks must not re-enter the
    // engine.
    if let Some((snapshot, report)) = report {
        inner.state_pub.publish(&snapshot);
        for entry in &report.logs {
            inner.log_pub.publish(entry);
        }
    }
}

/// Error-policy pause: flip the flag and push the change immediately.
fn apply_error_pause(inner: &Arc<EngineInner>) {
    inner.paused.store(true, Ordering::Release);
    if let Ok(mut status) = inner.status.lock()
        && *status == EngineStatus::Running
    {
        *status = EngineStatus::Paused;
    }
    if let Ok(mut world) = inner.world.lock() {
        world.state.is_paused = true;
        let snapshot = world.state.snapshot();
        drop(world);
        inner.state_pub.publish(&snapshot);
    }
    warn!("engine paused by error policy");
}

/// Persist the world at the configured cadence; failures are logged
/// and retried at the next boundary.
fn persist(inner: &Arc<EngineInner>, state: &WorldState) {
    let interval = inner.config.persistence.persist_interval_ticks.max(1);
    if state.tick.checked_rem(interval).unwrap_or(0) != 0 {
        return;
    }
    let snapshot = state.snapshot();
    if let Err(e) = inner.store.save_state(&snapshot) {
        warn!(error = %e, "state persist failed");
    }
    if let Err(e) = inner.store.save_time(state.time) {
        warn!(error = %e, "time persist failed");
    }
    if let Err(e) = inner.store.save_current_map_id(&state.current_map_id) {
        warn!(error = %e, "map persist failed");
    }
}

/// Drain on stop: cancel in-flight LLM work and persist a final
/// snapshot. Late results are discarded with the policies.
fn shutdown(inner: &Arc<EngineInner>, policies: &mut Policies) {
    policies.behavior.cancel_all();
    policies.conversation.cancel_all();
    policies.episodes.cancel_all();

    if let Ok(world) = inner.world.lock() {
        let snapshot = world.state.snapshot();
        if let Err(e) = inner.store.save_state(&snapshot) {
            warn!(error = %e, "final persist failed");
        }
    }
    inner.running.store(false, Ordering::Release);
    info!("Tick loop exited");
}

/// Milliseconds to fractional seconds without precision surprises.
fn millis_to_seconds(ms: u64) -> f64 {
    let clamped = u32::try_from(ms.min(u64::from(u32::MAX))).unwrap_or(u32::MAX);
    f64::from(clamped) / 1000.0
}

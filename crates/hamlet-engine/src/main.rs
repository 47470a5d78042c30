//! Simulation server binary for the Hamlet world.
//!
//! Wires together configuration, the world atlas, seed characters and
//! NPCs, the state store, the decision policies, the engine, and the
//! observer API server.
//!
//! # Startup sequence
//!
//! 1. Initialise structured logging (tracing)
//! 2. Load `hamlet-config.yaml` (path from argv, env overrides applied)
//! 3. Load and validate `maps.json` into the world atlas
//! 4. Load `characters.json` and `npcs.json`, seed the world state
//! 5. Build the action catalogue with config overrides
//! 6. Build the decision policies (rule-based or LLM-backed)
//! 7. Construct, initialise, and start the engine
//! 8. Serve the observer API until Ctrl-C
//! 9. Stop the engine cleanly (cancel LLM work, final persist)
//!
//! Exits with code 1 on any initialisation or validation error.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hamlet_agents::catalog::ActionCatalog;
use hamlet_core::config::{
    default_schedules_from_file, load_characters_file, load_npcs_file, PolicyChoice, WorldConfig,
};
use hamlet_core::decision::{NoEpisodes, ScriptedConversationPolicy};
use hamlet_core::{
    DefaultSchedules, Engine, Policies, RulePolicy, RuleThresholds, SimClock, WorldState,
};
use hamlet_llm::{
    ErrorMonitor, GatewayConfig, LlmBehaviorPolicy, LlmConversationPolicy, LlmEpisodePolicy,
    LlmGateway, MonitorPolicy, PromptEngine, WebhookNotifier,
};
use hamlet_observer::server::start_server_with_shutdown;
use hamlet_observer::{AppState, ServerConfig};
use hamlet_store::{MemoryStore, StateStore};
use hamlet_world::{load_maps_file, WorldAtlas};

/// Application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_e| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("hamlet-engine starting");

    // 2. World configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("hamlet-config.yaml"), PathBuf::from);
    let config = WorldConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(
        tick_rate_ms = config.timing.tick_rate_ms,
        minutes_per_tick = config.timing.minutes_per_tick,
        policy = ?config.behavior.policy,
        "Configuration loaded"
    );

    // 3. Maps.
    let maps = load_maps_file(Path::new(&config.paths.maps), config.grid.tile_size)
        .with_context(|| format!("loading {}", config.paths.maps))?;
    let atlas = Arc::new(
        WorldAtlas::new(maps, config.grid.tile_size).context("building world atlas")?,
    );
    info!(maps = atlas.map_count(), "World atlas built");

    // 4. Characters and NPCs.
    let characters = load_characters_file(Path::new(&config.paths.characters), &atlas)
        .with_context(|| format!("loading {}", config.paths.characters))?;
    let npcs = load_npcs_file(Path::new(&config.paths.npcs), &atlas)
        .with_context(|| format!("loading {}", config.paths.npcs))?;
    let schedules: DefaultSchedules =
        default_schedules_from_file(Path::new(&config.paths.characters))
            .context("reading default schedules")?;
    info!(
        characters = characters.len(),
        npcs = npcs.len(),
        "Population loaded"
    );

    let start_time = config.start_time().context("initial_state.time")?;
    let mut world = WorldState::new(
        hamlet_types::MapId::from(config.initial_state.map_id.as_str()),
        start_time,
    );
    for character in characters {
        world.characters.insert(character.id.clone(), character);
    }
    for npc in npcs {
        world.npcs.insert(npc.id.clone(), npc);
    }

    let clock = SimClock::new(start_time, config.timing.minutes_per_tick)
        .context("building clock")?;

    // 5. Action catalogue.
    let catalog = Arc::new(ActionCatalog::with_overrides(&config.actions));

    // 6. Store and policies.
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let pause_signal = Arc::new(AtomicBool::new(false));
    let policies = build_policies(&config, &pause_signal)?;

    // 7. Engine.
    let engine = Arc::new(Engine::with_pause_signal(
        Arc::clone(&atlas),
        catalog,
        config.clone(),
        store,
        world,
        clock,
        schedules,
        policies,
        pause_signal,
    ));
    engine.initialize().context("initializing engine")?;
    engine.start().context("starting engine")?;

    // 8. Observer API with graceful shutdown.
    let app_state = AppState::attach(Arc::clone(&engine)).context("attaching observer")?;
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = start_server_with_shutdown(&server_config, app_state, shutdown).await {
            tracing::error!(error = %e, "observer server failed");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutdown requested");

    // 9. Clean stop: engine first (drains LLM work, final persist),
    // then the HTTP surface.
    engine.stop().await.context("stopping engine")?;
    let _ = shutdown_tx.send(());
    if let Err(e) = server.await {
        tracing::warn!(error = %e, "observer task join failed");
    }
    info!("hamlet-engine exited");
    Ok(())
}

/// Build the decision policies the configuration asks for.
fn build_policies(
    config: &WorldConfig,
    pause_signal: &Arc<AtomicBool>,
) -> anyhow::Result<Policies> {
    let rule_policy = RulePolicy::new(
        RuleThresholds::default(),
        config.movement.entrance_probability,
    );

    match config.behavior.policy {
        PolicyChoice::Rule => Ok(Policies {
            behavior: Box::new(rule_policy),
            conversation: Box::new(ScriptedConversationPolicy::default()),
            episodes: Box::new(NoEpisodes),
        }),
        PolicyChoice::Llm => {
            let gateway = Arc::new(
                LlmGateway::new(&GatewayConfig {
                    model: config.llm.model.clone(),
                    api_key: config.llm.api_key.clone(),
                    base_url: config.llm.base_url.clone(),
                    request_timeout_ms: config.llm.request_timeout_ms,
                })
                .context("building LLM gateway")?,
            );
            let prompts = Arc::new(
                PromptEngine::new(config.llm.templates_dir.as_deref())
                    .context("loading prompt templates")?,
            );
            let webhook = config
                .error
                .webhook_url
                .clone()
                .map(|url| WebhookNotifier::new(url, config.error.webhook_timeout_ms));
            let monitor = Arc::new(ErrorMonitor::new(
                MonitorPolicy {
                    pause_on_critical_error: config.error.pause_on_critical_error,
                    max_consecutive_failures: config.error.max_consecutive_failures,
                },
                Arc::clone(pause_signal),
                webhook,
            ));

            Ok(Policies {
                behavior: Box::new(LlmBehaviorPolicy::new(
                    Arc::clone(&gateway),
                    Arc::clone(&prompts),
                    Arc::clone(&monitor),
                    rule_policy,
                )),
                conversation: Box::new(LlmConversationPolicy::new(
                    Arc::clone(&gateway),
                    Arc::clone(&prompts),
                    Arc::clone(&monitor),
                )),
                episodes: Box::new(LlmEpisodePolicy::new(gateway, prompts, monitor)),
            })
        }
    }
}

//! World configuration loading.
//!
//! The canonical configuration lives in `hamlet-config.yaml`. This
//! module defines the strongly-typed structs mirroring that file, a
//! loader with environment-variable overrides for secrets, and the
//! `characters.json` / `npcs.json` loaders with their validation.

use std::collections::BTreeMap;
use std::path::Path;

use hamlet_agents::catalog::ActionOverride;
use hamlet_agents::decay::DecayRates;
use hamlet_types::{
    Character, CharacterId, Direction, Employment, FacilityId, MapId, Navigation, NodeId, Npc,
    NpcId, Position, ScheduleEntry, Stats, WorldTime,
};
use hamlet_world::WorldAtlas;
use serde::Deserialize;

/// Errors raised while loading the world configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A semantic problem in the configuration values.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Errors raised while loading character or NPC configuration.
#[derive(Debug, thiserror::Error)]
pub enum CharacterLoadError {
    /// Failed to read the file.
    #[error("failed to read character file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse character JSON: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// A character or NPC references a map that is not loaded.
    #[error("{who} references unknown map {map_id}")]
    UnknownMap {
        /// The offending character or NPC id.
        who: String,
        /// The dangling map id.
        map_id: MapId,
    },

    /// A character or NPC references a node that is not on its map.
    #[error("{who} spawns at unresolved node {node_id} on map {map_id}")]
    UnresolvedSpawnNode {
        /// The offending character or NPC id.
        who: String,
        /// The map looked up.
        map_id: MapId,
        /// The dangling node id.
        node_id: NodeId,
    },

    /// Two entries share an id.
    #[error("duplicate id {0}")]
    DuplicateId(String),
}

// ---------------------------------------------------------------------------
// World configuration
// ---------------------------------------------------------------------------

/// Top-level world configuration (mirrors `hamlet-config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Tick pacing.
    pub timing: TimingConfig,
    /// Movement parameters.
    pub movement: MovementConfig,
    /// Grid geometry defaults.
    pub grid: GridConfig,
    /// Where and when the simulation starts.
    pub initial_state: InitialStateConfig,
    /// Ambient stat decay rates (per world minute).
    pub decay_rates: DecayRates,
    /// Error-handling policy.
    pub error: ErrorPolicyConfig,
    /// Per-action overrides of the built-in catalogue.
    pub actions: BTreeMap<String, ActionOverride>,
    /// Mini-episode generation.
    pub mini_episode: MiniEpisodeConfig,
    /// Behaviour decision policy selection and pacing.
    pub behavior: BehaviorConfig,
    /// Conversation settings.
    pub conversation: ConversationConfig,
    /// Observer server binding.
    pub observer: ObserverConfig,
    /// Persistence cadence.
    pub persistence: PersistenceConfig,
    /// LLM gateway settings.
    pub llm: LlmConfig,
    /// Configuration file locations.
    pub paths: PathsConfig,
}

impl WorldConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides (`LLM_MODEL`, `LLM_API_KEY`, `LLM_BASE_URL`,
    /// `ERROR_WEBHOOK_URL`).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override file values for secrets and
    /// deploy-specific endpoints.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(val);
        }
        if let Ok(val) = std::env::var("ERROR_WEBHOOK_URL") {
            self.error.webhook_url = Some(val);
        }
    }

    /// Semantic validation beyond YAML shape.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.minutes_per_tick == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("timing.minutes_per_tick must be at least 1"),
            });
        }
        if self.timing.tick_rate_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("timing.tick_rate_ms must be at least 1"),
            });
        }
        if self.movement.speed <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: String::from("movement.speed must be positive"),
            });
        }
        if !(0.0..=1.0).contains(&self.mini_episode.probability) {
            return Err(ConfigError::Invalid {
                reason: String::from("mini_episode.probability must lie in [0, 1]"),
            });
        }
        Ok(())
    }

    /// The configured simulation start time (day 0).
    pub fn start_time(&self) -> Result<WorldTime, ConfigError> {
        let (hour, minute) =
            WorldTime::parse_clock(&self.initial_state.time).map_err(|e| ConfigError::Invalid {
                reason: format!("initial_state.time: {e}"),
            })?;
        WorldTime::new(0, hour, minute).map_err(|e| ConfigError::Invalid {
            reason: format!("initial_state.time: {e}"),
        })
    }
}

/// Tick pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Real milliseconds per tick.
    pub tick_rate_ms: u64,
    /// World minutes added per tick.
    pub minutes_per_tick: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 1000,
            minutes_per_tick: 1,
        }
    }
}

/// Movement parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walking speed in pixels per real second.
    pub speed: f64,
    /// Probability of an idle character wandering through an entrance.
    pub entrance_probability: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 96.0,
            entrance_probability: 0.05,
        }
    }
}

/// Grid geometry defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Tile side length in pixels.
    pub tile_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { tile_size: 32.0 }
    }
}

/// Where and when the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InitialStateConfig {
    /// Map the observer camera starts on.
    pub map_id: String,
    /// Clock time (`"HH:MM"`) on day 0.
    pub time: String,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            map_id: String::from("town"),
            time: String::from("07:00"),
        }
    }
}

/// Error-handling policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorPolicyConfig {
    /// Pause the engine on critical LLM errors.
    pub pause_on_critical_error: bool,
    /// Consecutive LLM failures before a pause is requested.
    pub max_consecutive_failures: u32,
    /// Webhook dispatch timeout in milliseconds.
    pub webhook_timeout_ms: u64,
    /// Webhook URL (normally from `ERROR_WEBHOOK_URL`).
    pub webhook_url: Option<String>,
}

impl Default for ErrorPolicyConfig {
    fn default() -> Self {
        Self {
            pause_on_critical_error: true,
            max_consecutive_failures: 3,
            webhook_timeout_ms: 10_000,
            webhook_url: None,
        }
    }
}

/// Mini-episode generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MiniEpisodeConfig {
    /// Probability of generating an episode after an action completes.
    pub probability: f64,
}

impl Default for MiniEpisodeConfig {
    fn default() -> Self {
        Self { probability: 0.15 }
    }
}

/// Which decision policy drives characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyChoice {
    /// Rule-based decisions only.
    #[default]
    Rule,
    /// LLM-backed decisions with rule fallback on classified failure.
    Llm,
}

/// Behaviour decision pacing and policy selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Which policy decides.
    pub policy: PolicyChoice,
    /// Minimum world minutes between decisions for one character.
    pub decision_cooldown_minutes: u32,
    /// Back-off base in world minutes for failed decisions.
    pub backoff_base_minutes: u32,
    /// Exponent cap for the failure back-off.
    pub backoff_cap: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyChoice::Rule,
            decision_cooldown_minutes: 5,
            backoff_base_minutes: 2,
            backoff_cap: 5,
        }
    }
}

impl BehaviorConfig {
    /// The back-off interval after `failures` consecutive failures:
    /// `base x 2^min(failures, cap)` world minutes.
    pub fn backoff_minutes(&self, failures: u32) -> u32 {
        let exponent = failures.min(self.backoff_cap);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.backoff_base_minutes.saturating_mul(factor)
    }
}

/// Conversation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Affinity clamp range: values stay in `[-limit, limit]`.
    pub affinity_limit: i32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { affinity_limit: 100 }
    }
}

/// Observer server binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Host address to bind.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Persistence cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Save the full state every N ticks.
    pub persist_interval_ticks: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            persist_interval_ticks: 1,
        }
    }
}

/// LLM gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model string: `provider[/subtype]/modelId`.
    pub model: String,
    /// API key (normally from `LLM_API_KEY`).
    pub api_key: String,
    /// Base URL override (normally from `LLM_BASE_URL`).
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Directory of prompt template overrides.
    pub templates_dir: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: String::from("openai/chat/gpt-4o-mini"),
            api_key: String::new(),
            base_url: None,
            request_timeout_ms: 15_000,
            templates_dir: None,
        }
    }
}

/// Configuration file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Map definitions.
    pub maps: String,
    /// Character definitions.
    pub characters: String,
    /// NPC definitions.
    pub npcs: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            maps: String::from("config/maps.json"),
            characters: String::from("config/characters.json"),
            npcs: String::from("config/npcs.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Character and NPC configuration
// ---------------------------------------------------------------------------

/// Initial stat values in `characters.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsConfig {
    /// Initial satiety.
    pub satiety: f64,
    /// Initial energy.
    pub energy: f64,
    /// Initial hygiene.
    pub hygiene: f64,
    /// Initial mood.
    pub mood: f64,
    /// Initial bladder relief.
    pub bladder: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            satiety: 80.0,
            energy: 80.0,
            hygiene: 80.0,
            mood: 70.0,
            bladder: 80.0,
        }
    }
}

/// Employment block in `characters.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentConfig {
    /// Workplace facility id.
    pub workplace_facility_id: String,
    /// Job title at that facility.
    pub job_title: String,
}

/// One character in `characters.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterConfig {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Sprite sheet key.
    pub sprite: String,
    /// Starting money.
    #[serde(default)]
    pub money: i64,
    /// Initial stats.
    #[serde(default)]
    pub stats: StatsConfig,
    /// Starting map.
    pub current_map_id: String,
    /// Starting node.
    pub current_node_id: String,
    /// Explicit starting pixel position (defaults to the node centre).
    #[serde(default)]
    pub position: Option<(f64, f64)>,
    /// Starting facing direction.
    #[serde(default)]
    pub direction: Direction,
    /// Personality description.
    #[serde(default)]
    pub personality: Option<String>,
    /// Behavioural tendencies.
    #[serde(default)]
    pub tendencies: Vec<String>,
    /// Extra prompt text.
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Employment contract.
    #[serde(default)]
    pub employment: Option<EmploymentConfig>,
    /// Schedule materialised for each new day.
    #[serde(default)]
    pub default_schedule: Vec<ScheduleEntry>,
}

/// One NPC in `npcs.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcConfig {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Map the NPC stands on.
    pub map_id: String,
    /// Node the NPC occupies.
    pub current_node_id: String,
    /// Personality description.
    #[serde(default)]
    pub personality: String,
    /// Behavioural tendencies.
    #[serde(default)]
    pub tendencies: Vec<String>,
    /// Extra prompt text.
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Facts the NPC starts out knowing.
    #[serde(default)]
    pub facts: Vec<String>,
    /// Starting affinity.
    #[serde(default)]
    pub affinity: i32,
    /// Starting mood word.
    #[serde(default = "default_mood")]
    pub mood: String,
}

fn default_mood() -> String {
    String::from("neutral")
}

/// Load and validate `characters.json` against the atlas.
pub fn load_characters_file(
    path: &Path,
    atlas: &WorldAtlas,
) -> Result<Vec<Character>, CharacterLoadError> {
    let contents = std::fs::read_to_string(path)?;
    parse_characters(&contents, atlas)
}

/// Parse and validate characters from a JSON string.
pub fn parse_characters(
    json: &str,
    atlas: &WorldAtlas,
) -> Result<Vec<Character>, CharacterLoadError> {
    let configs: Vec<CharacterConfig> = serde_json::from_str(json)?;
    let mut out = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for config in configs {
        if !seen.insert(config.id.clone()) {
            return Err(CharacterLoadError::DuplicateId(config.id));
        }
        let map_id = MapId::from(config.current_map_id.as_str());
        let node_id = NodeId::from(config.current_node_id.as_str());
        let node = resolve_spawn(atlas, &config.id, &map_id, &node_id)?;

        let position = config
            .position
            .map_or(node.position, |(x, y)| Position::new(x, y));

        out.push(Character {
            id: CharacterId::from(config.id.as_str()),
            name: config.name,
            sprite: config.sprite,
            money: config.money,
            stats: stats_from_config(&config.stats),
            current_map_id: map_id,
            current_node_id: node_id,
            position,
            direction: config.direction,
            navigation: Navigation::default(),
            cross_map_navigation: None,
            current_action: None,
            pending_action: None,
            conversation_id: None,
            action_counter: 0,
            display_emoji: None,
            employment: config.employment.map(|e| Employment {
                workplace_facility_id: FacilityId::from(e.workplace_facility_id.as_str()),
                job_title: e.job_title,
            }),
            personality: config.personality,
            tendencies: config.tendencies,
            custom_prompt: config.custom_prompt,
            next_decision_at: None,
            decision_failures: 0,
        });
    }
    Ok(out)
}

/// Load and validate `npcs.json` against the atlas.
pub fn load_npcs_file(path: &Path, atlas: &WorldAtlas) -> Result<Vec<Npc>, CharacterLoadError> {
    let contents = std::fs::read_to_string(path)?;
    parse_npcs(&contents, atlas)
}

/// Parse and validate NPCs from a JSON string.
pub fn parse_npcs(json: &str, atlas: &WorldAtlas) -> Result<Vec<Npc>, CharacterLoadError> {
    let configs: Vec<NpcConfig> = serde_json::from_str(json)?;
    let mut out = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for config in configs {
        if !seen.insert(config.id.clone()) {
            return Err(CharacterLoadError::DuplicateId(config.id));
        }
        let map_id = MapId::from(config.map_id.as_str());
        let node_id = NodeId::from(config.current_node_id.as_str());
        let node = resolve_spawn(atlas, &config.id, &map_id, &node_id)?;

        out.push(Npc {
            id: NpcId::from(config.id.as_str()),
            name: config.name,
            map_id,
            current_node_id: node_id,
            position: node.position,
            direction: Direction::Down,
            personality: config.personality,
            tendencies: config.tendencies,
            custom_prompt: config.custom_prompt,
            facts: config.facts,
            affinity: config.affinity,
            mood: config.mood,
            conversation_count: 0,
            last_conversation_at: None,
            in_conversation: false,
        });
    }
    Ok(out)
}

/// Default schedules keyed by character, read from `characters.json`.
pub fn default_schedules_from_file(
    path: &Path,
) -> Result<BTreeMap<CharacterId, Vec<ScheduleEntry>>, CharacterLoadError> {
    let contents = std::fs::read_to_string(path)?;
    default_schedules(&contents)
}

/// Default schedules keyed by character, pulled from the raw configs.
pub fn default_schedules(
    json: &str,
) -> Result<BTreeMap<CharacterId, Vec<ScheduleEntry>>, CharacterLoadError> {
    let configs: Vec<CharacterConfig> = serde_json::from_str(json)?;
    Ok(configs
        .into_iter()
        .filter(|c| !c.default_schedule.is_empty())
        .map(|c| (CharacterId::from(c.id.as_str()), c.default_schedule))
        .collect())
}

/// Stats from config values, clamped to the valid range.
fn stats_from_config(config: &StatsConfig) -> Stats {
    let mut stats = Stats::default();
    stats.set(hamlet_types::StatKind::Satiety, config.satiety);
    stats.set(hamlet_types::StatKind::Energy, config.energy);
    stats.set(hamlet_types::StatKind::Hygiene, config.hygiene);
    stats.set(hamlet_types::StatKind::Mood, config.mood);
    stats.set(hamlet_types::StatKind::Bladder, config.bladder);
    stats
}

/// Resolve a spawn reference or produce the matching load error.
fn resolve_spawn<'a>(
    atlas: &'a WorldAtlas,
    who: &str,
    map_id: &MapId,
    node_id: &NodeId,
) -> Result<&'a hamlet_types::PathNode, CharacterLoadError> {
    let map = atlas.map(map_id).ok_or_else(|| CharacterLoadError::UnknownMap {
        who: who.to_owned(),
        map_id: map_id.clone(),
    })?;
    map.node(node_id)
        .ok_or_else(|| CharacterLoadError::UnresolvedSpawnNode {
            who: who.to_owned(),
            map_id: map_id.clone(),
            node_id: node_id.clone(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_fixtures::single_map_atlas;

    #[test]
    fn default_config_is_valid() {
        let config = WorldConfig::parse("").unwrap();
        assert_eq!(config.timing.minutes_per_tick, 1);
        assert_eq!(config.error.max_consecutive_failures, 3);
        assert_eq!(config.behavior.policy, PolicyChoice::Rule);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
timing:
  tick_rate_ms: 500
  minutes_per_tick: 2

movement:
  speed: 64.0
  entrance_probability: 0.1

initial_state:
  map_id: home
  time: '06:30'

decay_rates:
  satietyPerMinute: 0.2

behavior:
  policy: llm
  decision_cooldown_minutes: 3

error:
  pause_on_critical_error: false
  max_consecutive_failures: 5

mini_episode:
  probability: 0.5
";
        let config = WorldConfig::parse(yaml).unwrap();
        assert_eq!(config.timing.tick_rate_ms, 500);
        assert_eq!(config.behavior.policy, PolicyChoice::Llm);
        assert!(!config.error.pause_on_critical_error);
        assert_eq!(
            config.start_time().unwrap(),
            WorldTime::new(0, 6, 30).unwrap()
        );
        assert!(config.decay_rates.satiety_per_minute > 0.19);
    }

    #[test]
    fn invalid_timing_rejected() {
        let yaml = "timing:\n  minutes_per_tick: 0\n";
        assert!(WorldConfig::parse(yaml).is_err());
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let behavior = BehaviorConfig::default();
        assert_eq!(behavior.backoff_minutes(0), 2);
        assert_eq!(behavior.backoff_minutes(1), 4);
        assert_eq!(behavior.backoff_minutes(3), 16);
        // Capped at 2^5.
        assert_eq!(behavior.backoff_minutes(9), 64);
    }

    #[test]
    fn characters_parse_and_validate() {
        let atlas = single_map_atlas("town", 4, 4);
        let json = r#"[
            {"id": "alice", "name": "Alice", "sprite": "alice",
             "money": 800,
             "stats": {"satiety": 60.0},
             "currentMapId": "town", "currentNodeId": "town-1-1",
             "defaultSchedule": [
                {"time": "08:00", "activity": "eat", "location": "kitchen"}
             ]}
        ]"#;
        let characters = parse_characters(json, &atlas).unwrap();
        assert_eq!(characters.len(), 1);
        let alice = characters.first().unwrap();
        assert_eq!(alice.money, 800);
        assert!(alice.stats.satiety > 59.0);
        // Position defaults to the node centre.
        assert!(alice.position.x > 0.0);

        let schedules = default_schedules(json).unwrap();
        assert_eq!(
            schedules
                .get(&CharacterId::from("alice"))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn unknown_spawn_map_rejected() {
        let atlas = single_map_atlas("town", 2, 2);
        let json = r#"[
            {"id": "bob", "name": "Bob", "sprite": "bob",
             "currentMapId": "moon", "currentNodeId": "moon-0-0"}
        ]"#;
        assert!(matches!(
            parse_characters(json, &atlas),
            Err(CharacterLoadError::UnknownMap { .. })
        ));
    }

    #[test]
    fn unresolved_spawn_node_rejected() {
        let atlas = single_map_atlas("town", 2, 2);
        let json = r#"[
            {"id": "bob", "name": "Bob", "sprite": "bob",
             "currentMapId": "town", "currentNodeId": "town-9-9"}
        ]"#;
        assert!(matches!(
            parse_characters(json, &atlas),
            Err(CharacterLoadError::UnresolvedSpawnNode { .. })
        ));
    }

    #[test]
    fn duplicate_character_ids_rejected() {
        let atlas = single_map_atlas("town", 2, 2);
        let json = r#"[
            {"id": "bob", "name": "Bob", "sprite": "bob",
             "currentMapId": "town", "currentNodeId": "town-0-0"},
            {"id": "bob", "name": "Bobby", "sprite": "bob",
             "currentMapId": "town", "currentNodeId": "town-0-1"}
        ]"#;
        assert!(matches!(
            parse_characters(json, &atlas),
            Err(CharacterLoadError::DuplicateId(_))
        ));
    }

    #[test]
    fn npcs_parse_with_defaults() {
        let atlas = single_map_atlas("town", 2, 2);
        let json = r#"[
            {"id": "baker", "name": "Baker",
             "mapId": "town", "currentNodeId": "town-1-1",
             "personality": "cheerful"}
        ]"#;
        let npcs = parse_npcs(json, &atlas).unwrap();
        assert_eq!(npcs.len(), 1);
        assert_eq!(npcs.first().unwrap().mood, "neutral");
        assert!(!npcs.first().unwrap().in_conversation);
    }
}

//! Prompt template loading and rendering via `minijinja`.
//!
//! Default templates are compiled into the binary; an operator can
//! override any of them by pointing `llm.templates_dir` at a directory
//! containing files with the same names (`system.j2`, `decision.j2`,
//! `conversation.j2`, `episode.j2`).

use minijinja::Environment;
use serde_json::json;

use hamlet_types::{BehaviorContext, Character, ConversationSession, Npc};

use crate::error::LlmError;
use crate::gateway::PromptParts;

/// Compiled-in default templates.
const DEFAULT_TEMPLATES: [(&str, &str); 4] = [
    ("system", include_str!("../templates/system.j2")),
    ("decision", include_str!("../templates/decision.j2")),
    ("conversation", include_str!("../templates/conversation.j2")),
    ("episode", include_str!("../templates/episode.j2")),
];

/// Manages prompt templates and renders the three prompt kinds.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// Create an engine with the compiled-in defaults, overridden by
    /// any same-named files in `templates_dir`.
    pub fn new(templates_dir: Option<&str>) -> Result<Self, LlmError> {
        let mut env = Environment::new();

        for (name, source) in DEFAULT_TEMPLATES {
            let body = match templates_dir {
                Some(dir) => {
                    let path = format!("{dir}/{name}.j2");
                    std::fs::read_to_string(&path).unwrap_or_else(|_e| source.to_owned())
                }
                None => source.to_owned(),
            };
            env.add_template_owned(name.to_owned(), body)
                .map_err(|e| LlmError::Template {
                    message: format!("failed to add {name} template: {e}"),
                })?;
        }

        Ok(Self { env })
    }

    /// Render the behaviour-decision prompt for one context.
    pub fn render_decision(&self, ctx: &BehaviorContext) -> Result<PromptParts, LlmError> {
        let mut value = serde_json::to_value(ctx).map_err(|e| LlmError::Template {
            message: format!("context serialization failed: {e}"),
        })?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                String::from("clock"),
                serde_json::Value::String(ctx.time.clock_string()),
            );
        }

        Ok(PromptParts {
            system: self.render("system", &value)?,
            user: self.render("decision", &value)?,
        })
    }

    /// Render the conversation-turn prompt for one session.
    pub fn render_conversation(
        &self,
        session: &ConversationSession,
        character: &Character,
        npc: &Npc,
    ) -> Result<PromptParts, LlmError> {
        let value = json!({
            "character_name": character.name,
            "custom_prompt": character.custom_prompt,
            "npc_name": npc.name,
            "npc_personality": npc.personality,
            "npc_tendencies": npc.tendencies,
            "npc_mood": npc.mood,
            "npc_affinity": npc.affinity,
            "npc_facts": npc.facts,
            "npc_custom_prompt": npc.custom_prompt,
            "goal": session.goal,
            "messages": session.messages,
            "current_turn": session.current_turn,
            "max_turns": session.max_turns,
        });

        Ok(PromptParts {
            system: self.render("system", &value)?,
            user: self.render("conversation", &value)?,
        })
    }

    /// Render the mini-episode prompt.
    pub fn render_episode(
        &self,
        character_name: &str,
        action_id: &str,
        day: u32,
        time: &str,
    ) -> Result<PromptParts, LlmError> {
        let value = json!({
            "character_name": character_name,
            "custom_prompt": serde_json::Value::Null,
            "action_id": action_id,
            "day": day,
            "time": time,
        });

        Ok(PromptParts {
            system: self.render("system", &value)?,
            user: self.render("episode", &value)?,
        })
    }

    /// Render one named template against a JSON value.
    fn render(&self, name: &str, value: &serde_json::Value) -> Result<String, LlmError> {
        self.env
            .get_template(name)
            .map_err(|e| LlmError::Template {
                message: format!("missing {name} template: {e}"),
            })?
            .render(value)
            .map_err(|e| LlmError::Template {
                message: format!("{name} render failed: {e}"),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_types::{
        CharacterId, ConversationGoal, Direction, MapId, Navigation, NodeId, NpcId, Position,
        Stats, WorldTime,
    };

    use super::*;

    fn context() -> BehaviorContext {
        BehaviorContext {
            character_id: CharacterId::from("alice"),
            character_name: String::from("Alice"),
            stats: Stats::default(),
            money: 250,
            map_id: MapId::from("town"),
            node_id: NodeId::from("town-1-1"),
            time: WorldTime::new(0, 8, 30).unwrap(),
            schedule_today: Vec::new(),
            available_actions: vec![hamlet_types::ActionKind::Rest],
            current_map_facilities: Vec::new(),
            nearby_maps: Vec::new(),
            nearby_facilities: Vec::new(),
            nearby_npcs: Vec::new(),
            today_actions: Vec::new(),
            mid_term_memories: Vec::new(),
            personality: Some(String::from("curious and frugal")),
            tendencies: vec![String::from("early riser")],
            custom_prompt: None,
        }
    }

    fn character() -> Character {
        Character {
            id: CharacterId::from("alice"),
            name: String::from("Alice"),
            sprite: String::from("alice"),
            money: 250,
            stats: Stats::default(),
            current_map_id: MapId::from("town"),
            current_node_id: NodeId::from("town-1-1"),
            position: Position::new(0.0, 0.0),
            direction: Direction::Down,
            navigation: Navigation::default(),
            cross_map_navigation: None,
            current_action: None,
            pending_action: None,
            conversation_id: None,
            action_counter: 0,
            display_emoji: None,
            employment: None,
            personality: None,
            tendencies: Vec::new(),
            custom_prompt: None,
            next_decision_at: None,
            decision_failures: 0,
        }
    }

    fn npc() -> Npc {
        Npc {
            id: NpcId::from("baker"),
            name: String::from("Baker"),
            map_id: MapId::from("town"),
            current_node_id: NodeId::from("town-1-2"),
            position: Position::new(0.0, 0.0),
            direction: Direction::Down,
            personality: String::from("cheerful"),
            tendencies: Vec::new(),
            custom_prompt: None,
            facts: vec![String::from("bread is cheapest at dusk")],
            affinity: 5,
            mood: String::from("sunny"),
            conversation_count: 0,
            last_conversation_at: None,
            in_conversation: true,
        }
    }

    #[test]
    fn decision_prompt_renders_stats_and_clock() {
        let engine = PromptEngine::new(None).unwrap();
        let prompt = engine.render_decision(&context()).unwrap();
        assert!(prompt.system.contains("Alice"));
        assert!(prompt.user.contains("08:30"));
        assert!(prompt.user.contains("curious and frugal"));
        assert!(prompt.user.contains("rest"));
    }

    #[test]
    fn conversation_prompt_includes_goal_and_history() {
        let engine = PromptEngine::new(None).unwrap();
        let mut session = ConversationSession::open(
            CharacterId::from("alice"),
            NpcId::from("baker"),
            ConversationGoal {
                goal: String::from("buy bread"),
                success_criteria: String::from("a loaf in hand"),
            },
            WorldTime::new(0, 9, 0).unwrap(),
        );
        session.push_message(hamlet_types::ConversationMessage {
            speaker: hamlet_types::Speaker::Character,
            speaker_id: String::from("alice"),
            speaker_name: String::from("Alice"),
            utterance: String::from("Good morning!"),
            timestamp: chrono::Utc::now(),
        });

        let prompt = engine
            .render_conversation(&session, &character(), &npc())
            .unwrap();
        assert!(prompt.user.contains("buy bread"));
        assert!(prompt.user.contains("Good morning!"));
        assert!(prompt.user.contains("bread is cheapest at dusk"));
    }

    #[test]
    fn episode_prompt_names_the_action() {
        let engine = PromptEngine::new(None).unwrap();
        let prompt = engine
            .render_episode("Alice", "rest", 2, "14:30")
            .unwrap();
        assert!(prompt.user.contains("rest"));
        assert!(prompt.user.contains("14:30"));
    }

    #[test]
    fn missing_override_dir_falls_back_to_defaults() {
        let engine = PromptEngine::new(Some("/nonexistent/templates")).unwrap();
        assert!(engine.render_decision(&context()).is_ok());
    }
}

//! The per-character behaviour state machine.
//!
//! Driven once per character per tick, in lexicographic id order:
//!
//! - conversing characters exchange turns at their session's pace;
//! - acting characters complete when world time reaches the action's
//!   target end;
//! - moving characters advance their navigation, cross map boundaries,
//!   and promote a pending action on arrival;
//! - idle characters (cooldown permitting) poll the behaviour policy
//!   and act on its decision.
//!
//! Rejected promotions and failed decisions put the character on a
//! cooldown (exponential back-off for classified failures).

use std::collections::BTreeSet;

use chrono::Utc;
use hamlet_agents::catalog::{ActionCatalog, DurationSpec};
use hamlet_agents::{
    apply_turn, begin_route, check_requirements, close_session, complete_action, enter_action,
    should_close, RequirementContext,
};
use hamlet_store::StateStore;
use hamlet_types::{
    ActionHistoryEntry, ActionKind, ActionLogStatus, ActivityLogEntry, ActivityPayload,
    BehaviorDecision, Character, CharacterId, ConversationGoal, ConversationSession,
    DecisionKind, Facility, MapId, MapTransition, NodeId, PendingAction, SessionStatus,
    WorldTime,
};
use hamlet_world::{plan_route, BlockedByMap, WorldAtlas};
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{BehaviorConfig, MovementConfig};
use crate::decision::{
    BehaviorPolicy, ConversationPolicy, DecisionPoll, EpisodePolicy, EpisodeRequest, TurnPoll,
};
use crate::state::WorldState;

/// Marker shown by clients while a decision is in flight.
const THINKING_EMOJI: &str = "thinking";

/// How many days a conversation-learned fact stays in memory.
const MEMORY_LIFETIME_DAYS: u32 = 3;

/// Everything one character step needs besides the world state.
pub struct StepDeps<'a> {
    /// The immutable world atlas.
    pub atlas: &'a WorldAtlas,
    /// The action catalogue.
    pub catalog: &'a ActionCatalog,
    /// The persistence boundary.
    pub store: &'a dyn StateStore,
    /// The behaviour decider.
    pub behavior: &'a mut dyn BehaviorPolicy,
    /// The conversation turn driver.
    pub conversation: &'a mut dyn ConversationPolicy,
    /// The mini-episode generator.
    pub episodes: &'a mut dyn EpisodePolicy,
    /// Decision pacing and back-off settings.
    pub behavior_cfg: &'a BehaviorConfig,
    /// Movement settings.
    pub movement: &'a MovementConfig,
    /// Ambient stat decay rates.
    pub decay: &'a hamlet_agents::DecayRates,
    /// Real seconds covered by this tick.
    pub delta_seconds: f64,
    /// Affinity clamp for conversation deltas.
    pub affinity_limit: i32,
    /// Probability of rolling a mini-episode after an action.
    pub episode_probability: f64,
    /// Log entries emitted this tick (drained by the engine).
    pub logs: &'a mut Vec<ActivityLogEntry>,
}

/// Advance one character's state machine by one tick.
pub fn step_character(state: &mut WorldState, deps: &mut StepDeps<'_>, id: &CharacterId) {
    // Take the character out of the map so the rest of the world stays
    // borrowable while we mutate it.
    let Some(mut character) = state.characters.remove(id) else {
        return;
    };

    if character.conversation_id.is_some() {
        step_conversation(state, deps, &mut character);
    } else if character.current_action.is_some() {
        step_acting(state, deps, &mut character);
    } else if character.navigation.is_moving {
        step_moving(state, deps, &mut character);
    } else {
        step_idle(state, deps, &mut character);
    }

    state.characters.insert(id.clone(), character);
}

/// State-machine invariants checked by tests after every tick.
pub fn invariants_hold(character: &Character) -> bool {
    let acting_and_moving = character.current_action.is_some() && character.navigation.is_moving;
    let excused = character.pending_action.is_some();
    if acting_and_moving && !excused {
        return false;
    }
    if character.cross_map_navigation.is_some() && !character.navigation.is_moving {
        return false;
    }
    character.stats.in_bounds()
}

// ---------------------------------------------------------------------------
// Conversing
// ---------------------------------------------------------------------------

fn step_conversation(state: &mut WorldState, deps: &mut StepDeps<'_>, character: &mut Character) {
    let now = state.time;
    let Some(session_id) = character.conversation_id else {
        return;
    };

    // Invariant guard: a talk action must reference a live session.
    let session_alive = state
        .sessions
        .get(&session_id)
        .is_some_and(|s| s.status == SessionStatus::Active);
    if !session_alive {
        warn!(character = %character.id, "conversation reference without live session");
        character.conversation_id = None;
        character.current_action = None;
        return;
    }

    let due = state
        .sessions
        .get(&session_id)
        .is_some_and(|s| now >= s.next_turn_at);
    if !due {
        return;
    }

    // Poll with immutable borrows, then re-borrow mutably to apply.
    let poll = {
        let Some(session) = state.sessions.get(&session_id) else {
            return;
        };
        let Some(npc) = state.npcs.get(&session.npc_id) else {
            end_dangling_session(state, character, session_id);
            return;
        };
        deps.conversation.poll_turn(session, character, npc)
    };

    match poll {
        TurnPoll::Pending => {}
        TurnPoll::Ready(outcome) => {
            let interval = deps
                .catalog
                .get(ActionKind::Talk)
                .map_or(1, |d| d.turn_interval_minutes.max(1));

            let Some(session) = state.sessions.get_mut(&session_id) else {
                return;
            };
            let Some(npc) = state.npcs.get_mut(&session.npc_id) else {
                return;
            };

            apply_turn(
                session,
                npc,
                &character.name,
                &outcome,
                now,
                interval,
                deps.affinity_limit,
            );

            let utter_log = ActivityPayload::ConversationMessage {
                session_id,
                npc_id: npc.id.clone(),
                speaker_name: session
                    .messages
                    .last()
                    .map(|m| m.speaker_name.clone())
                    .unwrap_or_default(),
                utterance: outcome.utterance.clone(),
            };

            // A learned fact persists as a mid-term memory for a few
            // days.
            if let Some(fact) = outcome.fact_learned.as_ref() {
                let memory = hamlet_types::MidTermMemory {
                    id: hamlet_types::MemoryId::new(),
                    character_id: character.id.clone(),
                    content: fact.clone(),
                    importance: hamlet_types::Importance::Medium,
                    created_day: now.day(),
                    expires_day: now.day().saturating_add(MEMORY_LIFETIME_DAYS),
                    source_npc_id: Some(npc.id.clone()),
                };
                if let Err(e) = deps.store.add_mid_term_memory(&memory) {
                    warn!(character = %character.id, error = %e, "memory write failed");
                }
            }

            push_log(deps.logs, character, now, utter_log);

            if should_close(session, &outcome) {
                finish_session(state, deps, character, session_id);
            }
        }
        TurnPoll::Failed(failure) => {
            warn!(
                character = %character.id,
                code = failure.code,
                "conversation turn failed, closing session"
            );
            finish_session(state, deps, character, session_id);
        }
    }
}

/// Close a session normally: summary log, history row, cleanup.
fn finish_session(
    state: &mut WorldState,
    deps: &mut StepDeps<'_>,
    character: &mut Character,
    session_id: hamlet_types::SessionId,
) {
    let now = state.time;
    let Some(session) = state.sessions.get_mut(&session_id) else {
        return;
    };
    let Some(npc) = state.npcs.get_mut(&session.npc_id) else {
        end_dangling_session(state, character, session_id);
        return;
    };

    let summary = close_session(session, npc, now);
    let npc_id = npc.id.clone();
    let start_time = session.start_time;

    push_log(
        deps.logs,
        character,
        now,
        ActivityPayload::Conversation {
            session_id,
            npc_id: npc_id.clone(),
            summary: summary.summary,
            topics: summary.topics,
            affinity_change: summary.affinity_change,
            npc_mood: summary.npc_mood,
            goal_achieved: summary.goal_achieved,
        },
    );

    let minutes = start_time.minutes_until(&now);
    let entry = ActionHistoryEntry {
        character_id: character.id.clone(),
        day: now.day(),
        time: now.clock_string(),
        action_id: ActionKind::Talk,
        target: Some(npc_id.to_string()),
        duration_minutes: u32::try_from(minutes).ok(),
        reason: None,
        episode: None,
    };
    if let Err(e) = deps.store.add_action_history(&entry) {
        warn!(character = %character.id, error = %e, "history write failed");
    }

    character.conversation_id = None;
    character.current_action = None;
    set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
}

/// Clear a session whose NPC vanished.
fn end_dangling_session(
    state: &mut WorldState,
    character: &mut Character,
    session_id: hamlet_types::SessionId,
) {
    if let Some(session) = state.sessions.get_mut(&session_id) {
        session.status = SessionStatus::Aborted;
    }
    character.conversation_id = None;
    character.current_action = None;
}

// ---------------------------------------------------------------------------
// Acting
// ---------------------------------------------------------------------------

fn step_acting(state: &mut WorldState, deps: &mut StepDeps<'_>, character: &mut Character) {
    let now = state.time;
    let Some(action) = character.current_action.clone() else {
        return;
    };

    // A talk action without a session is inconsistent; drop it.
    if action.action_id == ActionKind::Talk {
        warn!(character = %character.id, "talk action without conversation");
        character.current_action = None;
        return;
    }

    if now < action.target_end_time {
        return;
    }

    let Some(def) = deps.catalog.get(action.action_id) else {
        warn!(character = %character.id, action = %action.action_id, "definition missing");
        character.current_action = None;
        return;
    };

    let facility = action
        .facility_id
        .as_ref()
        .and_then(|fid| find_facility(deps.atlas, &character.current_map_id, fid));

    let elapsed = action
        .duration_minutes
        .unwrap_or_else(|| u32::try_from(action.start_time.minutes_until(&now)).unwrap_or(0));

    let outcome = complete_action(character, def, facility, elapsed);

    let entry = ActionHistoryEntry {
        character_id: character.id.clone(),
        day: now.day(),
        time: now.clock_string(),
        action_id: action.action_id,
        target: action.facility_id.as_ref().map(ToString::to_string),
        duration_minutes: Some(elapsed),
        reason: None,
        episode: None,
    };
    if let Err(e) = deps.store.add_action_history(&entry) {
        warn!(character = %character.id, error = %e, "history write failed");
    }

    push_log(
        deps.logs,
        character,
        now,
        ActivityPayload::Action {
            status: ActionLogStatus::Completed,
            action_id: action.action_id,
            target: action.facility_id.as_ref().map(ToString::to_string),
            duration_minutes: Some(elapsed),
            reason: None,
        },
    );

    debug!(
        character = %character.id,
        action = %action.action_id,
        money_delta = outcome.money_delta,
        "Action finished"
    );

    // Mini-episode roll.
    if deps.episode_probability > 0.0
        && rand::rng().random_bool(deps.episode_probability.clamp(0.0, 1.0))
    {
        deps.episodes.request(EpisodeRequest {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            action_id: action.action_id,
            day: now.day(),
            time: now.clock_string(),
        });
    }

    character.current_action = None;
    character.decision_failures = 0;
    set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
}

// ---------------------------------------------------------------------------
// Moving
// ---------------------------------------------------------------------------

fn step_moving(state: &mut WorldState, deps: &mut StepDeps<'_>, character: &mut Character) {
    let advanced = hamlet_agents::advance(
        character,
        deps.atlas,
        deps.delta_seconds,
        deps.movement.speed,
    );

    let outcome = match advanced {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(character = %character.id, error = %e, "navigation failed, stopping");
            character.navigation = hamlet_types::Navigation::default();
            character.cross_map_navigation = None;
            character.pending_action = None;
            return;
        }
    };

    if let Some((from, to)) = outcome.crossed {
        state.transition = Some(MapTransition {
            character_id: character.id.clone(),
            from_map_id: from,
            to_map_id: to,
        });
    }

    if outcome.arrived
        && let Some(pending) = character.pending_action.take()
    {
        promote_pending(state, deps, character, pending);
    }
}

// ---------------------------------------------------------------------------
// Idle and deciding
// ---------------------------------------------------------------------------

fn step_idle(state: &mut WorldState, deps: &mut StepDeps<'_>, character: &mut Character) {
    let now = state.time;
    if let Some(at) = character.next_decision_at
        && now < at
    {
        return;
    }

    let ctx = crate::context::build_context(state, deps.atlas, deps.catalog, deps.store, character);

    match deps.behavior.poll_decide(&ctx) {
        DecisionPoll::Pending => {
            character.display_emoji = Some(THINKING_EMOJI.to_owned());
        }
        DecisionPoll::Failed(failure) => {
            character.display_emoji = None;
            character.decision_failures = character.decision_failures.saturating_add(1);
            let backoff = deps
                .behavior_cfg
                .backoff_minutes(character.decision_failures);
            set_cooldown(character, now, backoff);
            debug!(
                character = %character.id,
                code = failure.code,
                failures = character.decision_failures,
                backoff_minutes = backoff,
                "decision failed"
            );
        }
        DecisionPoll::Ready(decision) => {
            character.display_emoji = None;
            character.decision_failures = 0;
            apply_schedule_update(deps, character, &decision, now);
            apply_decision(state, deps, character, decision);
        }
    }
}

/// Apply a requested schedule mutation atomically before acting.
fn apply_schedule_update(
    deps: &mut StepDeps<'_>,
    character: &Character,
    decision: &BehaviorDecision,
    now: WorldTime,
) {
    let Some(update) = decision.schedule_update.clone() else {
        return;
    };
    let day = now.day();
    let mut schedule = deps
        .store
        .load_schedule(&character.id, day)
        .ok()
        .flatten()
        .unwrap_or_else(|| hamlet_types::Schedule::empty(character.id.clone(), day));
    schedule.apply_update(update);
    if let Err(e) = deps.store.save_schedule(&schedule) {
        warn!(character = %character.id, error = %e, "schedule write failed");
    }
}

fn apply_decision(
    state: &mut WorldState,
    deps: &mut StepDeps<'_>,
    character: &mut Character,
    decision: BehaviorDecision,
) {
    let now = state.time;
    match decision.kind {
        DecisionKind::Idle => {
            set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
        }
        DecisionKind::Move => {
            let target_map = decision
                .target_map_id
                .clone()
                .unwrap_or_else(|| character.current_map_id.clone());
            let target_node = decision.target_node_id.clone().or_else(|| {
                deps.atlas.map(&target_map).map(|m| m.spawn_node_id.clone())
            });
            let Some(target_node) = target_node else {
                set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
                return;
            };
            if !start_moving(state, deps, character, &target_map, &target_node, None) {
                set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
            }
        }
        DecisionKind::Action => {
            let Some(action_id) = decision.action_id else {
                set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
                return;
            };
            let pending = PendingAction {
                action_id,
                facility_id: decision.target_facility_id.clone(),
                target_npc_id: decision.target_npc_id.clone(),
                conversation_goal: decision.conversation_goal.clone(),
                duration_minutes: decision.duration_minutes,
                reason: decision.reason.clone(),
            };

            let target = action_target(state, deps, character, &decision);
            match target {
                Some((map_id, node_id))
                    if map_id == character.current_map_id
                        && node_id == character.current_node_id =>
                {
                    promote_pending(state, deps, character, pending);
                }
                Some((map_id, node_id)) => {
                    if start_moving(state, deps, character, &map_id, &node_id, Some(pending)) {
                        // Walking; the action fires on arrival.
                    } else {
                        set_cooldown(
                            character,
                            now,
                            deps.behavior_cfg.decision_cooldown_minutes,
                        );
                    }
                }
                None => {
                    set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
                }
            }
        }
    }
}

/// Resolve where an action decision wants the character to stand.
fn action_target(
    state: &WorldState,
    deps: &StepDeps<'_>,
    character: &Character,
    decision: &BehaviorDecision,
) -> Option<(MapId, NodeId)> {
    // Talking happens next to the NPC.
    if decision.action_id == Some(ActionKind::Talk) {
        let npc = decision
            .target_npc_id
            .as_ref()
            .and_then(|id| state.npcs.get(id))?;
        let map = deps.atlas.map(&npc.map_id)?;
        let stand = map
            .node(&npc.current_node_id)?
            .connected_to
            .iter()
            .find(|n| map.node(n).is_some())
            .cloned()?;
        // Already adjacent? Stay put.
        if character.current_map_id == npc.map_id
            && hamlet_world::are_adjacent(map, &character.current_node_id, &npc.current_node_id)
        {
            return Some((character.current_map_id.clone(), character.current_node_id.clone()));
        }
        return Some((npc.map_id.clone(), stand));
    }

    // Explicit target node wins.
    if let Some(node) = decision.target_node_id.clone() {
        let map = decision
            .target_map_id
            .clone()
            .unwrap_or_else(|| character.current_map_id.clone());
        return Some((map, node));
    }

    // A facility id without a node: stand at its access node.
    if let Some(facility_id) = decision.target_facility_id.as_ref() {
        let tile = deps.atlas.tile_size();
        for (map_id, map) in deps.atlas.maps() {
            if let Some(node) = hamlet_world::access_node(map, tile, facility_id) {
                return Some((map_id.clone(), node));
            }
        }
        return None;
    }

    // No target at all: act right here.
    Some((character.current_map_id.clone(), character.current_node_id.clone()))
}

/// Plan and begin a route; returns whether movement started.
fn start_moving(
    state: &mut WorldState,
    deps: &mut StepDeps<'_>,
    character: &mut Character,
    target_map: &MapId,
    target_node: &NodeId,
    pending: Option<PendingAction>,
) -> bool {
    let blocked = blocked_by_map(state, deps.atlas);
    let route = plan_route(
        deps.atlas,
        &character.current_map_id,
        &character.current_node_id,
        target_map,
        target_node,
        &blocked,
    );

    let Some(route) = route else {
        debug!(
            character = %character.id,
            to_map = %target_map,
            to_node = %target_node,
            "no route to target"
        );
        return false;
    };

    if let Err(e) = begin_route(character, deps.atlas, route) {
        warn!(character = %character.id, error = %e, "route start failed");
        return false;
    }
    character.pending_action = pending;
    true
}

/// NPC-occupied nodes per map.
fn blocked_by_map(state: &WorldState, atlas: &WorldAtlas) -> BlockedByMap {
    let mut blocked = BlockedByMap::new();
    for (map_id, _map) in atlas.maps() {
        let nodes: BTreeSet<NodeId> = state.npc_blocked_nodes(map_id);
        if !nodes.is_empty() {
            blocked.insert(map_id.clone(), nodes);
        }
    }
    blocked
}

/// Promote a pending action into execution at the current node.
fn promote_pending(
    state: &mut WorldState,
    deps: &mut StepDeps<'_>,
    character: &mut Character,
    pending: PendingAction,
) {
    let now = state.time;
    let Some(def) = deps.catalog.get(pending.action_id) else {
        warn!(character = %character.id, action = %pending.action_id, "unknown action");
        set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
        return;
    };

    let facility = pending
        .facility_id
        .as_ref()
        .and_then(|fid| find_facility(deps.atlas, &character.current_map_id, fid))
        .or_else(|| {
            deps.atlas
                .map(&character.current_map_id)
                .and_then(|m| m.facility_at(&character.current_node_id, deps.atlas.tile_size()))
        });

    let (npc_adjacent, npc_free) = pending
        .target_npc_id
        .as_ref()
        .and_then(|id| state.npcs.get(id))
        .map_or((false, false), |npc| {
            let adjacent = npc.map_id == character.current_map_id
                && deps.atlas.map(&npc.map_id).is_some_and(|m| {
                    hamlet_world::are_adjacent(m, &character.current_node_id, &npc.current_node_id)
                });
            (adjacent, !npc.in_conversation)
        });

    let ctx = RequirementContext {
        facility,
        npc_adjacent,
        npc_free,
        hour: now.hour(),
    };

    if let Err(reason) = check_requirements(def, character, &ctx) {
        debug!(
            character = %character.id,
            action = %pending.action_id,
            %reason,
            "action rejected"
        );
        set_cooldown(character, now, deps.behavior_cfg.decision_cooldown_minutes);
        return;
    }

    let facility_for_entry = facility.map(|f| f.id.clone());
    let request = PendingAction {
        facility_id: pending.facility_id.clone().or(facility_for_entry),
        ..pending.clone()
    };

    let action = enter_action(character, def, &request, now);

    push_log(
        deps.logs,
        character,
        now,
        ActivityPayload::Action {
            status: ActionLogStatus::Started,
            action_id: action.action_id,
            target: action
                .facility_id
                .as_ref()
                .map(ToString::to_string)
                .or_else(|| action.target_npc_id.as_ref().map(ToString::to_string)),
            duration_minutes: action.duration_minutes,
            reason: pending.reason.clone(),
        },
    );

    // Talking opens a session and claims the NPC.
    if matches!(def.duration, DurationSpec::Session)
        && let Some(npc_id) = pending.target_npc_id.clone()
    {
        let goal = pending.conversation_goal.clone().unwrap_or_else(|| {
            ConversationGoal {
                goal: String::from("have a friendly chat"),
                success_criteria: String::from("a pleasant exchange"),
            }
        });
        let session =
            ConversationSession::open(character.id.clone(), npc_id.clone(), goal, now);
        character.conversation_id = Some(session.id);
        if let Some(npc) = state.npcs.get_mut(&npc_id) {
            npc.in_conversation = true;
        }
        state.sessions.insert(session.id, session);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Find a facility by id on the given map.
fn find_facility<'a>(
    atlas: &'a WorldAtlas,
    map_id: &MapId,
    facility_id: &hamlet_types::FacilityId,
) -> Option<&'a Facility> {
    atlas
        .map(map_id)
        .and_then(|m| m.facilities().find(|f| f.id == *facility_id))
}

/// Defer the next decision by the given number of world minutes.
fn set_cooldown(character: &mut Character, now: WorldTime, minutes: u32) {
    character.next_decision_at = Some(now.plus_minutes(minutes));
}

/// Emit one log entry stamped with the character's sequence counter.
fn push_log(
    logs: &mut Vec<ActivityLogEntry>,
    character: &mut Character,
    world_time: WorldTime,
    payload: ActivityPayload,
) {
    let sequence = character.next_action_counter();
    logs.push(ActivityLogEntry {
        timestamp: Utc::now(),
        world_time,
        character_id: character.id.clone(),
        character_name: character.name.clone(),
        sequence,
        payload,
    });
}

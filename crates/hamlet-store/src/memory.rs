//! In-memory reference implementation of the state store.
//!
//! All collections live behind one [`RwLock`]; every save clones the
//! input and every load clones the output, so callers can never mutate
//! stored data through a returned reference.

use std::collections::BTreeMap;
use std::sync::RwLock;

use hamlet_types::{
    ActionHistoryEntry, Character, CharacterId, MapId, MidTermMemory, Schedule, WorldSnapshot,
    WorldTime,
};
use tracing::debug;

use crate::error::StoreError;
use crate::StateStore;

/// Everything the memory store holds.
#[derive(Debug, Default)]
struct Inner {
    /// Last persisted snapshot.
    state: Option<WorldSnapshot>,
    /// Characters keyed by id.
    characters: BTreeMap<CharacterId, Character>,
    /// Persisted world time.
    time: Option<WorldTime>,
    /// Persisted current map id.
    current_map_id: Option<MapId>,
    /// Schedules keyed by `(character, day)`.
    schedules: BTreeMap<(CharacterId, u32), Schedule>,
    /// Append-only action history.
    action_history: Vec<ActionHistoryEntry>,
    /// Append-only mid-term memories.
    memories: Vec<MidTermMemory>,
}

/// The in-memory state store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock, mapping poisoning to a typed error.
    fn write(&self, context: &str) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_e| StoreError::Poisoned {
            context: context.to_owned(),
        })
    }

    /// Acquire the read lock, mapping poisoning to a typed error.
    fn read(&self, context: &str) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_e| StoreError::Poisoned {
            context: context.to_owned(),
        })
    }
}

impl StateStore for MemoryStore {
    fn save_state(&self, state: &WorldSnapshot) -> Result<(), StoreError> {
        let mut inner = self.write("save_state")?;
        inner.state = Some(state.clone());
        Ok(())
    }

    fn load_state(&self) -> Result<Option<WorldSnapshot>, StoreError> {
        Ok(self.read("load_state")?.state.clone())
    }

    fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        let mut inner = self.write("save_character")?;
        inner
            .characters
            .insert(character.id.clone(), character.clone());
        Ok(())
    }

    fn load_character(&self, id: &CharacterId) -> Result<Option<Character>, StoreError> {
        Ok(self.read("load_character")?.characters.get(id).cloned())
    }

    fn load_all_characters(&self) -> Result<Vec<Character>, StoreError> {
        Ok(self
            .read("load_all_characters")?
            .characters
            .values()
            .cloned()
            .collect())
    }

    fn delete_character(&self, id: &CharacterId) -> Result<(), StoreError> {
        let mut inner = self.write("delete_character")?;
        inner.characters.remove(id);
        Ok(())
    }

    fn save_time(&self, time: WorldTime) -> Result<(), StoreError> {
        let mut inner = self.write("save_time")?;
        inner.time = Some(time);
        Ok(())
    }

    fn load_time(&self) -> Result<Option<WorldTime>, StoreError> {
        Ok(self.read("load_time")?.time)
    }

    fn save_current_map_id(&self, map_id: &MapId) -> Result<(), StoreError> {
        let mut inner = self.write("save_current_map_id")?;
        inner.current_map_id = Some(map_id.clone());
        Ok(())
    }

    fn load_current_map_id(&self) -> Result<Option<MapId>, StoreError> {
        Ok(self.read("load_current_map_id")?.current_map_id.clone())
    }

    fn save_schedule(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let mut inner = self.write("save_schedule")?;
        inner.schedules.insert(
            (schedule.character_id.clone(), schedule.day),
            schedule.clone(),
        );
        Ok(())
    }

    fn load_schedule(
        &self,
        character_id: &CharacterId,
        day: u32,
    ) -> Result<Option<Schedule>, StoreError> {
        Ok(self
            .read("load_schedule")?
            .schedules
            .get(&(character_id.clone(), day))
            .cloned())
    }

    fn load_schedules_for_character(
        &self,
        character_id: &CharacterId,
    ) -> Result<Vec<Schedule>, StoreError> {
        Ok(self
            .read("load_schedules_for_character")?
            .schedules
            .values()
            .filter(|s| s.character_id == *character_id)
            .cloned()
            .collect())
    }

    fn delete_schedule(&self, character_id: &CharacterId, day: u32) -> Result<(), StoreError> {
        let mut inner = self.write("delete_schedule")?;
        inner.schedules.remove(&(character_id.clone(), day));
        Ok(())
    }

    fn delete_all_schedules_for_character(
        &self,
        character_id: &CharacterId,
    ) -> Result<(), StoreError> {
        let mut inner = self.write("delete_all_schedules_for_character")?;
        inner
            .schedules
            .retain(|(owner, _day), _s| owner != character_id);
        Ok(())
    }

    fn add_action_history(&self, entry: &ActionHistoryEntry) -> Result<(), StoreError> {
        let mut inner = self.write("add_action_history")?;
        inner.action_history.push(entry.clone());
        Ok(())
    }

    fn load_action_history_for_day(
        &self,
        character_id: &CharacterId,
        day: u32,
    ) -> Result<Vec<ActionHistoryEntry>, StoreError> {
        Ok(self
            .read("load_action_history_for_day")?
            .action_history
            .iter()
            .filter(|e| e.character_id == *character_id && e.day == day)
            .cloned()
            .collect())
    }

    fn update_action_history_episode(
        &self,
        character_id: &CharacterId,
        day: u32,
        time: &str,
        episode: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.write("update_action_history_episode")?;
        // Latest matching row wins: scan from the back.
        let hit = inner
            .action_history
            .iter_mut()
            .rev()
            .find(|e| e.character_id == *character_id && e.day == day && e.time == time);
        match hit {
            Some(entry) => entry.episode = Some(episode.to_owned()),
            None => debug!(%character_id, day, time, "no history row for episode"),
        }
        Ok(())
    }

    fn add_mid_term_memory(&self, memory: &MidTermMemory) -> Result<(), StoreError> {
        let mut inner = self.write("add_mid_term_memory")?;
        inner.memories.push(memory.clone());
        Ok(())
    }

    fn load_active_mid_term_memories(
        &self,
        character_id: &CharacterId,
        current_day: u32,
    ) -> Result<Vec<MidTermMemory>, StoreError> {
        Ok(self
            .read("load_active_mid_term_memories")?
            .memories
            .iter()
            .filter(|m| m.character_id == *character_id && !m.is_expired(current_day))
            .cloned()
            .collect())
    }

    fn delete_expired_mid_term_memories(&self, current_day: u32) -> Result<u64, StoreError> {
        let mut inner = self.write("delete_expired_mid_term_memories")?;
        let before = inner.memories.len();
        inner.memories.retain(|m| !m.is_expired(current_day));
        let removed = before.saturating_sub(inner.memories.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    fn has_data(&self) -> Result<bool, StoreError> {
        let inner = self.read("has_data")?;
        Ok(inner.state.is_some()
            || !inner.characters.is_empty()
            || inner.time.is_some()
            || !inner.schedules.is_empty()
            || !inner.action_history.is_empty()
            || !inner.memories.is_empty())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut inner = self.write("clear")?;
        *inner = Inner::default();
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hamlet_types::{ActionKind, Importance, MemoryId, ScheduleEntry, Stats};

    use super::*;

    fn character(id: &str) -> Character {
        Character {
            id: CharacterId::from(id),
            name: id.to_owned(),
            sprite: id.to_owned(),
            money: 500,
            stats: Stats::default(),
            current_map_id: MapId::from("town"),
            current_node_id: hamlet_types::NodeId::from("town-0-0"),
            position: hamlet_types::Position::new(16.0, 16.0),
            direction: hamlet_types::Direction::Down,
            navigation: hamlet_types::Navigation::default(),
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

    fn history_entry(id: &str, day: u32, time: &str) -> ActionHistoryEntry {
        ActionHistoryEntry {
            character_id: CharacterId::from(id),
            day,
            time: time.to_owned(),
            action_id: ActionKind::Eat,
            target: None,
            duration_minutes: Some(30),
            reason: None,
            episode: None,
        }
    }

    #[test]
    fn saved_character_is_isolated_from_caller_mutation() {
        let store = MemoryStore::new();
        let mut c = character("alice");
        store.save_character(&c).unwrap();

        // Mutating the caller's copy must not affect the stored one.
        c.money = 0;
        let loaded = store.load_character(&CharacterId::from("alice")).unwrap();
        assert_eq!(loaded.unwrap().money, 500);
    }

    #[test]
    fn loaded_character_is_isolated_from_store() {
        let store = MemoryStore::new();
        store.save_character(&character("alice")).unwrap();

        let mut loaded = store
            .load_character(&CharacterId::from("alice"))
            .unwrap()
            .unwrap();
        loaded.money = -1;

        let reloaded = store
            .load_character(&CharacterId::from("alice"))
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.money, 500);
    }

    #[test]
    fn schedule_upsert_replaces_same_day() {
        let store = MemoryStore::new();
        let id = CharacterId::from("alice");
        let mut s = Schedule::empty(id.clone(), 3);
        s.entries.push(ScheduleEntry {
            time: String::from("08:00"),
            activity: String::from("eat"),
            location: None,
            note: None,
        });
        store.save_schedule(&s).unwrap();

        let replacement = Schedule::empty(id.clone(), 3);
        store.save_schedule(&replacement).unwrap();

        let loaded = store.load_schedule(&id, 3).unwrap().unwrap();
        assert!(loaded.entries.is_empty());
        assert_eq!(store.load_schedules_for_character(&id).unwrap().len(), 1);
    }

    #[test]
    fn episode_attaches_to_latest_matching_row() {
        let store = MemoryStore::new();
        let id = CharacterId::from("alice");
        store.add_action_history(&history_entry("alice", 1, "08:00")).unwrap();
        store.add_action_history(&history_entry("alice", 1, "08:00")).unwrap();

        store
            .update_action_history_episode(&id, 1, "08:00", "a quiet breakfast")
            .unwrap();

        let rows = store.load_action_history_for_day(&id, 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.first().unwrap().episode.is_none());
        assert_eq!(
            rows.get(1).unwrap().episode.as_deref(),
            Some("a quiet breakfast")
        );
    }

    #[test]
    fn expired_memories_are_deleted() {
        let store = MemoryStore::new();
        let id = CharacterId::from("alice");
        let mem = |expires_day: u32| MidTermMemory {
            id: MemoryId::new(),
            character_id: id.clone(),
            content: String::from("fact"),
            importance: Importance::Low,
            created_day: 0,
            expires_day,
            source_npc_id: None,
        };
        store.add_mid_term_memory(&mem(2)).unwrap();
        store.add_mid_term_memory(&mem(9)).unwrap();

        assert_eq!(store.load_active_mid_term_memories(&id, 5).unwrap().len(), 1);
        assert_eq!(store.delete_expired_mid_term_memories(5).unwrap(), 1);
        assert_eq!(store.load_active_mid_term_memories(&id, 5).unwrap().len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let store = MemoryStore::new();
        assert!(!store.has_data().unwrap());
        store.save_character(&character("alice")).unwrap();
        store.save_time(WorldTime::start_of_day_zero()).unwrap();
        assert!(store.has_data().unwrap());

        store.clear().unwrap();
        assert!(!store.has_data().unwrap());
        assert!(store.load_time().unwrap().is_none());
    }

    #[test]
    fn delete_all_schedules_only_touches_owner() {
        let store = MemoryStore::new();
        store
            .save_schedule(&Schedule::empty(CharacterId::from("alice"), 0))
            .unwrap();
        store
            .save_schedule(&Schedule::empty(CharacterId::from("bob"), 0))
            .unwrap();

        store
            .delete_all_schedules_for_character(&CharacterId::from("alice"))
            .unwrap();

        assert!(store
            .load_schedule(&CharacterId::from("alice"), 0)
            .unwrap()
            .is_none());
        assert!(store
            .load_schedule(&CharacterId::from("bob"), 0)
            .unwrap()
            .is_some());
    }
}

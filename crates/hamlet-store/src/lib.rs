//! State persistence boundary for the Hamlet simulation.
//!
//! The engine owns no files; everything it persists goes through the
//! [`StateStore`] trait. The [`MemoryStore`] reference implementation
//! keeps owned clones on both save and load, so mutating a returned
//! value never affects stored data. Disk-backed implementations plug
//! in behind the same trait.

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use hamlet_types::{
    ActionHistoryEntry, Character, CharacterId, MapId, MidTermMemory, Schedule, WorldSnapshot,
    WorldTime,
};

/// The persistence operations the engine consumes.
///
/// Implementations must be safe for reads by API handlers concurrent
/// with writes from the tick loop. Schedule identity is
/// `(character_id, day)` with upsert semantics; action history is
/// append-only, with episode attachment patching the latest matching
/// row.
pub trait StateStore: Send + Sync {
    /// Persist a full world snapshot.
    fn save_state(&self, state: &WorldSnapshot) -> Result<(), StoreError>;

    /// Load the last persisted world snapshot.
    fn load_state(&self) -> Result<Option<WorldSnapshot>, StoreError>;

    /// Persist one character.
    fn save_character(&self, character: &Character) -> Result<(), StoreError>;

    /// Load one character.
    fn load_character(&self, id: &CharacterId) -> Result<Option<Character>, StoreError>;

    /// Load every persisted character, in id order.
    fn load_all_characters(&self) -> Result<Vec<Character>, StoreError>;

    /// Remove one character.
    fn delete_character(&self, id: &CharacterId) -> Result<(), StoreError>;

    /// Persist the current world time.
    fn save_time(&self, time: WorldTime) -> Result<(), StoreError>;

    /// Load the persisted world time.
    fn load_time(&self) -> Result<Option<WorldTime>, StoreError>;

    /// Persist the observer-facing current map id.
    fn save_current_map_id(&self, map_id: &MapId) -> Result<(), StoreError>;

    /// Load the observer-facing current map id.
    fn load_current_map_id(&self) -> Result<Option<MapId>, StoreError>;

    /// Insert or replace the schedule for `(schedule.character_id,
    /// schedule.day)`.
    fn save_schedule(&self, schedule: &Schedule) -> Result<(), StoreError>;

    /// Load the schedule for a character and day.
    fn load_schedule(
        &self,
        character_id: &CharacterId,
        day: u32,
    ) -> Result<Option<Schedule>, StoreError>;

    /// Load every schedule for a character, ascending by day.
    fn load_schedules_for_character(
        &self,
        character_id: &CharacterId,
    ) -> Result<Vec<Schedule>, StoreError>;

    /// Delete the schedule for a character and day.
    fn delete_schedule(&self, character_id: &CharacterId, day: u32) -> Result<(), StoreError>;

    /// Delete every schedule for a character.
    fn delete_all_schedules_for_character(
        &self,
        character_id: &CharacterId,
    ) -> Result<(), StoreError>;

    /// Append one action history row.
    fn add_action_history(&self, entry: &ActionHistoryEntry) -> Result<(), StoreError>;

    /// Load a character's action history for one day, in append order.
    fn load_action_history_for_day(
        &self,
        character_id: &CharacterId,
        day: u32,
    ) -> Result<Vec<ActionHistoryEntry>, StoreError>;

    /// Attach an episode to the **latest** history row matching
    /// `(character_id, day, time)`. A non-matching call is a no-op.
    fn update_action_history_episode(
        &self,
        character_id: &CharacterId,
        day: u32,
        time: &str,
        episode: &str,
    ) -> Result<(), StoreError>;

    /// Append one mid-term memory.
    fn add_mid_term_memory(&self, memory: &MidTermMemory) -> Result<(), StoreError>;

    /// Load a character's memories that have not expired as of
    /// `current_day`.
    fn load_active_mid_term_memories(
        &self,
        character_id: &CharacterId,
        current_day: u32,
    ) -> Result<Vec<MidTermMemory>, StoreError>;

    /// Delete every memory with `expires_day < current_day`; returns
    /// how many were removed.
    fn delete_expired_mid_term_memories(&self, current_day: u32) -> Result<u64, StoreError>;

    /// Whether any data has been persisted.
    fn has_data(&self) -> Result<bool, StoreError>;

    /// Remove everything.
    fn clear(&self) -> Result<(), StoreError>;

    /// Release backing resources. The in-memory implementation treats
    /// this as a no-op.
    fn close(&self) -> Result<(), StoreError>;
}

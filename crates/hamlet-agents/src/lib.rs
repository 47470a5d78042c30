//! Character mechanics for the Hamlet simulation: stat drift, the
//! action catalogue and executor, navigation advancement, conversation
//! session mechanics, and schedule matching.
//!
//! Everything here is synchronous and deterministic; the tick loop in
//! `hamlet-core` drives it, and the LLM side lives in `hamlet-llm`.

pub mod catalog;
pub mod conversation;
pub mod decay;
pub mod error;
pub mod execute;
pub mod navigation;
pub mod requirements;
pub mod schedule;

pub use catalog::{
    ActionCatalog, ActionDefinition, ActionOverride, DurationSpec, MoneyEffect, Requirements,
};
pub use conversation::{
    abort_session, apply_turn, close_session, should_close, ConversationSummary, TurnOutcome,
};
pub use decay::{apply_stat_drift, DecayRates};
pub use error::{AgentError, RejectionReason};
pub use execute::{complete_action, enter_action, CompletionOutcome};
pub use navigation::{advance, begin_route, AdvanceOutcome};
pub use requirements::{check_requirements, RequirementContext};
pub use schedule::due_entry;

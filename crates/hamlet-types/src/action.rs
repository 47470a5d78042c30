//! Action identifiers.
//!
//! The catalogue of action *definitions* (durations, effects,
//! requirements) is data-driven and lives with the executor; this
//! module only names the actions the engine recognises.

use serde::{Deserialize, Serialize};

/// The actions a character can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Eat at a kitchen or restaurant.
    Eat,
    /// Sleep in a bedroom.
    Sleep,
    /// Bathe in a bathroom or hot spring.
    Bathe,
    /// Use a toilet.
    Toilet,
    /// Rest in a public space.
    Rest,
    /// Work at an employed workspace.
    Work,
    /// Converse with a nearby NPC.
    Talk,
    /// Internal marker while a decision is in flight; never persisted.
    Thinking,
}

impl ActionKind {
    /// All persistable actions (everything except [`Self::Thinking`]).
    pub const PERSISTABLE: [Self; 7] = [
        Self::Eat,
        Self::Sleep,
        Self::Bathe,
        Self::Toilet,
        Self::Rest,
        Self::Work,
        Self::Talk,
    ];

    /// The lowercase identifier used in configuration and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eat => "eat",
            Self::Sleep => "sleep",
            Self::Bathe => "bathe",
            Self::Toilet => "toilet",
            Self::Rest => "rest",
            Self::Work => "work",
            Self::Talk => "talk",
            Self::Thinking => "thinking",
        }
    }

    /// Parse a lowercase identifier, tolerating surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "eat" => Some(Self::Eat),
            "sleep" => Some(Self::Sleep),
            "bathe" => Some(Self::Bathe),
            "toilet" => Some(Self::Toilet),
            "rest" => Some(Self::Rest),
            "work" => Some(Self::Work),
            "talk" => Some(Self::Talk),
            "thinking" => Some(Self::Thinking),
            _ => None,
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_display() {
        for kind in ActionKind::PERSISTABLE {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(ActionKind::parse("juggle"), None);
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&ActionKind::Eat).unwrap_or_default();
        assert_eq!(json, "\"eat\"");
    }
}

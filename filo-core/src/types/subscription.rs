//! Subscription identity

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::DestinationId;
use super::target::Category;
use crate::error::{CoreError, CoreResult};

/// Kind of status change a subscription listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Find,
    Death,
    Open,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Find, EventKind::Death, EventKind::Open];

    /// Parse one event kind, singular or plural
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "FIND" | "FINDS" => Ok(EventKind::Find),
            "DEATH" | "DEATHS" => Ok(EventKind::Death),
            "OPEN" | "OPENS" | "OPENING" | "OPENINGS" => Ok(EventKind::Open),
            other => Err(CoreError::UnknownEventKind(other.to_string())),
        }
    }

    /// Parse the comma separated command form, e.g. `"FINDS, DEATHS"`
    ///
    /// `ALL` expands to every kind. Duplicates collapse, order is kept.
    pub fn parse_list(s: &str) -> CoreResult<Vec<Self>> {
        let mut kinds = Vec::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("all") {
                return Ok(Self::ALL.to_vec());
            }
            let kind = Self::parse(token)?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(CoreError::UnknownEventKind(s.trim().to_string()));
        }
        Ok(kinds)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Find => "FIND",
            EventKind::Death => "DEATH",
            EventKind::Open => "OPEN",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (destination, world, category, event kind) registration
///
/// Unique on the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subscription {
    pub destination: DestinationId,
    pub world: String,
    pub category: Category,
    pub event_kind: EventKind,
}

impl Subscription {
    pub fn new(
        destination: DestinationId,
        world: impl Into<String>,
        category: Category,
        event_kind: EventKind,
    ) -> Self {
        Self {
            destination,
            world: world.into(),
            category,
            event_kind,
        }
    }

    pub fn matches(&self, world: &str, category: Category, event_kind: EventKind) -> bool {
        self.world == world && self.category == category && self.event_kind == event_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(
            EventKind::parse_list("FINDS, deaths").unwrap(),
            vec![EventKind::Find, EventKind::Death]
        );
        assert_eq!(
            EventKind::parse_list("open,OPENINGS,find").unwrap(),
            vec![EventKind::Open, EventKind::Find]
        );
        assert_eq!(EventKind::parse_list("all").unwrap(), EventKind::ALL.to_vec());
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        assert_eq!(
            EventKind::parse_list("finds, spawns"),
            Err(CoreError::UnknownEventKind("SPAWNS".to_string()))
        );
        assert!(EventKind::parse_list(" , ").is_err());
    }

    #[test]
    fn test_subscription_matches_full_tuple() {
        let sub = Subscription::new(DestinationId(1), "Mateus", Category::SbA, EventKind::Find);
        assert!(sub.matches("Mateus", Category::SbA, EventKind::Find));
        assert!(!sub.matches("Mateus", Category::SbA, EventKind::Death));
        assert!(!sub.matches("Zalera", Category::SbA, EventKind::Find));
    }
}

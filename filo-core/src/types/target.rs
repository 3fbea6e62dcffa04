//! Target (mark / fate) reference types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Target rank
///
/// `F` is used for fates, which have no respawn window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    A,
    S,
    B,
    F,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::S => "S",
            Rank::B => "B",
            Rank::F => "F",
        }
    }
}

impl FromStr for Rank {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Rank::A),
            "S" => Ok(Rank::S),
            "B" => Ok(Rank::B),
            "F" | "FATE" => Ok(Rank::F),
            other => Err(CoreError::InvalidRank(other.to_string())),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game expansion a zone belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expansion {
    ARealmReborn,
    Heavensward,
    Stormblood,
    Shadowbringers,
}

impl Expansion {
    /// Parse the dataset / command form
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_token(s).as_str() {
            "ARR" | "A_REALM_REBORN" => Some(Self::ARealmReborn),
            "HW" | "HEAVENSWARD" => Some(Self::Heavensward),
            "SB" | "STORMBLOOD" => Some(Self::Stormblood),
            "SHB" | "SHADOWBRINGERS" => Some(Self::Shadowbringers),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ARealmReborn => "A Realm Reborn",
            Self::Heavensward => "Heavensward",
            Self::Stormblood => "Stormblood",
            Self::Shadowbringers => "Shadowbringers",
        }
    }

    /// Offset used when converting raw positions to flag coordinates
    pub fn coordinate_offset(&self) -> f64 {
        match self {
            Self::Heavensward => 22.5,
            _ => 21.5,
        }
    }
}

/// Notification category a subscription listens to
///
/// Marks map to an (expansion, rank) category; fates share one category.
/// `Trains` carries finds that look like part of an ongoing kill train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ShbA,
    ShbS,
    SbA,
    SbS,
    HwA,
    HwS,
    ArrA,
    ArrS,
    Fate,
    Trains,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::ShbA,
        Category::ShbS,
        Category::SbA,
        Category::SbS,
        Category::HwA,
        Category::HwS,
        Category::ArrA,
        Category::ArrS,
        Category::Fate,
        Category::Trains,
    ];

    /// Parse the textual command form
    ///
    /// Accepts short codes (`SB_A`), long names (`stormblood_a`,
    /// `STORMBLOOD A`) and is case-insensitive.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let token = normalize_token(s);
        let category = match token.as_str() {
            "FATE" | "FATES" => Some(Category::Fate),
            "TRAIN" | "TRAINS" => Some(Category::Trains),
            _ => token.rsplit_once('_').and_then(|(expansion, rank)| {
                let expansion = Expansion::parse(expansion)?;
                let rank = rank.parse::<Rank>().ok()?;
                Category::for_mark(expansion, rank)
            }),
        };
        category.ok_or_else(|| CoreError::UnknownCategory(s.trim().to_string()))
    }

    /// Category for a mark of the given expansion and rank
    ///
    /// B and F ranks are not notification-worthy and have no category.
    pub fn for_mark(expansion: Expansion, rank: Rank) -> Option<Self> {
        match (expansion, rank) {
            (Expansion::Shadowbringers, Rank::A) => Some(Category::ShbA),
            (Expansion::Shadowbringers, Rank::S) => Some(Category::ShbS),
            (Expansion::Stormblood, Rank::A) => Some(Category::SbA),
            (Expansion::Stormblood, Rank::S) => Some(Category::SbS),
            (Expansion::Heavensward, Rank::A) => Some(Category::HwA),
            (Expansion::Heavensward, Rank::S) => Some(Category::HwS),
            (Expansion::ARealmReborn, Rank::A) => Some(Category::ArrA),
            (Expansion::ARealmReborn, Rank::S) => Some(Category::ArrS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ShbA => "shb_a",
            Category::ShbS => "shb_s",
            Category::SbA => "sb_a",
            Category::SbS => "sb_s",
            Category::HwA => "hw_a",
            Category::HwS => "hw_s",
            Category::ArrA => "arr_a",
            Category::ArrS => "arr_s",
            Category::Fate => "fate",
            Category::Trains => "trains",
        }
    }

    /// Whether finds in this category can feed the train heuristic
    pub fn is_train_eligible(&self) -> bool {
        matches!(self, Category::SbA)
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Category::parse(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable definition of a mark or fate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub id: u32,
    pub name: String,
    pub rank: Rank,
    pub zone: String,
    pub region: String,
    pub expansion: Expansion,
    /// Earliest respawn after a death (seconds)
    pub min_spawn_secs: u32,
    /// Respawn is forced after this long (seconds)
    pub max_spawn_secs: u32,
    /// Fate lifetime (seconds); marks have none
    pub duration_secs: Option<u32>,
    pub spawn_trigger: Option<String>,
    pub tips: Option<String>,
}

impl TargetDefinition {
    pub fn is_fate(&self) -> bool {
        self.rank == Rank::F
    }

    /// A and S marks are announced; B marks never are
    pub fn is_notifiable(&self) -> bool {
        matches!(self.rank, Rank::A | Rank::S)
    }

    /// Subscription category of this target
    pub fn category(&self) -> Option<Category> {
        if self.is_fate() {
            return Some(Category::Fate);
        }
        Category::for_mark(self.expansion, self.rank)
    }

    /// Lowercase name used as lookup key
    pub fn key_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Uppercase a command token and fold spaces / dashes into underscores
fn normalize_token(s: &str) -> String {
    s.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_forms() {
        assert_eq!(Category::parse("SB_A").unwrap(), Category::SbA);
        assert_eq!(Category::parse("sb_s").unwrap(), Category::SbS);
        assert_eq!(Category::parse("stormblood_a").unwrap(), Category::SbA);
        assert_eq!(Category::parse("A Realm Reborn S").unwrap(), Category::ArrS);
        assert_eq!(Category::parse("hw-a").unwrap(), Category::HwA);
        assert_eq!(Category::parse("ShB_A").unwrap(), Category::ShbA);
        assert_eq!(Category::parse("fates").unwrap(), Category::Fate);
        assert_eq!(Category::parse("TRAINS").unwrap(), Category::Trains);
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        assert_eq!(
            Category::parse("sb_b"),
            Err(CoreError::UnknownCategory("sb_b".to_string()))
        );
        assert!(Category::parse("endwalker_a").is_err());
        assert!(Category::parse("").is_err());
    }

    #[test]
    fn test_category_round_trips_through_text() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
    }

    #[test]
    fn test_rank_parse() {
        assert_eq!("a".parse::<Rank>().unwrap(), Rank::A);
        assert_eq!("FATE".parse::<Rank>().unwrap(), Rank::F);
        assert!("SS".parse::<Rank>().is_err());
    }

    #[test]
    fn test_b_rank_has_no_category() {
        assert_eq!(Category::for_mark(Expansion::Stormblood, Rank::B), None);
        assert!(Category::SbA.is_train_eligible());
        assert!(!Category::SbS.is_train_eligible());
    }
}

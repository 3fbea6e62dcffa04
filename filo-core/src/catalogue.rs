//! Static mark and fate reference data
//!
//! The catalogue is built once at startup and shared read-only. It is
//! loaded from a JSON dataset keyed by upstream target id:
//!
//! ```json
//! {
//!   "marks": {"6002": {"Name": "Erle", "Rank": "A", "ZoneName": "The Fringes", ...}},
//!   "fates": {"1464": {"Name": "Long Live the Coeurl", "Duration": 1800, ...}}
//! }
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::DEFAULT_FATE_DURATION_SECS;
use crate::error::{CoreError, CoreResult};
use crate::types::{Category, Expansion, Rank, TargetDefinition};

const BUILTIN_DATASET: &str = include_str!("../data/catalogue.json");

/// The Stormblood A-rank sweep, in route order
pub const TRAIN_ROUTE: [&str; 12] = [
    "erle",
    "orcus",
    "vochstein",
    "aqrabuamelu",
    "mahisha",
    "luminare",
    "funa yurei",
    "oni yumemi",
    "gajasura",
    "angada",
    "girimekhala",
    "sum",
];

/// Short names accepted for route targets
pub const ALIASES: [(&str, &str); 9] = [
    ("aqra", "aqrabuamelu"),
    ("voch", "vochstein"),
    ("lumi", "luminare"),
    ("mahi", "mahisha"),
    ("funa", "funa yurei"),
    ("oni", "oni yumemi"),
    ("anga", "angada"),
    ("gaja", "gajasura"),
    ("giri", "girimekhala"),
];

#[derive(Deserialize)]
struct RawCatalogue {
    #[serde(default)]
    marks: HashMap<String, RawMark>,
    #[serde(default)]
    fates: HashMap<String, RawFate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMark {
    name: String,
    rank: String,
    zone_name: String,
    region_name: String,
    expansion: String,
    #[serde(default)]
    min_spawn: u32,
    #[serde(default)]
    max_spawn: u32,
    #[serde(default)]
    spawn_trigger: Option<String>,
    #[serde(default)]
    tips: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFate {
    name: String,
    zone_name: String,
    region_name: String,
    expansion: String,
    #[serde(default)]
    duration: Option<u32>,
}

/// Immutable id and name index over every target definition
#[derive(Debug, Clone)]
pub struct Catalogue {
    targets: BTreeMap<u32, TargetDefinition>,
    by_name: HashMap<String, u32>,
}

impl Catalogue {
    /// The dataset shipped with the crate
    pub fn builtin() -> CoreResult<Self> {
        Self::from_json(BUILTIN_DATASET)
    }

    /// Load a dataset from disk
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Catalogue(format!("{}: {}", path.display(), e)))?;
        let catalogue = Self::from_json(&json)?;
        info!(path = %path.display(), count = catalogue.len(), "Catalogue loaded");
        Ok(catalogue)
    }

    /// Parse and validate a dataset
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let raw: RawCatalogue = serde_json::from_str(json)?;
        let mut definitions = Vec::with_capacity(raw.marks.len() + raw.fates.len());

        for (id, mark) in raw.marks {
            let id = parse_id(&id)?;
            let rank: Rank = mark.rank.parse()?;
            if mark.min_spawn > mark.max_spawn {
                return Err(CoreError::Catalogue(format!(
                    "{}: min spawn {} exceeds max spawn {}",
                    mark.name, mark.min_spawn, mark.max_spawn
                )));
            }
            definitions.push(TargetDefinition {
                id,
                name: mark.name.trim().to_string(),
                rank,
                zone: mark.zone_name,
                region: mark.region_name,
                expansion: parse_expansion(&mark.expansion)?,
                min_spawn_secs: mark.min_spawn,
                max_spawn_secs: mark.max_spawn,
                duration_secs: None,
                spawn_trigger: mark.spawn_trigger,
                tips: mark.tips,
            });
        }

        for (id, fate) in raw.fates {
            definitions.push(TargetDefinition {
                id: parse_id(&id)?,
                name: fate.name.trim().to_string(),
                rank: Rank::F,
                zone: fate.zone_name,
                region: fate.region_name,
                expansion: parse_expansion(&fate.expansion)?,
                min_spawn_secs: 0,
                max_spawn_secs: 0,
                duration_secs: Some(fate.duration.unwrap_or(DEFAULT_FATE_DURATION_SECS)),
                spawn_trigger: None,
                tips: None,
            });
        }

        let mut targets = BTreeMap::new();
        let mut by_name = HashMap::new();
        for def in definitions {
            if def.name.is_empty() {
                return Err(CoreError::Catalogue(format!("target {} has no name", def.id)));
            }
            if by_name.insert(def.key_name(), def.id).is_some() {
                return Err(CoreError::Catalogue(format!("duplicate target name: {}", def.name)));
            }
            if targets.insert(def.id, def).is_some() {
                return Err(CoreError::Catalogue("duplicate target id".to_string()));
            }
        }

        debug!(count = targets.len(), "Catalogue parsed");
        Ok(Self { targets, by_name })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&TargetDefinition> {
        self.targets.get(&id)
    }

    /// Like [`Catalogue::get`], failing with `UnknownTarget`
    pub fn require(&self, id: u32) -> CoreResult<&TargetDefinition> {
        self.get(id)
            .ok_or_else(|| CoreError::UnknownTarget(id.to_string()))
    }

    /// Look up by name or short alias, case-insensitively
    pub fn find_by_name(&self, name: &str) -> Option<&TargetDefinition> {
        let key = name.trim().to_lowercase();
        let key = ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, full)| full.to_string())
            .unwrap_or(key);
        self.by_name.get(&key).and_then(|id| self.targets.get(id))
    }

    /// Resolve a target given its id or its name
    pub fn resolve(&self, name_or_id: &str) -> CoreResult<&TargetDefinition> {
        let token = name_or_id.trim();
        let found = match token.parse::<u32>() {
            Ok(id) => self.get(id),
            Err(_) => self.find_by_name(token),
        };
        found.ok_or_else(|| CoreError::UnknownTarget(token.to_string()))
    }

    /// All definitions ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.targets.values()
    }

    pub fn marks(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.iter().filter(|t| !t.is_fate())
    }

    pub fn fates(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.iter().filter(|t| t.is_fate())
    }

    /// Definitions in a subscription category
    pub fn in_category(&self, category: Category) -> Vec<&TargetDefinition> {
        self.iter()
            .filter(|t| t.category() == Some(category))
            .collect()
    }

    /// Longest respawn window across all marks (seconds)
    pub fn max_spawn_window_secs(&self) -> u32 {
        self.marks().map(|t| t.max_spawn_secs).max().unwrap_or(0)
    }

    /// Route targets present in this catalogue, in route order
    pub fn train_route(&self) -> Vec<&TargetDefinition> {
        TRAIN_ROUTE
            .iter()
            .filter_map(|name| self.find_by_name(name))
            .collect()
    }
}

fn parse_id(id: &str) -> CoreResult<u32> {
    id.trim()
        .parse()
        .map_err(|_| CoreError::Catalogue(format!("invalid target id: {}", id)))
}

fn parse_expansion(s: &str) -> CoreResult<Expansion> {
    Expansion::parse(s).ok_or_else(|| CoreError::Catalogue(format!("unknown expansion: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue_loads() {
        let catalogue = Catalogue::builtin().unwrap();
        assert!(!catalogue.is_empty());
        assert_eq!(catalogue.train_route().len(), TRAIN_ROUTE.len());
        assert!(catalogue.fates().count() >= 3);
    }

    #[test]
    fn test_lookup_by_name_and_alias() {
        let catalogue = Catalogue::builtin().unwrap();

        let erle = catalogue.find_by_name("ERLE").unwrap();
        assert_eq!(erle.zone, "The Fringes");
        assert_eq!(erle.category(), Some(Category::SbA));

        let aqra = catalogue.find_by_name("aqra").unwrap();
        assert_eq!(aqra.name, "Aqrabuamelu");

        assert_eq!(catalogue.resolve(&erle.id.to_string()).unwrap().name, "Erle");
        assert!(matches!(
            catalogue.resolve("Nobody"),
            Err(CoreError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_fates_get_default_duration() {
        let catalogue = Catalogue::builtin().unwrap();
        let steel = catalogue.find_by_name("steel reign").unwrap();
        assert!(steel.is_fate());
        assert_eq!(steel.duration_secs, Some(DEFAULT_FATE_DURATION_SECS));
        assert_eq!(steel.category(), Some(Category::Fate));
    }

    #[test]
    fn test_rejects_bad_datasets() {
        assert!(Catalogue::from_json("not json").is_err());

        let bad_rank = r#"{"marks": {"1": {"Name": "X", "Rank": "Q", "ZoneName": "Z",
            "RegionName": "R", "Expansion": "Stormblood"}}}"#;
        assert!(Catalogue::from_json(bad_rank).is_err());

        let inverted = r#"{"marks": {"1": {"Name": "X", "Rank": "A", "ZoneName": "Z",
            "RegionName": "R", "Expansion": "Stormblood", "MinSpawn": 10, "MaxSpawn": 5}}}"#;
        assert!(Catalogue::from_json(inverted).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogue.json");
        std::fs::write(
            &path,
            r#"{"marks": {"42": {"Name": "Test Mark", "Rank": "A", "ZoneName": "Zone",
                "RegionName": "Region", "Expansion": "SB", "MinSpawn": 60, "MaxSpawn": 120}}}"#,
        )
        .unwrap();

        let catalogue = Catalogue::load(&path).unwrap();
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.max_spawn_window_secs(), 120);

        assert!(Catalogue::load(dir.path().join("missing.json")).is_err());
    }
}

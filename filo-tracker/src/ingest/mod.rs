//! Push report ingest
//!
//! Every push source delivers its own key/value shape. A [`FieldMapping`]
//! names the source's fields, and a [`MappedAdapter`] built from it turns
//! a raw map into a canonical [`Report`] or [`FateReport`]. Sources are
//! selected by name through the [`AdapterRegistry`].

mod relay;

pub use relay::parse_relay_text;

use chrono::{DateTime, TimeZone, Utc};
use filo_core::{
    worlds, Catalogue, Clock, Coords, FateProgress, FateReport, Instance, Rank, Report,
    TargetDefinition,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::IngestConfig;
use crate::error::{TrackerError, TrackerResult};

/// Raw key/value payload as delivered by a push source
pub type RawReport = Map<String, Value>;

/// Field names used by one push source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Source name, used to select the adapter
    pub source: String,
    /// Target id (or name)
    pub id: String,
    /// World id (or name)
    pub world_id: String,
    pub x: String,
    pub y: String,
    /// Optional single field carrying both coordinates
    #[serde(default)]
    pub coords: Option<String>,
    pub last_alive: String,
    pub last_reported: String,
    pub instance: String,
    #[serde(default)]
    pub rank: Option<String>,
    pub progress: String,
    pub time_remaining: String,
    /// Coordinates are raw world positions rather than map flags
    #[serde(default)]
    pub raw_coordinates: bool,
}

impl FieldMapping {
    /// Mapping for the xivhunt webhook
    pub fn xivhunt() -> Self {
        Self {
            source: "xivhunt".to_string(),
            id: "id".to_string(),
            world_id: "wId".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            coords: None,
            last_alive: "lastAlive".to_string(),
            last_reported: "lastReported".to_string(),
            instance: "i".to_string(),
            rank: Some("r".to_string()),
            progress: "progress".to_string(),
            time_remaining: "timeRemaining".to_string(),
            raw_coordinates: true,
        }
    }

    /// Mapping for chat relay messages and canonical JSON posts
    pub fn relay() -> Self {
        Self {
            source: "relay".to_string(),
            id: "target".to_string(),
            world_id: "world".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            coords: Some("coords".to_string()),
            last_alive: "alive".to_string(),
            last_reported: "observedAt".to_string(),
            instance: "instance".to_string(),
            rank: Some("rank".to_string()),
            progress: "progress".to_string(),
            time_remaining: "timeRemaining".to_string(),
            raw_coordinates: false,
        }
    }
}

/// A normalized push report
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedReport {
    Mark(Report),
    Fate(FateReport),
}

/// Turns one source's raw payloads into canonical reports
pub trait ReportAdapter: Send + Sync {
    /// Source name
    fn source(&self) -> &str;

    /// Whether the payload describes a fate rather than a mark
    fn is_fate(&self, raw: &RawReport) -> bool;

    /// Normalize a mark sighting
    fn normalize(&self, raw: &RawReport) -> TrackerResult<Report>;

    /// Normalize a fate progress payload
    fn normalize_progress(&self, raw: &RawReport) -> TrackerResult<FateReport>;

    /// Normalize whichever kind of payload this is
    fn normalize_any(&self, raw: &RawReport) -> TrackerResult<NormalizedReport> {
        if self.is_fate(raw) {
            self.normalize_progress(raw).map(NormalizedReport::Fate)
        } else {
            self.normalize(raw).map(NormalizedReport::Mark)
        }
    }
}

/// Adapter driven by a [`FieldMapping`] table
pub struct MappedAdapter {
    mapping: FieldMapping,
    catalogue: Arc<Catalogue>,
    clock: Arc<dyn Clock>,
}

impl MappedAdapter {
    pub fn new(mapping: FieldMapping, catalogue: Arc<Catalogue>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mapping,
            catalogue,
            clock,
        }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    fn target(&self, raw: &RawReport) -> TrackerResult<&TargetDefinition> {
        let token = text(raw, &self.mapping.id)
            .ok_or_else(|| self.malformed(format!("missing field '{}'", self.mapping.id)))?;
        self.catalogue
            .resolve(&token)
            .map_err(|_| TrackerError::UnknownTarget(token))
    }

    fn world(&self, raw: &RawReport) -> TrackerResult<String> {
        let token = text(raw, &self.mapping.world_id)
            .ok_or_else(|| self.malformed(format!("missing field '{}'", self.mapping.world_id)))?;
        worlds::normalize_world(&token)
            .map(str::to_string)
            .map_err(|e| self.malformed(e.to_string()))
    }

    fn instance(&self, raw: &RawReport) -> TrackerResult<Instance> {
        match field(raw, &self.mapping.instance) {
            None => Ok(Instance::FIRST),
            Some(value) => {
                let n = number(value).ok_or_else(|| self.malformed("instance is not a number"))?;
                Instance::new(n as i64).map_err(|e| self.malformed(e.to_string()))
            }
        }
    }

    fn coords(&self, raw: &RawReport, target: &TargetDefinition) -> TrackerResult<Option<Coords>> {
        let pair = match self.mapping.coords.as_deref().and_then(|name| field(raw, name)) {
            Some(value) => Some(
                parse_pair(value).ok_or_else(|| self.malformed("unreadable coordinates"))?,
            ),
            None => match (field(raw, &self.mapping.x), field(raw, &self.mapping.y)) {
                (Some(x), Some(y)) => Some(
                    number(x)
                        .zip(number(y))
                        .ok_or_else(|| self.malformed("unreadable coordinates"))?,
                ),
                _ => None,
            },
        };

        Ok(pair.map(|(x, y)| {
            if self.mapping.raw_coordinates {
                Coords::from_raw(x, y, target.expansion.coordinate_offset())
            } else {
                Coords::new(x, y)
            }
        }))
    }

    fn observed_at(&self, raw: &RawReport) -> DateTime<Utc> {
        field(raw, &self.mapping.last_reported)
            .and_then(parse_timestamp)
            .unwrap_or_else(|| self.clock.now())
    }

    fn alive(&self, raw: &RawReport) -> TrackerResult<bool> {
        match field(raw, &self.mapping.last_alive) {
            None => Ok(true),
            Some(value) => parse_bool(value).ok_or_else(|| self.malformed("unreadable alive flag")),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> TrackerError {
        TrackerError::MalformedReport(format!("{}: {}", self.mapping.source, message.into()))
    }
}

impl ReportAdapter for MappedAdapter {
    fn source(&self) -> &str {
        &self.mapping.source
    }

    fn is_fate(&self, raw: &RawReport) -> bool {
        self.target(raw).map(|t| t.is_fate()).unwrap_or(false)
    }

    fn normalize(&self, raw: &RawReport) -> TrackerResult<Report> {
        let target = self.target(raw)?;
        let report = Report {
            world: self.world(raw)?,
            target_id: target.id,
            instance: self.instance(raw)?,
            alive: self.alive(raw)?,
            coords: self.coords(raw, target)?,
            observed_at: self.observed_at(raw),
            rank_hint: self
                .mapping
                .rank
                .as_deref()
                .and_then(|name| text(raw, name))
                .and_then(|r| r.parse::<Rank>().ok()),
            source: self.mapping.source.clone(),
        };
        debug!(
            source = %report.source,
            world = %report.world,
            target = %target.name,
            instance = %report.instance,
            "Report normalized"
        );
        Ok(report)
    }

    fn normalize_progress(&self, raw: &RawReport) -> TrackerResult<FateReport> {
        let target = self.target(raw)?;
        if !target.is_fate() {
            return Err(self.malformed(format!("{} is not a fate", target.name)));
        }

        let progress = if self.alive(raw)? {
            let value = field(raw, &self.mapping.progress)
                .ok_or_else(|| self.malformed(format!("missing field '{}'", self.mapping.progress)))?;
            let percent = number(value).ok_or_else(|| self.malformed("progress is not a number"))?;
            Some(FateProgress {
                progress: percent.clamp(0.0, 100.0).round() as u8,
                time_remaining_secs: field(raw, &self.mapping.time_remaining)
                    .and_then(number)
                    .filter(|s| *s >= 0.0)
                    .map(|s| s as u32),
                coords: self.coords(raw, target)?,
                observed_at: self.observed_at(raw),
            })
        } else {
            None
        };

        Ok(FateReport {
            world: self.world(raw)?,
            fate_id: target.id,
            instance: self.instance(raw)?,
            progress,
            source: self.mapping.source.clone(),
        })
    }
}

/// Configured adapters by source name
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ReportAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`MappedAdapter`] per configured mapping
    pub fn from_config(config: &IngestConfig, catalogue: Arc<Catalogue>, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::new();
        for mapping in &config.mappings {
            registry.register(Arc::new(MappedAdapter::new(
                mapping.clone(),
                catalogue.clone(),
                clock.clone(),
            )));
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ReportAdapter>) {
        self.adapters.insert(adapter.source().to_lowercase(), adapter);
    }

    pub fn get(&self, source: &str) -> Option<Arc<dyn ReportAdapter>> {
        self.adapters.get(&source.to_lowercase()).cloned()
    }

    /// Source names, sorted
    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Normalize a payload from the named source
    pub fn normalize(&self, source: &str, raw: &RawReport) -> TrackerResult<NormalizedReport> {
        let adapter = self
            .get(source)
            .ok_or_else(|| TrackerError::MalformedReport(format!("unknown report source: {}", source)))?;
        adapter.normalize_any(raw)
    }
}

/// Non-empty field value
fn field<'a>(raw: &'a RawReport, name: &str) -> Option<&'a Value> {
    raw.get(name).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// Field value as trimmed text
fn text(raw: &RawReport, name: &str) -> Option<String> {
    field(raw, name).and_then(|v| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts JSON booleans, `"True"`/`"true"`/`"1"` and their negatives
fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts `[x, y]`, `{"x": .., "y": ..}` and `"x, y"` / `"(x, y)"`
fn parse_pair(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(items) if items.len() == 2 => number(&items[0]).zip(number(&items[1])),
        Value::Object(map) => map.get("x").and_then(number).zip(map.get("y").and_then(number)),
        Value::String(s) => {
            let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
            let (x, y) = inner.split_once(',')?;
            x.trim().parse().ok().zip(y.trim().parse().ok())
        }
        _ => None,
    }
}

/// Unix seconds, Unix milliseconds or RFC 3339
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(n) = number(value) {
        let n = n as i64;
        return if n > 100_000_000_000 {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
    }
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filo_core::ManualClock;
    use serde_json::json;

    fn registry() -> (AdapterRegistry, Arc<Catalogue>) {
        let catalogue = Arc::new(Catalogue::builtin().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let registry = AdapterRegistry::from_config(&IngestConfig::default(), catalogue.clone(), clock);
        (registry, catalogue)
    }

    fn raw(value: Value) -> RawReport {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_xivhunt_payload() {
        let (registry, catalogue) = registry();
        let erle = catalogue.find_by_name("erle").unwrap();

        let payload = raw(json!({
            "id": erle.id.to_string(),
            "wId": "37",
            "x": "0",
            "y": "100",
            "lastAlive": "True",
            "lastReported": "1571000000",
            "i": "0",
            "r": "A"
        }));

        let NormalizedReport::Mark(report) = registry.normalize("xivhunt", &payload).unwrap() else {
            panic!("expected a mark report");
        };
        assert_eq!(report.world, "Mateus");
        assert_eq!(report.target_id, erle.id);
        assert_eq!(report.instance, Instance::FIRST);
        assert!(report.alive);
        assert_eq!(report.coords, Some(Coords::new(21.5, 23.5)));
        assert_eq!(report.observed_at.timestamp(), 1_571_000_000);
        assert_eq!(report.rank_hint, Some(Rank::A));
    }

    #[test]
    fn test_relay_coordinate_forms() {
        let (registry, _) = registry();
        let forms = [
            json!({"target": "Erle", "world": "Mateus", "coords": [10.0, 12.5]}),
            json!({"target": "Erle", "world": "Mateus", "coords": {"x": 10.0, "y": 12.5}}),
            json!({"target": "Erle", "world": "Mateus", "coords": "(10, 12.5)"}),
            json!({"target": "Erle", "world": "Mateus", "x": "10", "y": 12.5}),
        ];

        for form in forms {
            let adapter = registry.get("relay").unwrap();
            let report = adapter.normalize(&raw(form)).unwrap();
            assert_eq!(report.coords, Some(Coords::new(10.0, 12.5)));
        }
    }

    #[test]
    fn test_dead_flag_and_missing_coords() {
        let (registry, _) = registry();
        let adapter = registry.get("relay").unwrap();

        let report = adapter
            .normalize(&raw(json!({"target": "orcus", "world": "zalera", "alive": false, "instance": 2})))
            .unwrap();
        assert!(!report.alive);
        assert_eq!(report.coords, None);
        assert_eq!(report.instance.get(), 2);
        assert_eq!(report.world, "Zalera");
    }

    #[test]
    fn test_malformed_payloads() {
        let (registry, _) = registry();
        let adapter = registry.get("relay").unwrap();

        let missing_world = adapter.normalize(&raw(json!({"target": "Erle"})));
        assert!(matches!(missing_world, Err(TrackerError::MalformedReport(_))));

        let bad_world = adapter.normalize(&raw(json!({"target": "Erle", "world": "Atlantis"})));
        assert!(matches!(bad_world, Err(TrackerError::MalformedReport(_))));

        let bad_instance =
            adapter.normalize(&raw(json!({"target": "Erle", "world": "Mateus", "instance": 9})));
        assert!(matches!(bad_instance, Err(TrackerError::MalformedReport(_))));

        let bad_coords =
            adapter.normalize(&raw(json!({"target": "Erle", "world": "Mateus", "coords": "here"})));
        assert!(matches!(bad_coords, Err(TrackerError::MalformedReport(_))));

        let unknown = adapter.normalize(&raw(json!({"target": "Nobody", "world": "Mateus"})));
        assert!(matches!(unknown, Err(TrackerError::UnknownTarget(_))));

        let source = registry.normalize("carrier-pigeon", &raw(json!({})));
        assert!(matches!(source, Err(TrackerError::MalformedReport(_))));
    }

    #[test]
    fn test_fate_payload_is_routed_to_progress() {
        let (registry, catalogue) = registry();
        let coeurl = catalogue.find_by_name("long live the coeurl").unwrap();

        let payload = raw(json!({
            "target": "Long Live the Coeurl",
            "world": "Mateus",
            "progress": "42",
            "timeRemaining": 600
        }));
        let NormalizedReport::Fate(report) = registry.normalize("relay", &payload).unwrap() else {
            panic!("expected a fate report");
        };
        assert_eq!(report.fate_id, coeurl.id);
        let progress = report.progress.unwrap();
        assert_eq!(progress.progress, 42);
        assert_eq!(progress.time_remaining_secs, Some(600));

        let ended = raw(json!({"target": "Long Live the Coeurl", "world": "Mateus", "alive": "false"}));
        let NormalizedReport::Fate(report) = registry.normalize("relay", &ended).unwrap() else {
            panic!("expected a fate report");
        };
        assert!(report.progress.is_none());
    }

    #[test]
    fn test_parse_bool_forms() {
        assert_eq!(parse_bool(&json!("True")), Some(true));
        assert_eq!(parse_bool(&json!("1")), Some(true));
        assert_eq!(parse_bool(&json!(false)), Some(false));
        assert_eq!(parse_bool(&json!("maybe")), None);
    }
}

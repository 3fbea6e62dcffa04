//! Notification text
//!
//! Plain renderings of tracker events. Chat platforms may style them
//! however they like; only the content and field set are fixed here.

use chrono::{DateTime, Utc};
use filo_core::{format_duration, AuthoritativeStatus, Coords, FateProgress, HuntStatus, InstanceKey, TargetDefinition};

use crate::sink::{Notification, RichPayload};

const COLOR_FOUND: u32 = 0x7C_B5_18;
const COLOR_OPEN: u32 = 0x2E_86_AB;
const COLOR_MAXED: u32 = 0xF2_A5_41;
const COLOR_DEAD: u32 = 0xC7_3E_1D;
const COLOR_FATE: u32 = 0x9B_5D_E5;

fn location(target: &TargetDefinition, key: &InstanceKey) -> String {
    if key.instance.get() > 1 {
        format!("{} (instance {}), {}", target.zone, key.instance, key.world)
    } else {
        format!("{}, {}", target.zone, key.world)
    }
}

fn time_of_day(at: DateTime<Utc>) -> String {
    at.format("%H:%M UTC").to_string()
}

/// Mark found by a push source
pub fn find(
    target: &TargetDefinition,
    key: &InstanceKey,
    coords: Option<Coords>,
    train: bool,
) -> Notification {
    let mut content = format!("Rank {}: {} found in {}", target.rank, target.name, location(target, key));
    if let Some(coords) = coords {
        content.push_str(&format!(" at {}", coords));
    }
    if train {
        content.push_str(" (train in progress)");
    }

    let mut rich = RichPayload::new(format!("Rank {}: {}", target.rank, target.name))
        .description(location(target, key))
        .color(COLOR_FOUND);
    if let Some(coords) = coords {
        rich = rich.field("Coordinates", coords.to_string());
    }
    if let Some(tips) = &target.tips {
        rich = rich.field("Tips", tips.clone());
    }
    Notification::new(content).with_rich(rich)
}

/// Authoritative status change
pub fn status_change(target: &TargetDefinition, key: &InstanceKey, status: &AuthoritativeStatus) -> Notification {
    let (verb, color) = match status.status {
        HuntStatus::Opened => ("is now open", COLOR_OPEN),
        HuntStatus::Maxed => ("has reached its maximum spawn window", COLOR_MAXED),
        HuntStatus::Died => ("has died", COLOR_DEAD),
        HuntStatus::Closed => ("is closed", COLOR_DEAD),
    };
    let content = format!("Rank {}: {} {} on {}", target.rank, target.name, verb, location(target, key));

    let mut rich = RichPayload::new(format!("Rank {}: {}", target.rank, target.name))
        .description(location(target, key))
        .field("Status", status.status.to_string())
        .color(color);
    if let Some(trigger) = &target.spawn_trigger {
        rich = rich.field("Spawn trigger", trigger.clone());
    }
    if let Some(by) = &status.last_attempt_by {
        rich = rich.field("Last attempt by", by.clone());
    }
    Notification::new(content).with_rich(rich)
}

/// Death with no find on record
pub fn death(target: &TargetDefinition, key: &InstanceKey, died_at: DateTime<Utc>) -> Notification {
    let content = format!(
        "Rank {}: {} was killed on {} at {}",
        target.rank,
        target.name,
        location(target, key),
        time_of_day(died_at)
    );
    Notification::new(content).with_rich(
        RichPayload::new(format!("Rank {}: {}", target.rank, target.name))
            .description(location(target, key))
            .field("Killed", time_of_day(died_at))
            .color(COLOR_DEAD),
    )
}

/// Rewrite of a find notification once the target died
pub fn death_edit(
    target: &TargetDefinition,
    key: &InstanceKey,
    found_at: DateTime<Utc>,
    died_at: DateTime<Utc>,
) -> Notification {
    let alive_for = format_duration((died_at - found_at).num_seconds());
    let content = format!(
        "~~Rank {}: {} found in {}~~ killed at {} after {}",
        target.rank,
        target.name,
        location(target, key),
        time_of_day(died_at),
        alive_for
    );
    Notification::new(content).with_rich(
        RichPayload::new(format!("~~Rank {}: {}~~", target.rank, target.name))
            .description(location(target, key))
            .field("Killed", time_of_day(died_at))
            .field("Time alive", alive_for)
            .color(COLOR_DEAD),
    )
}

/// Running fate progress
pub fn fate_progress(target: &TargetDefinition, key: &InstanceKey, progress: &FateProgress) -> Notification {
    let mut content = format!("FATE: {} in {} is at {}%", target.name, location(target, key), progress.progress);
    let mut rich = RichPayload::new(format!("FATE: {}", target.name))
        .description(location(target, key))
        .field("Progress", format!("{}%", progress.progress))
        .color(COLOR_FATE);
    if let Some(remaining) = progress.time_remaining_secs {
        let remaining = format_duration(remaining as i64);
        content.push_str(&format!(", {} remaining", remaining));
        rich = rich.field("Time remaining", remaining);
    }
    if let Some(coords) = progress.coords {
        rich = rich.field("Coordinates", coords.to_string());
    }
    Notification::new(content).with_rich(rich)
}

/// Fate completed or expired
pub fn fate_closed(target: &TargetDefinition, key: &InstanceKey, completed: bool) -> Notification {
    let outcome = if completed { "completed" } else { "ended" };
    Notification::new(format!("~~FATE: {} in {}~~ {}", target.name, location(target, key), outcome)).with_rich(
        RichPayload::new(format!("~~FATE: {}~~", target.name))
            .description(location(target, key))
            .field("Status", outcome)
            .color(COLOR_DEAD),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use filo_core::{Catalogue, Instance};

    #[test]
    fn test_find_text() {
        let catalogue = Catalogue::builtin().unwrap();
        let erle = catalogue.find_by_name("erle").unwrap();
        let key = InstanceKey::new("Mateus", erle.id, Instance::FIRST);

        let n = find(erle, &key, Some(Coords::new(10.0, 10.0)), false);
        assert_eq!(n.content, "Rank A: Erle found in The Fringes, Mateus at (10.0, 10.0)");

        let key2 = InstanceKey::new("Mateus", erle.id, Instance::new(2).unwrap());
        let n = find(erle, &key2, None, true);
        assert!(n.content.contains("(instance 2)"));
        assert!(n.content.ends_with("(train in progress)"));
    }

    #[test]
    fn test_death_edit_reports_time_alive() {
        let catalogue = Catalogue::builtin().unwrap();
        let erle = catalogue.find_by_name("erle").unwrap();
        let key = InstanceKey::new("Mateus", erle.id, Instance::FIRST);
        let found = Utc::now();

        let n = death_edit(erle, &key, found, found + Duration::seconds(125));
        assert!(n.content.starts_with("~~Rank A: Erle"));
        assert!(n.content.ends_with("after 2 minutes, 5 seconds"));
    }
}

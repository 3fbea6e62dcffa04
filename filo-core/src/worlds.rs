//! World and datacenter table

use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// A game world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct World {
    pub name: &'static str,
    /// Numeric id used by push report sources
    pub id: u16,
    pub datacenter: &'static str,
}

const fn world(name: &'static str, id: u16, datacenter: &'static str) -> World {
    World {
        name,
        id,
        datacenter,
    }
}

/// Every supported world, grouped by datacenter
pub const WORLDS: &[World] = &[
    // Aether (NA)
    world("Adamantoise", 73, "Aether"),
    world("Cactuar", 79, "Aether"),
    world("Faerie", 54, "Aether"),
    world("Gilgamesh", 63, "Aether"),
    world("Jenova", 40, "Aether"),
    world("Midgardsormr", 65, "Aether"),
    world("Sargatanas", 99, "Aether"),
    world("Siren", 57, "Aether"),
    // Primal (NA)
    world("Behemoth", 78, "Primal"),
    world("Excalibur", 93, "Primal"),
    world("Exodus", 53, "Primal"),
    world("Famfrit", 35, "Primal"),
    world("Hyperion", 95, "Primal"),
    world("Lamia", 55, "Primal"),
    world("Leviathan", 64, "Primal"),
    world("Ultros", 77, "Primal"),
    // Crystal (NA)
    world("Balmung", 91, "Crystal"),
    world("Brynhildr", 34, "Crystal"),
    world("Coeurl", 74, "Crystal"),
    world("Diabolos", 62, "Crystal"),
    world("Goblin", 81, "Crystal"),
    world("Malboro", 75, "Crystal"),
    world("Mateus", 37, "Crystal"),
    world("Zalera", 41, "Crystal"),
    // Chaos (EU)
    world("Cerberus", 80, "Chaos"),
    world("Louisoix", 83, "Chaos"),
    world("Moogle", 71, "Chaos"),
    world("Omega", 39, "Chaos"),
    world("Ragnarok", 97, "Chaos"),
    world("Spriggan", 85, "Chaos"),
    // Light (EU)
    world("Lich", 36, "Light"),
    world("Odin", 66, "Light"),
    world("Phoenix", 56, "Light"),
    world("Shiva", 67, "Light"),
    world("Twintania", 33, "Light"),
    world("Zodiark", 42, "Light"),
    // Elemental (JP)
    world("Aegis", 90, "Elemental"),
    world("Atomos", 68, "Elemental"),
    world("Carbuncle", 45, "Elemental"),
    world("Garuda", 58, "Elemental"),
    world("Gungnir", 94, "Elemental"),
    world("Kujata", 49, "Elemental"),
    world("Ramuh", 60, "Elemental"),
    world("Tonberry", 72, "Elemental"),
    world("Typhon", 50, "Elemental"),
    world("Unicorn", 30, "Elemental"),
    // Gaia (JP)
    world("Alexander", 43, "Gaia"),
    world("Bahamut", 69, "Gaia"),
    world("Durandal", 92, "Gaia"),
    world("Fenrir", 46, "Gaia"),
    world("Ifrit", 59, "Gaia"),
    world("Ridill", 98, "Gaia"),
    world("Tiamat", 76, "Gaia"),
    world("Ultima", 51, "Gaia"),
    world("Valefor", 52, "Gaia"),
    world("Yojimbo", 31, "Gaia"),
    world("Zeromus", 32, "Gaia"),
    // Mana (JP)
    world("Anima", 44, "Mana"),
    world("Asura", 23, "Mana"),
    world("Belias", 24, "Mana"),
    world("Chocobo", 70, "Mana"),
    world("Hades", 47, "Mana"),
    world("Ixion", 48, "Mana"),
    world("Mandragora", 82, "Mana"),
    world("Masamune", 96, "Mana"),
    world("Pandaemonium", 28, "Mana"),
    world("Shinryu", 29, "Mana"),
    world("Titan", 61, "Mana"),
];

/// Look up a world by name, case-insensitively
pub fn find_world(name: &str) -> Option<&'static World> {
    let name = name.trim();
    WORLDS.iter().find(|w| w.name.eq_ignore_ascii_case(name))
}

/// Look up a world by numeric id
pub fn find_world_by_id(id: u16) -> Option<&'static World> {
    WORLDS.iter().find(|w| w.id == id)
}

/// Resolve a world given either its name or its numeric id
pub fn resolve_world(name_or_id: &str) -> CoreResult<&'static World> {
    let token = name_or_id.trim();
    let found = match token.parse::<u16>() {
        Ok(id) => find_world_by_id(id),
        Err(_) => find_world(token),
    };
    found.ok_or_else(|| CoreError::UnknownWorld(token.to_string()))
}

/// Canonical world name, or `UnknownWorld`
pub fn normalize_world(name: &str) -> CoreResult<&'static str> {
    resolve_world(name).map(|w| w.name)
}

/// Datacenter names in table order
pub fn datacenters() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for w in WORLDS {
        if !names.contains(&w.datacenter) {
            names.push(w.datacenter);
        }
    }
    names
}

/// Canonical datacenter name, case-insensitively
pub fn find_datacenter(name: &str) -> CoreResult<&'static str> {
    let name = name.trim();
    WORLDS
        .iter()
        .map(|w| w.datacenter)
        .find(|dc| dc.eq_ignore_ascii_case(name))
        .ok_or_else(|| CoreError::UnknownDatacenter(name.to_string()))
}

/// Worlds belonging to a datacenter
pub fn worlds_in(datacenter: &str) -> CoreResult<Vec<&'static str>> {
    let dc = find_datacenter(datacenter)?;
    Ok(WORLDS
        .iter()
        .filter(|w| w.datacenter == dc)
        .map(|w| w.name)
        .collect())
}

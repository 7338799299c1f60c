//! Seed data loaders for data-driven content initialization
//!
//! Content lives in one JSON array per collection under `data/seeds/`
//! (`quests.json`, `dialogue.json`, ...). Missing files are skipped so a
//! partial seed directory can top up a store. The same starter files are
//! embedded in the binary for `codyssey init`.

use crate::content::errors::StoreError;
use crate::content::types::ContentBundle;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub const QUESTS_FILE: &str = "quests.json";
pub const SUBQUESTS_FILE: &str = "subquests.json";
pub const LOCATIONS_FILE: &str = "locations.json";
pub const POSITIONS_FILE: &str = "positions.json";
pub const ACTIONS_FILE: &str = "actions.json";
pub const DIALOGUE_FILE: &str = "dialogue.json";
pub const CHOICES_FILE: &str = "choices.json";
pub const ITEMS_FILE: &str = "items.json";
pub const PACKAGES_FILE: &str = "packages.json";
pub const PACKAGE_DETAILS_FILE: &str = "package_details.json";

fn parse_seed<T: DeserializeOwned>(name: &str, contents: &str) -> Result<Vec<T>, StoreError> {
    serde_json::from_str(contents).map_err(|e| {
        error!("Failed to parse seed file {}: {}", name, e);
        StoreError::Json(e)
    })
}

fn load_seed_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>, StoreError> {
    let path = dir.join(name);
    if !path.exists() {
        debug!("Seed file {} not present, skipping", path.display());
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(&path)?;
    parse_seed(&path.display().to_string(), &contents)
}

/// Load every collection file found in `dir`.
pub fn load_content_from_dir<P: AsRef<Path>>(dir: P) -> Result<ContentBundle, StoreError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(StoreError::NotFound(format!("seed directory: {}", dir.display())));
    }
    let bundle = ContentBundle {
        quests: load_seed_file(dir, QUESTS_FILE)?,
        subquests: load_seed_file(dir, SUBQUESTS_FILE)?,
        locations: load_seed_file(dir, LOCATIONS_FILE)?,
        positions: load_seed_file(dir, POSITIONS_FILE)?,
        actions: load_seed_file(dir, ACTIONS_FILE)?,
        dialogues: load_seed_file(dir, DIALOGUE_FILE)?,
        choices: load_seed_file(dir, CHOICES_FILE)?,
        items: load_seed_file(dir, ITEMS_FILE)?,
        packages: load_seed_file(dir, PACKAGES_FILE)?,
        package_details: load_seed_file(dir, PACKAGE_DETAILS_FILE)?,
    };
    for problem in check_references(&bundle) {
        warn!("Seed content: {}", problem);
    }
    Ok(bundle)
}

/// The starter world shipped with the binary.
pub fn starter_content() -> Result<ContentBundle, StoreError> {
    Ok(ContentBundle {
        quests: parse_seed(QUESTS_FILE, include_str!("../../data/seeds/quests.json"))?,
        subquests: parse_seed(SUBQUESTS_FILE, include_str!("../../data/seeds/subquests.json"))?,
        locations: parse_seed(LOCATIONS_FILE, include_str!("../../data/seeds/locations.json"))?,
        positions: parse_seed(POSITIONS_FILE, include_str!("../../data/seeds/positions.json"))?,
        actions: parse_seed(ACTIONS_FILE, include_str!("../../data/seeds/actions.json"))?,
        dialogues: parse_seed(DIALOGUE_FILE, include_str!("../../data/seeds/dialogue.json"))?,
        choices: parse_seed(CHOICES_FILE, include_str!("../../data/seeds/choices.json"))?,
        items: parse_seed(ITEMS_FILE, include_str!("../../data/seeds/items.json"))?,
        packages: parse_seed(PACKAGES_FILE, include_str!("../../data/seeds/packages.json"))?,
        package_details: parse_seed(
            PACKAGE_DETAILS_FILE,
            include_str!("../../data/seeds/package_details.json"),
        )?,
    })
}

/// Dangling references in a bundle. Nothing enforces these at runtime; the
/// loaders report them so content authors notice.
pub fn check_references(bundle: &ContentBundle) -> Vec<String> {
    use std::collections::HashSet;
    let quests: HashSet<u32> = bundle.quests.iter().map(|q| q.quest_id).collect();
    let subquests: HashSet<u32> = bundle.subquests.iter().map(|s| s.subquest_id).collect();
    let locations: HashSet<u32> = bundle.locations.iter().map(|l| l.location_id).collect();
    let positions: HashSet<u32> = bundle.positions.iter().map(|p| p.position_id).collect();
    let actions: HashSet<u32> = bundle.actions.iter().map(|a| a.action_id).collect();
    let dialogues: HashSet<u32> = bundle.dialogues.iter().map(|d| d.dialogue_id).collect();
    let items: HashSet<u32> = bundle.items.iter().map(|i| i.item_id).collect();
    let packages: HashSet<u32> = bundle.packages.iter().map(|p| p.package_id).collect();

    let mut problems = Vec::new();
    for sub in &bundle.subquests {
        if !quests.contains(&sub.quest_id) {
            problems.push(format!("subquest {} -> missing quest {}", sub.subquest_id, sub.quest_id));
        }
    }
    for pos in &bundle.positions {
        if !locations.contains(&pos.location_id) {
            problems.push(format!("position {} -> missing location {}", pos.position_id, pos.location_id));
        }
        if let Some(target) = pos.door_to {
            if !locations.contains(&target) {
                problems.push(format!("door {} -> missing location {}", pos.position_id, target));
            }
        }
    }
    for d in &bundle.dialogues {
        if let Some(p) = d.position_id.filter(|p| !positions.contains(p)) {
            problems.push(format!("dialogue {} -> missing position {}", d.dialogue_id, p));
        }
        if let Some(s) = d.subquest_id.filter(|s| !subquests.contains(s)) {
            problems.push(format!("dialogue {} -> missing subquest {}", d.dialogue_id, s));
        }
        if let Some(a) = d.action_id.filter(|a| !actions.contains(a)) {
            problems.push(format!("dialogue {} -> missing action {}", d.dialogue_id, a));
        }
        if let Some(p) = d.package_id.filter(|p| !packages.contains(p)) {
            problems.push(format!("dialogue {} -> missing package {}", d.dialogue_id, p));
        }
    }
    for c in &bundle.choices {
        if !dialogues.contains(&c.dialogue_id) {
            problems.push(format!("choice {} -> missing dialogue {}", c.choice_id, c.dialogue_id));
        }
        if let Some(p) = c.package_id.filter(|p| !packages.contains(p)) {
            problems.push(format!("choice {} -> missing package {}", c.choice_id, p));
        }
    }
    for detail in &bundle.package_details {
        if !packages.contains(&detail.package_id) {
            problems.push(format!("package_detail -> missing package {}", detail.package_id));
        }
        if !items.contains(&detail.item_id) {
            problems.push(format!(
                "package_detail {} -> missing item {}",
                detail.package_id, detail.item_id
            ));
        }
    }
    problems
}

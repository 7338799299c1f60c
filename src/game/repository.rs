use std::collections::BTreeMap;
use std::ops::Bound;

use crate::content::{
    ActionRecord, ChoiceRecord, ContentBundle, DialogueRecord, ItemRecord, LocationRecord,
    PackageDetailRecord, PackageRecord, PositionRecord, QuestRecord, SubquestRecord,
};

/// Read-only snapshot of the content tables, indexed for the lookups a scene
/// and its dialogues make. Built once per scene and shared behind an `Arc`.
/// Every lookup returns `Option` so dangling references degrade to "nothing
/// there" instead of a panic.
#[derive(Debug, Default)]
pub struct ContentRepository {
    quests: BTreeMap<u32, QuestRecord>,
    subquests: BTreeMap<u32, SubquestRecord>,
    locations: BTreeMap<u32, LocationRecord>,
    positions: BTreeMap<u32, PositionRecord>,
    actions: BTreeMap<u32, ActionRecord>,
    dialogues: BTreeMap<u32, DialogueRecord>,
    choices: BTreeMap<u32, Vec<ChoiceRecord>>,
    items: BTreeMap<u32, ItemRecord>,
    packages: BTreeMap<u32, PackageRecord>,
    package_details: BTreeMap<u32, Vec<PackageDetailRecord>>,
}

impl ContentRepository {
    pub fn from_bundle(bundle: ContentBundle) -> Self {
        let mut choices: BTreeMap<u32, Vec<ChoiceRecord>> = BTreeMap::new();
        for choice in bundle.choices {
            choices.entry(choice.dialogue_id).or_default().push(choice);
        }
        for list in choices.values_mut() {
            list.sort_by_key(|c| c.choice_id);
        }

        let mut package_details: BTreeMap<u32, Vec<PackageDetailRecord>> = BTreeMap::new();
        for detail in bundle.package_details {
            package_details.entry(detail.package_id).or_default().push(detail);
        }
        for list in package_details.values_mut() {
            list.sort_by_key(|d| d.item_id);
        }

        Self {
            quests: bundle.quests.into_iter().map(|r| (r.quest_id, r)).collect(),
            subquests: bundle.subquests.into_iter().map(|r| (r.subquest_id, r)).collect(),
            locations: bundle.locations.into_iter().map(|r| (r.location_id, r)).collect(),
            positions: bundle.positions.into_iter().map(|r| (r.position_id, r)).collect(),
            actions: bundle.actions.into_iter().map(|r| (r.action_id, r)).collect(),
            dialogues: bundle.dialogues.into_iter().map(|r| (r.dialogue_id, r)).collect(),
            choices,
            items: bundle.items.into_iter().map(|r| (r.item_id, r)).collect(),
            packages: bundle.packages.into_iter().map(|r| (r.package_id, r)).collect(),
            package_details,
        }
    }

    pub fn quest(&self, id: u32) -> Option<&QuestRecord> {
        self.quests.get(&id)
    }

    pub fn subquest(&self, id: u32) -> Option<&SubquestRecord> {
        self.subquests.get(&id)
    }

    pub fn quest_of(&self, subquest_id: u32) -> Option<&QuestRecord> {
        self.subquest(subquest_id).and_then(|s| self.quest(s.quest_id))
    }

    /// The subquest with the smallest id greater than `subquest_id`.
    pub fn next_subquest(&self, subquest_id: u32) -> Option<&SubquestRecord> {
        self.subquests
            .range((Bound::Excluded(subquest_id), Bound::Unbounded))
            .next()
            .map(|(_, s)| s)
    }

    pub fn location(&self, id: u32) -> Option<&LocationRecord> {
        self.locations.get(&id)
    }

    pub fn position(&self, id: u32) -> Option<&PositionRecord> {
        self.positions.get(&id)
    }

    pub fn positions_in(&self, location_id: u32) -> impl Iterator<Item = &PositionRecord> {
        self.positions
            .values()
            .filter(move |p| p.location_id == location_id)
    }

    pub fn action(&self, id: u32) -> Option<&ActionRecord> {
        self.actions.get(&id)
    }

    pub fn dialogue(&self, id: u32) -> Option<&DialogueRecord> {
        self.dialogues.get(&id)
    }

    pub fn choices_for(&self, dialogue_id: u32) -> &[ChoiceRecord] {
        self.choices
            .get(&dialogue_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn item(&self, id: u32) -> Option<&ItemRecord> {
        self.items.get(&id)
    }

    pub fn package(&self, id: u32) -> Option<&PackageRecord> {
        self.packages.get(&id)
    }

    /// Deltas of a package in item order.
    pub fn package_details(&self, package_id: u32) -> &[PackageDetailRecord] {
        self.package_details
            .get(&package_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dialogue ids an NPC at `position_id` speaks while `active` is the
    /// current subquest: its lines for that subquest plus its ungated lines.
    pub fn npc_chain(&self, position_id: u32, active: Option<u32>) -> Vec<u32> {
        self.dialogues
            .values()
            .filter(|d| d.position_id == Some(position_id))
            .filter(|d| d.subquest_id.is_none() || d.subquest_id == active)
            .map(|d| d.dialogue_id)
            .collect()
    }

    /// Narrator lines (no position) for a subquest.
    pub fn narrator_chain(&self, subquest_id: u32) -> Vec<u32> {
        self.dialogues
            .values()
            .filter(|d| d.is_narration() && d.subquest_id == Some(subquest_id))
            .map(|d| d.dialogue_id)
            .collect()
    }

    pub fn item_name(&self, item_id: u32) -> &str {
        self.item(item_id)
            .map(|i| i.name.as_str())
            .unwrap_or("Unknown item")
    }
}

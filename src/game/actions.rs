//! NPC placement and the action commands dialogue lines can carry.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::content::ActionRecord;
use crate::game::repository::ContentRepository;

/// A dialogue side effect on NPC placement.
#[derive(Debug, Clone, PartialEq)]
pub enum NpcAction {
    /// Walk an NPC to a position.
    Move { tag: String, position_id: u32 },
    /// Place a new NPC at a position.
    Spawn { tag: String, position_id: u32 },
    Remove { tag: String },
    /// Walk an NPC to a position, then take it off the map.
    MoveRemove { tag: String, position_id: u32 },
    /// Anything else is carried along and ignored.
    Unknown(String),
}

impl NpcAction {
    pub fn from_record(record: &ActionRecord) -> Self {
        let tag = record.tag.clone();
        match (record.action_type.as_str(), record.position_id) {
            ("move", Some(position_id)) => NpcAction::Move { tag, position_id },
            ("spawn", Some(position_id)) => NpcAction::Spawn { tag, position_id },
            ("remove", _) => NpcAction::Remove { tag },
            ("move_remove", Some(position_id)) => NpcAction::MoveRemove { tag, position_id },
            (other, _) => NpcAction::Unknown(other.to_string()),
        }
    }
}

/// What an action changed, for the front end to narrate.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    None,
    Moved { tag: String, x: f32, y: f32 },
    Spawned { tag: String, x: f32, y: f32 },
    Removed { tag: String },
    WalkedOff { tag: String, x: f32, y: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub tag: String,
    pub x: f32,
    pub y: f32,
    /// The position it was spawned from; its dialogue chain is keyed by it.
    /// `None` for NPCs placed by a `spawn` action.
    pub home_position: Option<u32>,
}

/// NPCs currently standing in one location.
#[derive(Debug, Default)]
pub struct NpcPlacements {
    location_id: u32,
    npcs: BTreeMap<String, Npc>,
    /// Tags removed by an action; they stay gone until the location is re-entered.
    dismissed: HashSet<String>,
}

impl NpcPlacements {
    pub fn new(location_id: u32) -> Self {
        Self {
            location_id,
            ..Self::default()
        }
    }

    pub fn location_id(&self) -> u32 {
        self.location_id
    }

    pub fn get(&self, tag: &str) -> Option<&Npc> {
        self.npcs.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }

    /// Start over in another location.
    pub fn reset(&mut self, location_id: u32) {
        self.location_id = location_id;
        self.npcs.clear();
        self.dismissed.clear();
    }

    /// Bring placements in line with what the active subquest allows: spawn
    /// newly visible NPCs, drop ones whose position is no longer visible.
    /// NPCs that already stand somewhere keep their spot.
    pub fn sync_visible(&mut self, repo: &ContentRepository, active: Option<u32>) {
        let visible: Vec<_> = repo
            .positions_in(self.location_id)
            .filter(|p| !p.is_door() && p.visible_during(active))
            .collect();
        let visible_ids: HashSet<u32> = visible.iter().map(|p| p.position_id).collect();

        self.npcs.retain(|_, npc| match npc.home_position {
            Some(home) => visible_ids.contains(&home),
            None => true,
        });
        for pos in visible {
            if self.dismissed.contains(&pos.tag) || self.npcs.contains_key(&pos.tag) {
                continue;
            }
            self.npcs.insert(
                pos.tag.clone(),
                Npc {
                    tag: pos.tag.clone(),
                    x: pos.x,
                    y: pos.y,
                    home_position: Some(pos.position_id),
                },
            );
        }
    }

    /// Nearest NPC within `radius` of the point.
    pub fn nearest(&self, x: f32, y: f32, radius: f32) -> Option<&Npc> {
        self.npcs
            .values()
            .map(|npc| (npc, distance(x, y, npc.x, npc.y)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(npc, _)| npc)
    }

    /// Apply an action. Targets outside this location, unknown positions,
    /// absent NPCs and unknown action types change nothing.
    pub fn perform(&mut self, action: &NpcAction, repo: &ContentRepository) -> ActionEffect {
        let location_id = self.location_id;
        let target = |position_id: u32| {
            repo.position(position_id)
                .filter(|p| p.location_id == location_id)
                .map(|p| (p.x, p.y))
        };
        match action {
            NpcAction::Move { tag, position_id } => {
                match (target(*position_id), self.npcs.get_mut(tag)) {
                    (Some((x, y)), Some(npc)) => {
                        npc.x = x;
                        npc.y = y;
                        ActionEffect::Moved { tag: tag.clone(), x, y }
                    }
                    _ => ActionEffect::None,
                }
            }
            NpcAction::Spawn { tag, position_id } => match target(*position_id) {
                Some((x, y)) => {
                    self.dismissed.remove(tag);
                    self.npcs.insert(
                        tag.clone(),
                        Npc {
                            tag: tag.clone(),
                            x,
                            y,
                            home_position: None,
                        },
                    );
                    ActionEffect::Spawned { tag: tag.clone(), x, y }
                }
                None => ActionEffect::None,
            },
            NpcAction::Remove { tag } => match self.npcs.remove(tag) {
                Some(_) => {
                    self.dismissed.insert(tag.clone());
                    ActionEffect::Removed { tag: tag.clone() }
                }
                None => ActionEffect::None,
            },
            NpcAction::MoveRemove { tag, position_id } => {
                match (target(*position_id), self.npcs.remove(tag)) {
                    (Some((x, y)), Some(_)) => {
                        self.dismissed.insert(tag.clone());
                        ActionEffect::WalkedOff { tag: tag.clone(), x, y }
                    }
                    (None, Some(npc)) => {
                        // No usable target: leave the NPC where it was.
                        self.npcs.insert(tag.clone(), npc);
                        ActionEffect::None
                    }
                    (_, None) => ActionEffect::None,
                }
            }
            NpcAction::Unknown(kind) => {
                debug!("Ignoring unknown action type '{}'", kind);
                ActionEffect::None
            }
        }
    }
}

pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

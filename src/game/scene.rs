//! Scene controller: the player in one location, the NPCs and doors around
//! them, and which modal (if any) currently owns input.

use std::collections::HashSet;
use std::mem;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::GameConfig;
use crate::content::{
    active_subquest_of, InventoryRecord, LocationKind, LocationRecord, PlayerProgressRecord,
    PositionRecord,
};
use crate::game::actions::{distance, ActionEffect, NpcPlacements};
use crate::game::client::{ClientError, ProgressApi};
use crate::game::dialog::{Dialog, DialogError, DialogStep, DialogView, Selection};
use crate::game::repository::ContentRepository;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("location {0} does not exist")]
    UnknownLocation(u32),
    #[error("close the open window first")]
    ModalOpen,
    #[error("nobody is talking to you")]
    NotInDialogue,
    #[error(transparent)]
    Dialog(#[from] DialogError),
}

/// Who owns input. Only `Idle` lets the player move or interact.
#[derive(Debug, Default)]
pub enum UiState {
    #[default]
    Idle,
    Dialogue(Dialog),
    Inventory,
    Menu,
    Guide,
}

impl UiState {
    pub fn is_idle(&self) -> bool {
        matches!(self, UiState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            UiState::Idle => "idle",
            UiState::Dialogue(_) => "dialogue",
            UiState::Inventory => "inventory",
            UiState::Menu => "menu",
            UiState::Guide => "guide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Something within reach of the player.
#[derive(Debug, Clone, PartialEq)]
pub enum Nearby {
    Npc { tag: String },
    Door { position_id: u32, to: u32 },
}

/// What an input did, for the front end to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    Nothing,
    /// The NPC has nothing to say right now.
    Silent { tag: String },
    Dialogue { view: DialogView, effect: ActionEffect },
    Notice { text: String, view: DialogView, effect: ActionEffect },
    /// A dialogue ended. `narration` is set when a narrator dialogue opened right after.
    DialogueClosed {
        effect: ActionEffect,
        narration: Option<DialogView>,
    },
    EnteredLocation {
        location_id: u32,
        name: String,
        narration: Option<DialogView>,
    },
}

pub struct SceneController {
    repo: Arc<ContentRepository>,
    api: Box<dyn ProgressApi>,
    settings: GameConfig,
    location_id: u32,
    kind: LocationKind,
    player: (f32, f32),
    npcs: NpcPlacements,
    progress: Vec<PlayerProgressRecord>,
    inventory: Vec<InventoryRecord>,
    ui: UiState,
    /// Subquests whose narrator lines already played.
    narrated: HashSet<u32>,
}

impl SceneController {
    /// Fetch content once and open the configured start location.
    pub async fn create(
        api: Box<dyn ProgressApi>,
        settings: &GameConfig,
    ) -> Result<Self, SceneError> {
        let bundle = api.content().await?;
        info!("Loaded {} content records", bundle.record_count());
        let repo = Arc::new(ContentRepository::from_bundle(bundle));
        Self::with_repository(repo, api, settings).await
    }

    pub async fn with_repository(
        repo: Arc<ContentRepository>,
        api: Box<dyn ProgressApi>,
        settings: &GameConfig,
    ) -> Result<Self, SceneError> {
        let start = settings.start_location;
        let location = repo
            .location(start)
            .ok_or(SceneError::UnknownLocation(start))?;
        let (kind, player) = (location.kind, (location.spawn_x, location.spawn_y));
        let progress = api.player_progress().await?;
        let inventory = api.inventory().await?;
        let mut scene = Self {
            repo,
            api,
            settings: settings.clone(),
            location_id: start,
            kind,
            player,
            npcs: NpcPlacements::new(start),
            progress,
            inventory,
            ui: UiState::Idle,
            narrated: HashSet::new(),
        };
        scene.spawn_npcs();
        scene.maybe_narrate();
        Ok(scene)
    }

    pub fn repo(&self) -> &Arc<ContentRepository> {
        &self.repo
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn location(&self) -> Option<&LocationRecord> {
        self.repo.location(self.location_id)
    }

    pub fn player_position(&self) -> (f32, f32) {
        self.player
    }

    pub fn npcs(&self) -> &NpcPlacements {
        &self.npcs
    }

    pub fn progress(&self) -> &[PlayerProgressRecord] {
        &self.progress
    }

    pub fn active_subquest(&self) -> Option<u32> {
        active_subquest_of(&self.progress)
    }

    /// Doors of the current location open under the active subquest.
    pub fn doors(&self) -> Vec<&PositionRecord> {
        let active = self.active_subquest();
        self.repo
            .positions_in(self.location_id)
            .filter(|p| p.is_door() && p.visible_during(active))
            .collect()
    }

    pub fn spawn_npcs(&mut self) {
        let active = self.active_subquest();
        self.npcs.sync_visible(&self.repo, active);
        debug!(
            "Location {} has {} NPCs for subquest {:?}",
            self.location_id,
            self.npcs.len(),
            active
        );
    }

    /// Step the player. Ignored (returns `false`) while a modal is open.
    pub fn move_player(&mut self, direction: Direction) -> bool {
        if !self.ui.is_idle() {
            return false;
        }
        let (dx, dy) = direction.delta();
        let step = self.settings.move_step;
        let (x, y) = (self.player.0 + dx * step, self.player.1 + dy * step);
        self.player = match self.location() {
            Some(location) => location.clamp(x, y),
            None => (x, y),
        };
        true
    }

    /// Closest NPC or door in reach. Nothing is in reach while a modal is open.
    pub fn nearby(&self) -> Option<Nearby> {
        if !self.ui.is_idle() {
            return None;
        }
        let (px, py) = self.player;
        let radius = self.settings.interaction_radius;
        let npc = self
            .npcs
            .nearest(px, py, radius)
            .map(|n| (distance(px, py, n.x, n.y), Nearby::Npc { tag: n.tag.clone() }));
        let door = self
            .doors()
            .into_iter()
            .filter_map(|d| {
                let to = d.door_to?;
                let dist = distance(px, py, d.x, d.y);
                (dist <= radius).then(|| {
                    (
                        dist,
                        Nearby::Door {
                            position_id: d.position_id,
                            to,
                        },
                    )
                })
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        match (npc, door) {
            (Some(n), Some(d)) => Some(if d.0 < n.0 { d.1 } else { n.1 }),
            (n, d) => n.or(d).map(|(_, near)| near),
        }
    }

    /// Talk to the NPC or use the door in reach.
    pub async fn interact(&mut self) -> Result<SceneEvent, SceneError> {
        if !self.ui.is_idle() {
            return Err(SceneError::ModalOpen);
        }
        match self.nearby() {
            None => Ok(SceneEvent::Nothing),
            Some(Nearby::Door { to, .. }) => self.enter_location(to).await,
            Some(Nearby::Npc { tag }) => {
                let home = self.npcs.get(&tag).and_then(|n| n.home_position);
                let Some(position_id) = home else {
                    return Ok(SceneEvent::Silent { tag });
                };
                let mut dialog = Dialog::for_npc(
                    Arc::clone(&self.repo),
                    position_id,
                    &tag,
                    self.active_subquest(),
                );
                match dialog.show_dialogs() {
                    DialogStep::Node(view) => {
                        self.ui = UiState::Dialogue(dialog);
                        Ok(SceneEvent::Dialogue {
                            view,
                            effect: ActionEffect::None,
                        })
                    }
                    _ => Ok(SceneEvent::Silent { tag }),
                }
            }
        }
    }

    /// Continue or pick a choice in the open dialogue.
    pub async fn dialog_select(&mut self, selection: Selection) -> Result<SceneEvent, SceneError> {
        let mut dialog = match mem::take(&mut self.ui) {
            UiState::Dialogue(dialog) => dialog,
            other => {
                self.ui = other;
                return Err(SceneError::NotInDialogue);
            }
        };
        let turn = match dialog
            .select(selection, self.api.as_ref(), &mut self.npcs)
            .await
        {
            Ok(turn) => turn,
            Err(e) => {
                self.ui = UiState::Dialogue(dialog);
                return Err(e.into());
            }
        };
        match turn.step {
            DialogStep::Node(view) => {
                self.ui = UiState::Dialogue(dialog);
                Ok(SceneEvent::Dialogue {
                    view,
                    effect: turn.effect,
                })
            }
            DialogStep::Notice { text, node } => {
                self.ui = UiState::Dialogue(dialog);
                Ok(SceneEvent::Notice {
                    text,
                    view: node,
                    effect: turn.effect,
                })
            }
            DialogStep::Finished => {
                let narration = self.finish_interaction().await;
                Ok(SceneEvent::DialogueClosed {
                    effect: turn.effect,
                    narration,
                })
            }
        }
    }

    /// Back to idle after a dialogue: re-read player state, respawn, narrate.
    async fn finish_interaction(&mut self) -> Option<DialogView> {
        self.refresh().await;
        self.spawn_npcs();
        self.maybe_narrate()
    }

    /// Re-read progress and inventory. Failures keep the previous state.
    pub async fn refresh(&mut self) {
        match self.api.player_progress().await {
            Ok(progress) => self.progress = progress,
            Err(e) => warn!("Could not refresh progress: {}", e),
        }
        match self.api.inventory().await {
            Ok(inventory) => self.inventory = inventory,
            Err(e) => warn!("Could not refresh inventory: {}", e),
        }
    }

    /// Open the narrator dialogue for the active subquest once.
    fn maybe_narrate(&mut self) -> Option<DialogView> {
        if !self.ui.is_idle() {
            return None;
        }
        let active = self.active_subquest()?;
        if !self.narrated.insert(active) {
            return None;
        }
        let mut dialog = Dialog::narrator(Arc::clone(&self.repo), active);
        match dialog.show_dialogs() {
            DialogStep::Node(view) => {
                self.ui = UiState::Dialogue(dialog);
                Some(view)
            }
            _ => None,
        }
    }

    pub async fn enter_location(&mut self, location_id: u32) -> Result<SceneEvent, SceneError> {
        let location = self
            .repo
            .location(location_id)
            .ok_or(SceneError::UnknownLocation(location_id))?;
        let name = location.name.clone();
        self.kind = location.kind;
        self.player = (location.spawn_x, location.spawn_y);
        self.location_id = location_id;
        self.npcs.reset(location_id);
        self.spawn_npcs();
        info!("Player {} entered {}", self.api.player_id(), name);
        let narration = self.maybe_narrate();
        Ok(SceneEvent::EnteredLocation {
            location_id,
            name,
            narration,
        })
    }

    fn open_modal(&mut self, state: UiState) -> Result<(), SceneError> {
        if !self.ui.is_idle() {
            return Err(SceneError::ModalOpen);
        }
        self.ui = state;
        Ok(())
    }

    pub fn open_inventory(&mut self) -> Result<(), SceneError> {
        self.open_modal(UiState::Inventory)
    }

    pub fn open_menu(&mut self) -> Result<(), SceneError> {
        self.open_modal(UiState::Menu)
    }

    pub fn open_guide(&mut self) -> Result<(), SceneError> {
        self.open_modal(UiState::Guide)
    }

    /// Close the inventory, menu or guide. Dialogues close by playing out.
    pub fn close_modal(&mut self) -> bool {
        match self.ui {
            UiState::Inventory | UiState::Menu | UiState::Guide => {
                self.ui = UiState::Idle;
                true
            }
            UiState::Idle | UiState::Dialogue(_) => false,
        }
    }

    /// Quest title and hint for the active subquest.
    pub fn guide_text(&self) -> String {
        let Some(active) = self.active_subquest() else {
            return "No quest in progress. You have finished every chapter written so far."
                .to_string();
        };
        let Some(subquest) = self.repo.subquest(active) else {
            return format!("Subquest {} is missing from the content tables.", active);
        };
        let quest = self
            .repo
            .quest(subquest.quest_id)
            .map(|q| q.title.as_str())
            .unwrap_or("Unknown quest");
        let mut text = format!("{}: {}", quest, subquest.title);
        if !subquest.description.is_empty() {
            text.push('\n');
            text.push_str(&subquest.description);
        }
        if let Some(guide) = &subquest.guide {
            text.push('\n');
            text.push_str(guide);
        }
        text
    }

    /// Held items by name, milestones excluded.
    pub fn inventory_view(&self) -> Vec<(String, i64)> {
        self.inventory
            .iter()
            .filter(|entry| entry.amount != 0)
            .filter(|entry| {
                self.repo
                    .item(entry.item_id)
                    .map_or(true, |item| !item.is_milestone())
            })
            .map(|entry| (self.repo.item_name(entry.item_id).to_string(), entry.amount))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{self, ContentStoreBuilder};
    use crate::game::client::StoreProgressClient;
    use tempfile::TempDir;

    async fn scene() -> (TempDir, SceneController) {
        let dir = TempDir::new().unwrap();
        let store = ContentStoreBuilder::new(dir.path())
            .with_seed(content::starter_content().unwrap())
            .open()
            .unwrap();
        content::start_first_subquest(&store, "p1").unwrap();
        let api = StoreProgressClient::new(Arc::new(store), "p1");
        let scene = SceneController::create(Box::new(api), &GameConfig::default())
            .await
            .unwrap();
        (dir, scene)
    }

    async fn skip_narration(scene: &mut SceneController) {
        while matches!(scene.ui(), UiState::Dialogue(_)) {
            scene.dialog_select(Selection::Continue).await.unwrap();
        }
    }

    #[tokio::test]
    async fn opening_narration_blocks_movement() {
        let (_dir, mut scene) = scene().await;
        assert!(matches!(scene.ui(), UiState::Dialogue(_)));
        let start = scene.player_position();
        assert!(!scene.move_player(Direction::Up));
        assert_eq!(scene.player_position(), start);
        skip_narration(&mut scene).await;
        assert!(scene.move_player(Direction::Up));
        assert_eq!(scene.player_position(), (start.0, start.1 - 16.0));
    }

    #[tokio::test]
    async fn modals_block_movement_until_closed() {
        let (_dir, mut scene) = scene().await;
        skip_narration(&mut scene).await;
        let openers: [fn(&mut SceneController) -> Result<(), SceneError>; 3] = [
            SceneController::open_inventory,
            SceneController::open_menu,
            SceneController::open_guide,
        ];
        for open in openers {
            open(&mut scene).unwrap();
            let before = scene.player_position();
            assert!(!scene.move_player(Direction::Left));
            assert_eq!(scene.player_position(), before);
            assert!(scene.nearby().is_none());
            assert!(matches!(scene.open_menu(), Err(SceneError::ModalOpen)));
            assert!(scene.close_modal());
            assert!(scene.move_player(Direction::Left));
        }
    }

    #[tokio::test]
    async fn movement_is_clamped_to_the_map() {
        let (_dir, mut scene) = scene().await;
        skip_narration(&mut scene).await;
        for _ in 0..100 {
            scene.move_player(Direction::Down);
        }
        assert_eq!(scene.player_position().1, 480.0);
    }

    #[tokio::test]
    async fn interact_with_nothing_in_reach() {
        let (_dir, mut scene) = scene().await;
        skip_narration(&mut scene).await;
        assert_eq!(scene.interact().await.unwrap(), SceneEvent::Nothing);
        assert!(scene.ui().is_idle());
    }

    #[tokio::test]
    async fn guide_names_quest_and_subquest() {
        let (_dir, scene) = scene().await;
        let guide = scene.guide_text();
        assert!(guide.starts_with("Hello, World: Wake Up"));
        assert!(guide.contains("Professor Byte"));
    }
}

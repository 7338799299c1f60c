mod common;

use std::sync::Arc;

use codyssey::config::GameConfig;
use codyssey::content::{self, starter_content};
use codyssey::game::{
    ActionEffect, ContentRepository, Direction, Npc, NpcAction, NpcPlacements, SceneController,
    SceneError, Selection, StoreProgressClient, UiState,
};

async fn idle_scene(store: &Arc<content::ContentStore>) -> SceneController {
    content::start_first_subquest(store, "p").unwrap();
    let api = StoreProgressClient::new(Arc::clone(store), "p");
    let mut scene = SceneController::create(Box::new(api), &GameConfig::default())
        .await
        .unwrap();
    while matches!(scene.ui(), UiState::Dialogue(_)) {
        scene.dialog_select(Selection::Continue).await.unwrap();
    }
    scene
}

#[tokio::test]
async fn open_window_owns_input() {
    let (_dir, store) = common::seeded_store();
    let mut scene = idle_scene(&store).await;
    scene.open_inventory().unwrap();
    let start = scene.player_position();

    assert!(!scene.move_player(Direction::Up));
    assert_eq!(scene.player_position(), start);
    assert_eq!(scene.nearby(), None);
    assert!(matches!(scene.interact().await, Err(SceneError::ModalOpen)));
    assert!(matches!(scene.open_menu(), Err(SceneError::ModalOpen)));
    assert!(matches!(
        scene.dialog_select(Selection::Continue).await,
        Err(SceneError::NotInDialogue)
    ));
    assert_eq!(scene.ui().name(), "inventory");

    assert!(scene.close_modal());
    assert!(scene.move_player(Direction::Up));
    assert!(!scene.close_modal());
}

#[tokio::test]
async fn dialogue_is_not_a_closable_window() {
    let (_dir, store) = common::seeded_store();
    content::start_first_subquest(&store, "p").unwrap();
    let api = StoreProgressClient::new(Arc::clone(&store), "p");
    let mut scene = SceneController::create(Box::new(api), &GameConfig::default())
        .await
        .unwrap();

    // Opening narration is up.
    assert_eq!(scene.ui().name(), "dialogue");
    assert!(!scene.close_modal());
    assert!(matches!(scene.open_guide(), Err(SceneError::ModalOpen)));
    assert!(!scene.move_player(Direction::Left));
    assert_eq!(scene.ui().name(), "dialogue");
}

#[test]
fn unknown_action_changes_no_placement() {
    let repo = ContentRepository::from_bundle(starter_content().unwrap());
    let mut npcs = NpcPlacements::new(1);
    npcs.sync_visible(&repo, Some(1));
    let before: Vec<Npc> = npcs.iter().cloned().collect();
    assert!(!before.is_empty());

    let effect = npcs.perform(&NpcAction::Unknown("teleport".to_string()), &repo);
    assert_eq!(effect, ActionEffect::None);
    assert_eq!(npcs.iter().cloned().collect::<Vec<_>>(), before);
}

#[test]
fn spawned_npcs_have_no_dialogue_home() {
    let repo = ContentRepository::from_bundle(starter_content().unwrap());
    let mut npcs = NpcPlacements::new(1);
    let action = NpcAction::from_record(repo.action(2).unwrap());
    assert!(matches!(
        npcs.perform(&action, &repo),
        ActionEffect::Spawned { ref tag, .. } if tag == "rubber_duck"
    ));
    assert_eq!(npcs.get("rubber_duck").unwrap().home_position, None);
}

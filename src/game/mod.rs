//! The game client: a content snapshot, NPC placement, the dialogue engine
//! and the scene controller, talking to the progress store through
//! [`ProgressApi`].

pub mod actions;
pub mod client;
pub mod dialog;
pub mod repository;
pub mod scene;
pub mod terminal;

pub use actions::{ActionEffect, Npc, NpcAction, NpcPlacements};
pub use client::{ClientError, HttpProgressClient, ProgressApi, StoreProgressClient};
pub use dialog::{Dialog, DialogError, DialogStep, DialogView, Selection};
pub use repository::ContentRepository;
pub use scene::{Direction, Nearby, SceneController, SceneError, SceneEvent, UiState};
pub use terminal::{run_terminal, TerminalFrontend};

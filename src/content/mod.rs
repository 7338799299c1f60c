//! Game content and player state persistence.
//! Content tables (quests, dialogue, positions, items, packages, ...) and
//! per-player progress and inventory live in one sled database, one tree per
//! collection, with the starter world seeded from JSON.

pub mod errors;
pub mod inventory;
pub mod progress;
pub mod seed_loader;
pub mod storage;
pub mod types;

pub use errors::StoreError;
pub use inventory::{add_item_delta, apply_package, inventory_for, item_amount, PackageOutcome};
pub use progress::{
    active_subquest, active_subquest_of, advance_progress, player_progress, set_progress_status,
    start_first_subquest,
};
pub use seed_loader::{check_references, load_content_from_dir, starter_content};
pub use storage::{ContentStore, ContentStoreBuilder};
pub use types::*;

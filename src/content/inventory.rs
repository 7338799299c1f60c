//! Inventory bookkeeping for players.
//!
//! Amounts never go negative in the store: a delta that would take an item
//! below zero is rejected with [`StoreError::InsufficientItems`].
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};
use sled::Transactional;

use crate::content::errors::StoreError;
use crate::content::progress::{self, AdvanceSeqs};
use crate::content::storage::ContentStore;
use crate::content::types::{id_key, InventoryRecord, ItemRecord, PlayerProgressRecord};

/// Every item stack a player holds, in item order.
pub fn inventory_for(
    store: &ContentStore,
    player_id: &str,
) -> Result<Vec<InventoryRecord>, StoreError> {
    store.list_prefix(&format!("{}:", player_id))
}

/// How many of `item_id` the player holds (0 when none).
pub fn item_amount(store: &ContentStore, player_id: &str, item_id: u32) -> Result<i64, StoreError> {
    Ok(store
        .find::<InventoryRecord>(&InventoryRecord::key_for(player_id, item_id))?
        .map(|rec| rec.amount)
        .unwrap_or(0))
}

fn read_amount(
    tx: &TransactionalTree,
    player_id: &str,
    item_id: u32,
) -> ConflictableTransactionResult<i64, StoreError> {
    let key = InventoryRecord::key_for(player_id, item_id);
    match tx.get(key.as_bytes())? {
        Some(bytes) => ContentStore::decode::<InventoryRecord>(&bytes)
            .map(|rec| rec.amount)
            .map_err(ConflictableTransactionError::Abort),
        None => Ok(0),
    }
}

/// Apply one delta inside a transaction; empty stacks are removed.
fn apply_delta_in_tx(
    tx: &TransactionalTree,
    player_id: &str,
    item_id: u32,
    delta: i64,
) -> ConflictableTransactionResult<InventoryRecord, StoreError> {
    let current = read_amount(tx, player_id, item_id)?;
    let updated = current + delta;
    if updated < 0 {
        return Err(ConflictableTransactionError::Abort(StoreError::InsufficientItems {
            item_id,
            required: -delta,
            available: current,
        }));
    }
    let record = InventoryRecord::new(player_id, item_id, updated);
    let key = InventoryRecord::key_for(player_id, item_id);
    if updated == 0 {
        tx.remove(key.into_bytes())?;
    } else {
        let bytes = ContentStore::encode(&record).map_err(ConflictableTransactionError::Abort)?;
        tx.insert(key.into_bytes(), bytes)?;
    }
    Ok(record)
}

/// Add a signed delta to one inventory stack.
pub fn add_item_delta(
    store: &ContentStore,
    player_id: &str,
    item_id: u32,
    delta: i64,
) -> Result<InventoryRecord, StoreError> {
    let tree = store.tree::<InventoryRecord>()?;
    let record = tree.transaction(|tx| apply_delta_in_tx(tx, player_id, item_id, delta))?;
    tree.flush()?;
    debug!(
        "inventory {} item {} {:+} -> {}",
        player_id, item_id, delta, record.amount
    );
    Ok(record)
}

/// Result of applying a package on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageOutcome {
    /// Inventory stacks after their deltas were applied, in package order.
    pub applied: Vec<InventoryRecord>,
    /// Subquest completed by a milestone item, if any.
    pub completed_subquest: Option<u32>,
    /// Progress after a milestone advance.
    pub progress: Option<Vec<PlayerProgressRecord>>,
}

/// Apply every delta of a package, all or nothing.
///
/// Details are walked in order. A milestone item completes the player's
/// active subquest and ends the walk; details after it are not applied.
pub fn apply_package(
    store: &ContentStore,
    player_id: &str,
    package_id: u32,
) -> Result<PackageOutcome, StoreError> {
    let details = store.package_details(package_id)?;
    if details.is_empty() {
        return Err(StoreError::NotFound(format!("package_detail: {}", package_id)));
    }

    // Split the walk at the first milestone.
    let mut deltas = Vec::new();
    let mut hit_milestone = false;
    for detail in &details {
        let item = store.find::<ItemRecord>(&id_key(detail.item_id))?;
        if item.as_ref().is_some_and(|i| i.is_milestone()) {
            hit_milestone = true;
            break;
        }
        deltas.push((detail.item_id, detail.amount));
    }

    let (completed, next) = if hit_milestone {
        match progress::active_subquest(store, player_id)? {
            Some(active) => (
                Some(active),
                store.next_subquest(active)?.map(|s| s.subquest_id),
            ),
            None => (None, None),
        }
    } else {
        (None, None)
    };
    let seqs = AdvanceSeqs::reserve(store)?;

    let inventory = store.tree::<InventoryRecord>()?;
    let progress_tree = store.tree::<PlayerProgressRecord>()?;
    let applied = (&inventory, &progress_tree).transaction(|(inv_tx, prog_tx)| {
        let mut applied = Vec::with_capacity(deltas.len());
        for (item_id, amount) in &deltas {
            applied.push(apply_delta_in_tx(inv_tx, player_id, *item_id, *amount)?);
        }
        if let Some(done) = completed {
            progress::advance_in_tx(prog_tx, player_id, done, next, seqs)?;
        }
        Ok::<_, ConflictableTransactionError<StoreError>>(applied)
    })?;
    inventory.flush()?;
    progress_tree.flush()?;

    info!(
        "Applied package {} for {} ({} deltas{})",
        package_id,
        player_id,
        applied.len(),
        if completed.is_some() { ", milestone" } else { "" }
    );

    let progress = match completed {
        Some(_) => Some(progress::player_progress(store, player_id)?),
        None => None,
    };
    Ok(PackageOutcome {
        applied,
        completed_subquest: completed,
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::storage::ContentStoreBuilder;
    use crate::content::types::{PackageDetailRecord, ProgressStatus, SubquestRecord};
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = ContentStoreBuilder::new(dir.path()).open().expect("store");
        store
            .put_all(&[
                ItemRecord::new(1, "Coin"),
                ItemRecord::new(2, "Compiler Scroll"),
                ItemRecord::milestone(9, "Chapter Badge"),
            ])
            .unwrap();
        store
            .put_all(&[SubquestRecord::new(1, 1, "Buy"), SubquestRecord::new(2, 1, "Read")])
            .unwrap();
        store
            .put_all(&[
                // Trade 3 coins for a scroll.
                PackageDetailRecord::new(10, 1, -3),
                PackageDetailRecord::new(10, 2, 1),
                // Earn a badge.
                PackageDetailRecord::new(20, 9, 1),
            ])
            .unwrap();
        (dir, store)
    }

    #[test]
    fn deltas_accumulate_and_empty_stacks_disappear() {
        let (_dir, store) = setup_test_store();
        add_item_delta(&store, "alice", 1, 5).unwrap();
        assert_eq!(item_amount(&store, "alice", 1).unwrap(), 5);
        add_item_delta(&store, "alice", 1, -5).unwrap();
        assert_eq!(item_amount(&store, "alice", 1).unwrap(), 0);
        assert!(inventory_for(&store, "alice").unwrap().is_empty());
    }

    #[test]
    fn overdraw_is_rejected() {
        let (_dir, store) = setup_test_store();
        add_item_delta(&store, "alice", 1, 2).unwrap();
        let err = add_item_delta(&store, "alice", 1, -3).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientItems {
                item_id: 1,
                required: 3,
                available: 2
            }
        ));
        assert_eq!(item_amount(&store, "alice", 1).unwrap(), 2);
    }

    #[test]
    fn package_is_all_or_nothing() {
        let (_dir, store) = setup_test_store();
        add_item_delta(&store, "alice", 1, 2).unwrap();
        assert!(apply_package(&store, "alice", 10).is_err());
        assert_eq!(item_amount(&store, "alice", 1).unwrap(), 2);
        assert_eq!(item_amount(&store, "alice", 2).unwrap(), 0);

        add_item_delta(&store, "alice", 1, 1).unwrap();
        let outcome = apply_package(&store, "alice", 10).unwrap();
        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(item_amount(&store, "alice", 1).unwrap(), 0);
        assert_eq!(item_amount(&store, "alice", 2).unwrap(), 1);
    }

    #[test]
    fn milestone_package_advances_progress() {
        let (_dir, store) = setup_test_store();
        progress::start_first_subquest(&store, "alice").unwrap();
        let outcome = apply_package(&store, "alice", 20).unwrap();
        assert_eq!(outcome.completed_subquest, Some(1));
        let entries = outcome.progress.unwrap();
        assert_eq!(entries[0].status, ProgressStatus::Completed);
        assert_eq!(entries[1].subquest_id, 2);
        assert_eq!(entries[1].status, ProgressStatus::InProgress);
        // Milestones are not stored as inventory.
        assert_eq!(item_amount(&store, "alice", 9).unwrap(), 0);
    }
}

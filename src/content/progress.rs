//! Player progress bookkeeping.
//!
//! Progress is a list of `(subquest, status)` entries per player ordered by
//! creation sequence; the latest entry is the player's current state. Marking
//! a subquest complete and opening the next one happens in one sled
//! transaction so a failure cannot leave the player between subquests.

use chrono::Utc;
use log::{debug, info};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};

use crate::content::errors::StoreError;
use crate::content::storage::ContentStore;
use crate::content::types::{PlayerProgressRecord, ProgressStatus};

/// Player's progress entries, oldest first.
pub fn player_progress(
    store: &ContentStore,
    player_id: &str,
) -> Result<Vec<PlayerProgressRecord>, StoreError> {
    let mut entries: Vec<PlayerProgressRecord> = store.list_prefix(&format!("{}:", player_id))?;
    entries.sort_by_key(|entry| entry.seq);
    Ok(entries)
}

/// The subquest a progress list says is active: the latest entry, if still in progress.
pub fn active_subquest_of(entries: &[PlayerProgressRecord]) -> Option<u32> {
    entries
        .iter()
        .max_by_key(|entry| entry.seq)
        .filter(|entry| entry.is_in_progress())
        .map(|entry| entry.subquest_id)
}

pub fn active_subquest(store: &ContentStore, player_id: &str) -> Result<Option<u32>, StoreError> {
    Ok(active_subquest_of(&player_progress(store, player_id)?))
}

/// Upsert the status of one entry. New entries become the latest; existing ones keep their place.
pub fn set_progress_status(
    store: &ContentStore,
    player_id: &str,
    subquest_id: u32,
    status: ProgressStatus,
) -> Result<PlayerProgressRecord, StoreError> {
    let key = PlayerProgressRecord::key_for(player_id, subquest_id);
    let record = match store.find::<PlayerProgressRecord>(&key)? {
        Some(mut existing) => {
            existing.status = status;
            existing.updated_at = Utc::now();
            existing
        }
        None => {
            let mut fresh = PlayerProgressRecord::new(player_id, subquest_id, status);
            fresh.seq = store.next_seq()?;
            fresh
        }
    };
    store.put(&record)?;
    debug!(
        "progress {} subquest {} -> {}",
        player_id, subquest_id, record.status
    );
    Ok(record)
}

/// Give a player with no progress the first subquest. Returns the new entry, if one was made.
pub fn start_first_subquest(
    store: &ContentStore,
    player_id: &str,
) -> Result<Option<PlayerProgressRecord>, StoreError> {
    if !player_progress(store, player_id)?.is_empty() {
        return Ok(None);
    }
    match store.first_subquest()? {
        Some(first) => Ok(Some(set_progress_status(
            store,
            player_id,
            first.subquest_id,
            ProgressStatus::InProgress,
        )?)),
        None => Ok(None),
    }
}

/// Sequence numbers reserved for the two entries an advance may create.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdvanceSeqs {
    pub completed: u64,
    pub next: u64,
}

impl AdvanceSeqs {
    pub(crate) fn reserve(store: &ContentStore) -> Result<Self, StoreError> {
        Ok(Self {
            completed: store.next_seq()?,
            next: store.next_seq()?,
        })
    }
}

fn read_entry(
    tx: &TransactionalTree,
    key: &str,
) -> ConflictableTransactionResult<Option<PlayerProgressRecord>, StoreError> {
    match tx.get(key.as_bytes())? {
        Some(bytes) => ContentStore::decode::<PlayerProgressRecord>(&bytes)
            .map(Some)
            .map_err(ConflictableTransactionError::Abort),
        None => Ok(None),
    }
}

fn write_entry(
    tx: &TransactionalTree,
    record: &PlayerProgressRecord,
) -> ConflictableTransactionResult<(), StoreError> {
    let bytes = ContentStore::encode(record).map_err(ConflictableTransactionError::Abort)?;
    let key = PlayerProgressRecord::key_for(&record.player_id, record.subquest_id);
    tx.insert(key.into_bytes(), bytes)?;
    Ok(())
}

/// Transaction body shared by [`advance_progress`] and package application:
/// completed entry first, then the next one. Re-running it changes nothing.
pub(crate) fn advance_in_tx(
    tx: &TransactionalTree,
    player_id: &str,
    completed: u32,
    next: Option<u32>,
    seqs: AdvanceSeqs,
) -> ConflictableTransactionResult<(), StoreError> {
    let now = Utc::now();
    let done_key = PlayerProgressRecord::key_for(player_id, completed);
    let done = match read_entry(tx, &done_key)? {
        Some(existing) if existing.status == ProgressStatus::Completed => None,
        Some(mut existing) => {
            existing.status = ProgressStatus::Completed;
            existing.updated_at = now;
            Some(existing)
        }
        None => {
            let mut fresh = PlayerProgressRecord::new(player_id, completed, ProgressStatus::Completed);
            fresh.seq = seqs.completed;
            Some(fresh)
        }
    };
    if let Some(record) = done {
        write_entry(tx, &record)?;
    }

    if let Some(next_id) = next {
        let next_key = PlayerProgressRecord::key_for(player_id, next_id);
        if read_entry(tx, &next_key)?.is_none() {
            let mut fresh = PlayerProgressRecord::new(player_id, next_id, ProgressStatus::InProgress);
            fresh.seq = seqs.next;
            write_entry(tx, &fresh)?;
        }
    }
    Ok(())
}

/// Mark `completed` done and open the subquest that follows it, atomically.
/// Returns the player's progress afterwards.
pub fn advance_progress(
    store: &ContentStore,
    player_id: &str,
    completed: u32,
) -> Result<Vec<PlayerProgressRecord>, StoreError> {
    let next = store.next_subquest(completed)?.map(|s| s.subquest_id);
    let seqs = AdvanceSeqs::reserve(store)?;
    let tree = store.tree::<PlayerProgressRecord>()?;
    tree.transaction(|tx| advance_in_tx(tx, player_id, completed, next, seqs))?;
    tree.flush()?;
    match next {
        Some(next_id) => info!(
            "Player {} completed subquest {}, now on {}",
            player_id, completed, next_id
        ),
        None => info!("Player {} completed final subquest {}", player_id, completed),
    }
    player_progress(store, player_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::storage::ContentStoreBuilder;
    use crate::content::types::SubquestRecord;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = ContentStoreBuilder::new(dir.path()).open().expect("store");
        store
            .put_all(&[
                SubquestRecord::new(1, 1, "Wake up"),
                SubquestRecord::new(2, 1, "Find the library"),
                SubquestRecord::new(3, 2, "Debug the bridge"),
            ])
            .expect("subquests");
        (dir, store)
    }

    #[test]
    fn new_player_starts_first_subquest_once() {
        let (_dir, store) = setup_test_store();
        let started = start_first_subquest(&store, "alice").unwrap().unwrap();
        assert_eq!(started.subquest_id, 1);
        assert!(started.is_in_progress());
        assert!(start_first_subquest(&store, "alice").unwrap().is_none());
        assert_eq!(active_subquest(&store, "alice").unwrap(), Some(1));
    }

    #[test]
    fn advance_completes_then_opens_next() {
        let (_dir, store) = setup_test_store();
        start_first_subquest(&store, "alice").unwrap();
        let entries = advance_progress(&store, "alice", 1).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subquest_id, 1);
        assert_eq!(entries[0].status, ProgressStatus::Completed);
        assert_eq!(entries[1].subquest_id, 2);
        assert_eq!(entries[1].status, ProgressStatus::InProgress);
        assert_eq!(active_subquest_of(&entries), Some(2));
    }

    #[test]
    fn advance_is_idempotent() {
        let (_dir, store) = setup_test_store();
        start_first_subquest(&store, "alice").unwrap();
        let first = advance_progress(&store, "alice", 1).unwrap();
        let second = advance_progress(&store, "alice", 1).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[1].seq, second[1].seq);
        assert_eq!(active_subquest_of(&second), Some(2));
    }

    #[test]
    fn finishing_last_subquest_leaves_nothing_active() {
        let (_dir, store) = setup_test_store();
        set_progress_status(&store, "bob", 3, ProgressStatus::InProgress).unwrap();
        let entries = advance_progress(&store, "bob", 3).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(active_subquest_of(&entries), None);
    }

    #[test]
    fn status_update_keeps_entry_order() {
        let (_dir, store) = setup_test_store();
        set_progress_status(&store, "carol", 1, ProgressStatus::InProgress).unwrap();
        set_progress_status(&store, "carol", 2, ProgressStatus::InProgress).unwrap();
        set_progress_status(&store, "carol", 1, ProgressStatus::Completed).unwrap();
        let entries = player_progress(&store, "carol").unwrap();
        assert_eq!(entries.last().unwrap().subquest_id, 2);
        assert_eq!(active_subquest_of(&entries), Some(2));
    }
}

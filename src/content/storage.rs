use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sled::IVec;

use crate::content::errors::StoreError;
use crate::content::types::{
    id_key, ActionRecord, ChoiceRecord, ContentBundle, DialogueRecord, ItemRecord, KeyedRecord,
    LocationRecord, PackageDetailRecord, PackageRecord, PositionRecord, QuestRecord, Record,
    SubquestRecord,
};

/// On-disk wrapper so every record carries the schema version it was written with.
#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u8,
    record: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    schema_version: u8,
    record: T,
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ContentStoreBuilder {
    path: PathBuf,
    seed: Option<ContentBundle>,
}

impl ContentStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: None,
        }
    }

    /// Load `bundle` on open when the store holds no content yet.
    pub fn with_seed(mut self, bundle: ContentBundle) -> Self {
        self.seed = Some(bundle);
        self
    }

    pub fn open(self) -> Result<ContentStore, StoreError> {
        let store = ContentStore::open(&self.path)?;
        if let Some(bundle) = self.seed {
            if !store.is_seeded()? {
                let inserted = store.load_bundle(&bundle)?;
                info!("Seeded {} content records into {}", inserted, self.path.display());
            }
        }
        Ok(store)
    }
}

/// Sled-backed persistence for game content, player progress and accounts.
/// Each record type lives in its own tree named after its collection.
pub struct ContentStore {
    db: sled::Db,
}

impl ContentStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        debug!("Opened content store at {}", path_ref.display());
        Ok(Self { db })
    }

    pub(crate) fn tree<T: Record>(&self) -> Result<sled::Tree, StoreError> {
        Ok(self.db.open_tree(T::COLLECTION)?)
    }

    pub(crate) fn encode<T: Record>(record: &T) -> Result<Vec<u8>, StoreError> {
        let envelope = EnvelopeRef {
            schema_version: T::SCHEMA_VERSION,
            record,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    pub(crate) fn decode<T: Record>(bytes: &[u8]) -> Result<T, StoreError> {
        let envelope: Envelope<T> = bincode::deserialize(bytes)?;
        if envelope.schema_version != T::SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: T::COLLECTION,
                expected: T::SCHEMA_VERSION,
                found: envelope.schema_version,
            });
        }
        Ok(envelope.record)
    }

    fn decode_ivec<T: Record>(bytes: IVec) -> Result<T, StoreError> {
        Self::decode(&bytes)
    }

    /// Monotonic id used to order progress entries.
    pub fn next_seq(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()?)
    }

    /// Insert or replace a record after running its shape checks.
    pub fn put<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        record.validate().map_err(StoreError::InvalidRecord)?;
        let tree = self.tree::<T>()?;
        tree.insert(record.record_key().as_bytes(), Self::encode(record)?)?;
        tree.flush()?;
        Ok(())
    }

    /// Insert many records with a single flush.
    pub fn put_all<T: Record>(&self, records: &[T]) -> Result<usize, StoreError> {
        let tree = self.tree::<T>()?;
        let mut batch = sled::Batch::default();
        for record in records {
            record.validate().map_err(StoreError::InvalidRecord)?;
            batch.insert(record.record_key().as_bytes(), Self::encode(record)?);
        }
        tree.apply_batch(batch)?;
        tree.flush()?;
        Ok(records.len())
    }

    /// Insert only if no record has this key yet. Returns false when the key is taken.
    pub fn insert_new<T: Record>(&self, record: &T) -> Result<bool, StoreError> {
        record.validate().map_err(StoreError::InvalidRecord)?;
        let tree = self.tree::<T>()?;
        let swapped = tree.compare_and_swap(
            record.record_key().as_bytes(),
            None as Option<&[u8]>,
            Some(Self::encode(record)?),
        )?;
        tree.flush()?;
        Ok(swapped.is_ok())
    }

    pub fn find<T: Record>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let tree = self.tree::<T>()?;
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode_ivec(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get<T: Record>(&self, key: &str) -> Result<T, StoreError> {
        self.find(key)?
            .ok_or_else(|| StoreError::NotFound(format!("{}: {}", T::COLLECTION, key)))
    }

    pub fn get_by_id<T: KeyedRecord>(&self, id: u32) -> Result<T, StoreError> {
        self.find(&id_key(id))?
            .ok_or_else(|| StoreError::NotFound(format!("{}: {}", T::COLLECTION, id)))
    }

    pub fn exists<T: Record>(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.tree::<T>()?.contains_key(key.as_bytes())?)
    }

    /// All records of a collection in key order.
    pub fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        self.tree::<T>()?
            .iter()
            .map(|entry| {
                entry
                    .map_err(StoreError::from)
                    .and_then(|(_key, value)| Self::decode_ivec(value))
            })
            .collect()
    }

    /// Records whose key starts with `prefix`, in key order.
    pub fn list_prefix<T: Record>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        self.tree::<T>()?
            .scan_prefix(prefix.as_bytes())
            .map(|entry| {
                entry
                    .map_err(StoreError::from)
                    .and_then(|(_key, value)| Self::decode_ivec(value))
            })
            .collect()
    }

    /// Remove a record; returns whether it existed.
    pub fn delete<T: Record>(&self, key: &str) -> Result<bool, StoreError> {
        let tree = self.tree::<T>()?;
        let removed = tree.remove(key.as_bytes())?.is_some();
        tree.flush()?;
        Ok(removed)
    }

    pub fn count<T: Record>(&self) -> Result<usize, StoreError> {
        Ok(self.tree::<T>()?.len())
    }

    /// True once any quest or dialogue exists.
    pub fn is_seeded(&self) -> Result<bool, StoreError> {
        Ok(self.count::<QuestRecord>()? > 0 || self.count::<DialogueRecord>()? > 0)
    }

    /// Write every table of `bundle`, replacing records with the same keys.
    pub fn load_bundle(&self, bundle: &ContentBundle) -> Result<usize, StoreError> {
        let mut inserted = 0usize;
        inserted += self.put_all(&bundle.quests)?;
        inserted += self.put_all(&bundle.subquests)?;
        inserted += self.put_all(&bundle.locations)?;
        inserted += self.put_all(&bundle.positions)?;
        inserted += self.put_all(&bundle.actions)?;
        inserted += self.put_all(&bundle.dialogues)?;
        inserted += self.put_all(&bundle.choices)?;
        inserted += self.put_all(&bundle.items)?;
        inserted += self.put_all(&bundle.packages)?;
        inserted += self.put_all(&bundle.package_details)?;
        Ok(inserted)
    }

    /// Snapshot of every content table.
    pub fn content_bundle(&self) -> Result<ContentBundle, StoreError> {
        Ok(ContentBundle {
            quests: self.list::<QuestRecord>()?,
            subquests: self.list::<SubquestRecord>()?,
            locations: self.list::<LocationRecord>()?,
            positions: self.list::<PositionRecord>()?,
            actions: self.list::<ActionRecord>()?,
            dialogues: self.list::<DialogueRecord>()?,
            choices: self.list::<ChoiceRecord>()?,
            items: self.list::<ItemRecord>()?,
            packages: self.list::<PackageRecord>()?,
            package_details: self.list::<PackageDetailRecord>()?,
        })
    }

    /// Choices offered at one dialogue node, in choice order.
    pub fn choices_for(&self, dialogue_id: u32) -> Result<Vec<ChoiceRecord>, StoreError> {
        self.list_prefix(&format!("{}:", id_key(dialogue_id)))
    }

    /// Item deltas of one package.
    pub fn package_details(&self, package_id: u32) -> Result<Vec<PackageDetailRecord>, StoreError> {
        self.list_prefix(&format!("{}:", id_key(package_id)))
    }

    /// First subquest with an id greater than `subquest_id`.
    pub fn next_subquest(&self, subquest_id: u32) -> Result<Option<SubquestRecord>, StoreError> {
        if subquest_id == u32::MAX {
            return Ok(None);
        }
        let tree = self.tree::<SubquestRecord>()?;
        let start = id_key(subquest_id + 1);
        match tree.range(start.as_bytes()..).next() {
            Some(entry) => {
                let (_key, value) = entry?;
                Ok(Some(Self::decode_ivec(value)?))
            }
            None => Ok(None),
        }
    }

    /// Smallest subquest id, where new players start.
    pub fn first_subquest(&self) -> Result<Option<SubquestRecord>, StoreError> {
        match self.tree::<SubquestRecord>()?.first()? {
            Some((_key, value)) => Ok(Some(Self::decode_ivec(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::{InventoryRecord, CONTENT_SCHEMA_VERSION};
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = ContentStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    #[test]
    fn store_round_trip_dialogue() {
        let (_dir, store) = temp_store();
        let line = DialogueRecord::new(7, "Welcome to the Codyssey!").at_position(2);
        store.put(&line).expect("put");
        let fetched: DialogueRecord = store.get_by_id(7).expect("get");
        assert_eq!(fetched, line);
        assert!(store.get_by_id::<DialogueRecord>(8).is_err());
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let (_dir, store) = temp_store();
        let bogus = EnvelopeRef {
            schema_version: CONTENT_SCHEMA_VERSION + 1,
            record: &QuestRecord::new(1, "Old"),
        };
        let tree = store.tree::<QuestRecord>().unwrap();
        tree.insert(id_key(1).as_bytes(), bincode::serialize(&bogus).unwrap())
            .unwrap();
        match store.get_by_id::<QuestRecord>(1) {
            Err(StoreError::SchemaMismatch { entity, .. }) => assert_eq!(entity, "quest"),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn invalid_records_are_rejected() {
        let (_dir, store) = temp_store();
        let err = store.put(&InventoryRecord::new("p1", 1, -3)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn choices_and_details_scan_by_parent() {
        let (_dir, store) = temp_store();
        store
            .put_all(&[
                ChoiceRecord::new(1, 10, "Yes"),
                ChoiceRecord::new(2, 10, "No"),
                ChoiceRecord::new(3, 100, "Other node"),
            ])
            .unwrap();
        let choices = store.choices_for(10).unwrap();
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].text, "Yes");

        store
            .put_all(&[
                PackageDetailRecord::new(5, 1, -2),
                PackageDetailRecord::new(5, 2, 1),
                PackageDetailRecord::new(50, 1, 1),
            ])
            .unwrap();
        assert_eq!(store.package_details(5).unwrap().len(), 2);
    }

    #[test]
    fn next_subquest_skips_gaps() {
        let (_dir, store) = temp_store();
        store
            .put_all(&[
                SubquestRecord::new(1, 1, "Arrive"),
                SubquestRecord::new(2, 1, "Explore"),
                SubquestRecord::new(10, 2, "Chapter two"),
            ])
            .unwrap();
        assert_eq!(store.first_subquest().unwrap().unwrap().subquest_id, 1);
        assert_eq!(store.next_subquest(2).unwrap().unwrap().subquest_id, 10);
        assert!(store.next_subquest(10).unwrap().is_none());
    }

    #[test]
    fn seeding_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        let mut bundle = ContentBundle::default();
        bundle.quests.push(QuestRecord::new(1, "Intro"));
        {
            let store = ContentStoreBuilder::new(dir.path())
                .with_seed(bundle.clone())
                .open()
                .expect("store");
            store.put(&QuestRecord::new(1, "Renamed")).unwrap();
        }
        let store = ContentStoreBuilder::new(dir.path())
            .with_seed(bundle)
            .open()
            .expect("reopen");
        let quest: QuestRecord = store.get_by_id(1).unwrap();
        assert_eq!(quest.title, "Renamed", "should not reseed populated store");
    }
}

mod common;

use std::path::PathBuf;

use codyssey::content::{
    check_references, id_key, load_content_from_dir, starter_content, ContentStoreBuilder, DialogueRecord,
    QuestRecord,
};

fn seed_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/seeds")
}

#[test]
fn shipped_seed_dir_matches_embedded_content() {
    let from_disk = load_content_from_dir(seed_dir()).expect("seed dir loads");
    let embedded = starter_content().expect("embedded seeds");
    assert_eq!(from_disk.record_count(), embedded.record_count());
    assert!(check_references(&from_disk).is_empty());
}

#[test]
fn reseeding_replaces_rather_than_duplicates() {
    let (_dir, store) = common::seeded_store();
    let quests = store.count::<QuestRecord>().unwrap();
    let lines = store.count::<DialogueRecord>().unwrap();

    let bundle = load_content_from_dir(seed_dir()).unwrap();
    let written = store.load_bundle(&bundle).unwrap();
    assert_eq!(written, bundle.record_count());
    assert_eq!(store.count::<QuestRecord>().unwrap(), quests);
    assert_eq!(store.count::<DialogueRecord>().unwrap(), lines);
}

#[test]
fn builder_seeds_only_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let store = ContentStoreBuilder::new(&path)
            .with_seed(starter_content().unwrap())
            .open()
            .unwrap();
        store.delete::<QuestRecord>(&id_key(2)).unwrap();
    }

    // A seeded store keeps admin edits across restarts.
    let store = ContentStoreBuilder::new(&path)
        .with_seed(starter_content().unwrap())
        .open()
        .unwrap();
    assert!(store.is_seeded().unwrap());
    assert_eq!(
        store.count::<QuestRecord>().unwrap(),
        starter_content().unwrap().quests.len() - 1
    );
}

use std::sync::Arc;

use crate::evidence::{Evidence, EvidenceKind, Issuer};
use crate::identity::{PlayerId, StaticResolver};
use crate::infraction::Infraction;
use crate::persist::{MemoryBackend, PersistenceGateway, SqliteBackend, StorageBackend};
use crate::store::InfractionStore;

fn empty_store() -> InfractionStore {
    InfractionStore::new(Arc::new(StaticResolver::new()))
}

fn populate(store: &InfractionStore, players: usize) {
    for n in 0..players {
        let id = PlayerId::random();
        let dossier = store.dossier(id);
        dossier.complete(format!("Player{n}"));
        dossier.record_address(format!("10.0.0.{n}").parse().unwrap());
        dossier.cite(Arc::new(Infraction::new(
            id,
            1_700_000_000_000 + n as u64,
            "griefing",
            3,
            Issuer::external("console"),
            vec![Evidence::new(
                Issuer::external("console"),
                EvidenceKind::OtherUrl,
                1_700_000_000_000 + n as u64,
                "No proof.",
            )],
        )));
    }
}

#[test]
fn save_then_load_restores_every_dossier() {
    let source = empty_store();
    populate(&source, 3);

    let backend = Arc::new(MemoryBackend::new());
    let gateway = PersistenceGateway::new(backend.clone());
    assert_eq!(gateway.save_from(&source).unwrap(), 3);
    assert_eq!(backend.len(), 3);

    let restored = empty_store();
    assert_eq!(gateway.load_into(&restored).unwrap(), 3);
    assert_eq!(restored.len(), 3);
    assert_eq!(restored.all_infractions().len(), 3);
    for dossier in restored.all_dossiers() {
        assert!(dossier.is_complete());
        assert_eq!(dossier.score(), 3);
        assert_eq!(dossier.associated_addresses().len(), 1);
    }
}

#[test]
fn persistence_round_trip_is_idempotent() {
    let source = empty_store();
    populate(&source, 4);

    let first = Arc::new(MemoryBackend::new());
    PersistenceGateway::new(first.clone())
        .save_from(&source)
        .unwrap();

    // load → save → load → save must reproduce the identical snapshot.
    let intermediate = empty_store();
    PersistenceGateway::new(first.clone())
        .load_into(&intermediate)
        .unwrap();
    let second = Arc::new(MemoryBackend::new());
    PersistenceGateway::new(second.clone())
        .save_from(&intermediate)
        .unwrap();

    assert_eq!(first.dump(), second.dump());
}

#[test]
fn one_corrupt_record_does_not_abort_the_load() {
    let source = empty_store();
    populate(&source, 9);

    let backend = Arc::new(MemoryBackend::new());
    let gateway = PersistenceGateway::new(backend.clone());
    gateway.save_from(&source).unwrap();
    backend.insert_raw("not-a-uuid", "{ definitely not json");

    let restored = empty_store();
    assert_eq!(gateway.load_into(&restored).unwrap(), 9);
    assert_eq!(restored.len(), 9);
}

#[test]
fn partial_dossiers_survive_the_round_trip() {
    let source = empty_store();
    let id = PlayerId::random();
    source.dossier(id); // never completed

    let backend = Arc::new(MemoryBackend::new());
    let gateway = PersistenceGateway::new(backend);
    gateway.save_from(&source).unwrap();

    let restored = empty_store();
    gateway.load_into(&restored).unwrap();
    let dossier = restored.dossier(id);
    assert!(!dossier.is_complete());
}

#[test]
fn clear_erases_durable_state() {
    let source = empty_store();
    populate(&source, 2);

    let backend = Arc::new(MemoryBackend::new());
    let gateway = PersistenceGateway::new(backend.clone());
    gateway.save_from(&source).unwrap();
    assert!(!backend.is_empty());

    gateway.clear().unwrap();
    assert!(backend.is_empty());
    assert_eq!(gateway.load_into(&empty_store()).unwrap(), 0);
}

#[test]
fn sqlite_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("infractions.db");

    let source = empty_store();
    populate(&source, 5);
    {
        let backend = Arc::new(SqliteBackend::open(&path).unwrap());
        PersistenceGateway::new(backend).save_from(&source).unwrap();
    }

    let backend = Arc::new(SqliteBackend::open(&path).unwrap());
    let restored = empty_store();
    assert_eq!(
        PersistenceGateway::new(backend).load_into(&restored).unwrap(),
        5
    );
    assert_eq!(restored.len(), 5);
}

#[test]
fn sqlite_save_replaces_previous_snapshot() {
    let backend = SqliteBackend::in_memory().unwrap();

    let big = empty_store();
    populate(&big, 4);
    let small = empty_store();
    populate(&small, 1);

    let backend = Arc::new(backend);
    let gateway = PersistenceGateway::new(backend.clone());
    gateway.save_from(&big).unwrap();
    gateway.save_from(&small).unwrap();

    assert_eq!(backend.load_all().unwrap().len(), 1);
}

#[test]
fn sqlite_clear_then_load_is_empty() {
    let backend = Arc::new(SqliteBackend::in_memory().unwrap());
    let gateway = PersistenceGateway::new(backend.clone());

    let source = empty_store();
    populate(&source, 2);
    gateway.save_from(&source).unwrap();
    gateway.clear().unwrap();

    assert!(backend.load_all().unwrap().is_empty());
}

//! Concurrent access to a shared catalog.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use mediacat_core::{
    BrowseRequest, CatalogConfig, DatabaseConfig, MediaCatalog, NewResource, ResourceType,
    WellKnownContainer,
};

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

fn shared_catalog(temp_dir: &TempDir) -> Arc<MediaCatalog> {
    let database = DatabaseConfig {
        path: temp_dir.path().join("catalog.db"),
        ..DatabaseConfig::default()
    };
    let catalog = MediaCatalog::open(&database, &CatalogConfig::default())
        .expect("Failed to open catalog");
    catalog
        .ensure_well_known_tree()
        .expect("Failed to seed catalog");
    Arc::new(catalog)
}

#[test]
fn test_concurrent_id_allocation_is_unique() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = shared_catalog(&temp_dir);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| catalog.get_next_object_id())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "id {} allocated twice", id);
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_inserts_into_one_container() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = shared_catalog(&temp_dir);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let catalog = catalog.clone();
            thread::spawn(move || {
                let video = catalog
                    .well_known(WellKnownContainer::Video)
                    .unwrap()
                    .unwrap();
                for i in 0..PER_THREAD {
                    let clip = catalog
                        .create_object("object.item.videoItem", &format!("clip {t}-{i}"), true)
                        .unwrap();
                    catalog.initialize_object(&video, clip).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let result = catalog.browse(&BrowseRequest::children(1)).unwrap();
    assert_eq!(result.total_matches, THREADS * PER_THREAD);

    let unique: HashSet<_> = result.entries.iter().map(|e| e.id()).collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);
    assert_eq!(
        catalog.stats().unwrap().total_objects as usize,
        7 + THREADS * PER_THREAD
    );
}

#[test]
fn test_concurrent_lookups_share_one_instance() {
    let temp_dir = TempDir::new().unwrap();
    let database = DatabaseConfig {
        path: temp_dir.path().join("catalog.db"),
        ..DatabaseConfig::default()
    };
    let movie_id = {
        let catalog = shared_catalog(&temp_dir);
        let video = catalog.well_known(WellKnownContainer::Video).unwrap().unwrap();
        let movie = catalog
            .create_object("object.item.videoItem.movie", "Playtime", true)
            .unwrap();
        catalog.initialize_object(&video, movie).unwrap().id()
    };

    // Fresh process: nothing cached yet
    let catalog = Arc::new(MediaCatalog::open(&database, &CatalogConfig::default()).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let catalog = catalog.clone();
            thread::spawn(move || catalog.get_object_by_id(movie_id).unwrap().unwrap())
        })
        .collect();
    let loaded: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for handle in &loaded[1..] {
        assert!(handle.ptr_eq(&loaded[0]));
    }
}

#[test]
fn test_concurrent_delete_and_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = shared_catalog(&temp_dir);
    let audio = catalog.well_known(WellKnownContainer::Audio).unwrap().unwrap();

    let tracks: Vec<_> = (0..PER_THREAD)
        .map(|i| {
            let track = catalog
                .create_object("object.item.audioItem", &format!("track {i}"), true)
                .unwrap();
            catalog.initialize_object(&audio, track).unwrap()
        })
        .collect();
    let ids: Vec<_> = tracks.iter().map(|t| t.id()).collect();

    let deleter = {
        let catalog = catalog.clone();
        thread::spawn(move || {
            for track in tracks {
                catalog.delete_object(&track).unwrap();
            }
        })
    };
    let reader = {
        let catalog = catalog.clone();
        let ids = ids.clone();
        thread::spawn(move || {
            for _ in 0..4 {
                for id in &ids {
                    if let Some(handle) = catalog.get_object_by_id(*id).unwrap() {
                        let _ = handle.read().unwrap().title().len();
                    }
                }
            }
        })
    };
    deleter.join().unwrap();
    reader.join().unwrap();

    for id in ids {
        assert!(catalog.get_object_by_id(id).unwrap().is_none());
    }
    let audio = audio.read().unwrap();
    assert_eq!(audio.as_container().unwrap().child_count(), 0);
}

#[test]
fn test_record_timer_flag_fires_once_under_concurrent_saves() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = shared_catalog(&temp_dir);
    let video = catalog.well_known(WellKnownContainer::Video).unwrap().unwrap();

    for round in 0..PER_THREAD {
        let recording = catalog
            .create_object("object.item.videoItem", &format!("recording {round}"), true)
            .unwrap();
        let recording = catalog.initialize_object(&video, recording).unwrap();
        let resource = catalog
            .add_resource(
                &recording,
                NewResource {
                    record_timer_flag: true,
                    ..NewResource::new(
                        ResourceType::Recording,
                        format!("/recordings/{round}.ts"),
                        "http-get:*:video/mpeg:*",
                        "video/mpeg",
                    )
                },
            )
            .unwrap();

        let savers: Vec<_> = (0..THREADS / 2)
            .map(|_| {
                let catalog = catalog.clone();
                let recording = recording.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        catalog.save_object(&recording).unwrap();
                    }
                })
            })
            .collect();
        let takers: Vec<_> = (0..THREADS / 2)
            .map(|_| {
                let catalog = catalog.clone();
                thread::spawn(move || {
                    (0..10)
                        .filter(|_| catalog.take_record_timer_flag(resource.id).unwrap().is_some())
                        .count()
                })
            })
            .collect();

        for saver in savers {
            saver.join().unwrap();
        }
        let fired: usize = takers.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(fired, 1, "round {round}");

        catalog.save_object(&recording).unwrap();
        let stored = catalog.get_resource(resource.id).unwrap().unwrap();
        assert!(!stored.record_timer_flag, "round {round}");
    }
}

//! Browse integration tests.

use mediacat_core::model::ClassFilter;
use mediacat_core::{
    BrowseError, BrowseFlag, BrowseRequest, CatalogConfig, ClassTag, EntryHandle, MediaCatalog,
    WellKnownContainer,
};

fn seeded(config: &CatalogConfig) -> MediaCatalog {
    let catalog = MediaCatalog::in_memory(config).expect("Failed to create catalog");
    catalog.ensure_well_known_tree().expect("Failed to seed catalog");
    catalog
}

fn add_movies(catalog: &MediaCatalog, titles: &[&str]) -> Vec<EntryHandle> {
    let video = catalog.well_known(WellKnownContainer::Video).unwrap().unwrap();
    titles
        .iter()
        .map(|title| {
            let movie = catalog
                .create_object("object.item.videoItem.movie", title, true)
                .unwrap();
            catalog.initialize_object(&video, movie).unwrap()
        })
        .collect()
}

fn titles(entries: &[EntryHandle]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.read().unwrap().title().to_string())
        .collect()
}

#[test]
fn test_browse_root_with_single_child() {
    let catalog = MediaCatalog::in_memory(&CatalogConfig::default()).unwrap();

    let root = catalog
        .create_object("object.container", "Root", true)
        .unwrap();
    let root = catalog.initialize_object_with_id(None, root, 0).unwrap();

    let mut video = catalog
        .create_object("object.container", "Video", true)
        .unwrap();
    video.container_mut().unwrap().search_classes =
        vec![ClassFilter::new(ClassTag::VideoItem, true)];
    catalog
        .initialize_object_with_id(Some(&root), video, 1)
        .unwrap();

    let result = catalog.browse(&BrowseRequest::children(0)).unwrap();
    assert_eq!(result.number_returned, 1);
    assert_eq!(result.total_matches, 1);
    assert_eq!(result.entries[0].id(), 1);
}

#[test]
fn test_browse_metadata_returns_object() {
    let catalog = seeded(&CatalogConfig::default());

    let result = catalog.browse(&BrowseRequest::metadata(3)).unwrap();
    assert_eq!(result.number_returned, 1);
    assert_eq!(result.entries[0].read().unwrap().title(), "TV");
    assert_eq!(result.update_id, catalog.system_update_id().unwrap());
}

#[test]
fn test_browse_children_in_insertion_order() {
    let catalog = seeded(&CatalogConfig::default());
    add_movies(&catalog, &["Metropolis", "Alphaville", "Brazil"]);

    let result = catalog.browse(&BrowseRequest::children(1)).unwrap();
    assert_eq!(titles(&result.entries), ["Metropolis", "Alphaville", "Brazil"]);
}

#[test]
fn test_browse_sorted_with_window() {
    let catalog = seeded(&CatalogConfig::default());
    add_movies(&catalog, &["metropolis", "Alphaville", "Brazil", "Solaris"]);

    let request = BrowseRequest::children(1)
        .sorted_by("+dc:title")
        .with_range(1, 2);
    let result = catalog.browse(&request).unwrap();
    assert_eq!(titles(&result.entries), ["Brazil", "metropolis"]);
    assert_eq!(result.number_returned, 2);
    assert_eq!(result.total_matches, 4);

    let request = BrowseRequest::children(1).sorted_by("-dc:title");
    let result = catalog.browse(&request).unwrap();
    assert_eq!(
        titles(&result.entries),
        ["Solaris", "metropolis", "Brazil", "Alphaville"]
    );
}

#[test]
fn test_browse_offset_past_end_is_empty() {
    let catalog = seeded(&CatalogConfig::default());

    let result = catalog
        .browse(&BrowseRequest::children(0).with_range(6, 0))
        .unwrap();
    assert_eq!(result.number_returned, 0);
    assert_eq!(result.total_matches, 6);
    assert!(result.entries.is_empty());
}

#[test]
fn test_browse_reports_container_update_id() {
    let catalog = seeded(&CatalogConfig::default());
    let before = catalog.browse(&BrowseRequest::children(1)).unwrap().update_id;
    add_movies(&catalog, &["Stalker"]);
    let after = catalog.browse(&BrowseRequest::children(1)).unwrap().update_id;
    assert!(after > before);
}

#[test]
fn test_browse_errors() {
    let catalog = seeded(&CatalogConfig::default());
    let movie = add_movies(&catalog, &["Ran"]).remove(0);

    assert_eq!(
        catalog.browse(&BrowseRequest::children(4242)).unwrap_err(),
        BrowseError::NoSuchObject(4242)
    );
    assert_eq!(
        catalog.browse(&BrowseRequest::children(movie.id())).unwrap_err(),
        BrowseError::NoSuchObject(movie.id())
    );
    assert!(matches!(
        catalog.browse(&BrowseRequest::children(1).sorted_by("dc:title")),
        Err(BrowseError::InvalidSortCriteria(_))
    ));
    assert!(matches!(
        catalog.browse(&BrowseRequest::children(4242).sorted_by("+bogus:property")),
        Err(BrowseError::InvalidSortCriteria(_))
    ));
}

#[test]
fn test_hidden_subtrees_are_suppressed() {
    let config = CatalogConfig {
        hidden_subtrees: vec![WellKnownContainer::Radio, WellKnownContainer::RecordTimers],
        ..CatalogConfig::default()
    };
    let catalog = seeded(&config);

    let result = catalog.browse(&BrowseRequest::children(0)).unwrap();
    let ids: Vec<_> = result.entries.iter().map(|e| e.id()).collect();
    assert_eq!(ids, [1, 2, 3, 5]);
    assert_eq!(result.total_matches, 4);

    let request = BrowseRequest {
        flag: BrowseFlag::Metadata,
        ..BrowseRequest::children(WellKnownContainer::Radio.id())
    };
    assert_eq!(
        catalog.browse(&request).unwrap_err(),
        BrowseError::NoSuchObject(4)
    );

    // Still reachable by id
    assert!(catalog.get_object_by_id(4).unwrap().is_some());
}

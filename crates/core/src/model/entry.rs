//! The catalog entry and its shared handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::class::ClassTag;
use super::container::Container;
use super::item::{EpgContainerProps, Item, ItemKind};
use super::property::{boolean, integer, text, PropertyLevel, PropertyValue, READ_ONLY_PROPERTIES};
use super::resource::Resource;
use super::{ModelError, ObjectId, NO_PARENT, NO_REFERENCE};

/// Lifecycle of an entry.
///
/// `Transient -> Persisted -> Cached -> Detached`; `Detached` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Transient,
    Persisted,
    Cached,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    #[default]
    Unknown,
    Writable,
    NotWritable,
    Protected,
    Mixed,
}

impl WriteStatus {
    pub fn code(self) -> i64 {
        match self {
            WriteStatus::Unknown => 0,
            WriteStatus::Writable => 1,
            WriteStatus::NotWritable => 2,
            WriteStatus::Protected => 3,
            WriteStatus::Mixed => 4,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, ModelError> {
        match code {
            0 => Ok(WriteStatus::Unknown),
            1 => Ok(WriteStatus::Writable),
            2 => Ok(WriteStatus::NotWritable),
            3 => Ok(WriteStatus::Protected),
            4 => Ok(WriteStatus::Mixed),
            other => Err(ModelError::InvalidWriteStatus(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryBody {
    Item(Item),
    Container(Container),
}

/// A node of the catalog tree.
///
/// Entries are built by the persistence dispatcher and only reach other
/// threads through an [`EntryHandle`] held by the identity cache. Every
/// successful mutation refreshes `last_modified`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub(crate) id: Option<ObjectId>,
    pub(crate) parent_id: ObjectId,
    pub(crate) class: ClassTag,
    pub(crate) title: String,
    pub(crate) creator: Option<String>,
    pub(crate) restricted: bool,
    pub(crate) write_status: WriteStatus,
    pub(crate) resources: Vec<Resource>,
    pub(crate) last_modified: DateTime<Utc>,
    pub(crate) state: EntryState,
    pub(crate) body: EntryBody,
    /// Fast-find keys registered with the next save.
    #[serde(skip)]
    pub(crate) pending_fast_find: Vec<String>,
}

impl CatalogEntry {
    /// A transient entry of a concrete class.
    pub(crate) fn new(class: ClassTag, title: &str, restricted: bool) -> Result<Self, ModelError> {
        if class.is_abstract() {
            return Err(ModelError::AbstractClass(class));
        }
        if title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }
        let mut entry = Self::blank(class)?;
        entry.title = title.to_string();
        entry.restricted = restricted;
        Ok(entry)
    }

    /// An entry shell for the mediator chain to fill from storage.
    pub(crate) fn blank(class: ClassTag) -> Result<Self, ModelError> {
        let body = if class.is_container() {
            let epg = (class == ClassTag::EpgContainer).then(EpgContainerProps::default);
            EntryBody::Container(Container::new(epg))
        } else {
            let kind = ItemKind::for_class(class).ok_or(ModelError::AbstractClass(class))?;
            EntryBody::Item(Item::new(kind))
        };

        Ok(Self {
            id: None,
            parent_id: NO_PARENT,
            class,
            title: String::new(),
            creator: None,
            restricted: true,
            write_status: WriteStatus::default(),
            resources: Vec::new(),
            last_modified: Utc::now(),
            state: EntryState::Transient,
            body,
            pending_fast_find: Vec::new(),
        })
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn parent_id(&self) -> ObjectId {
        self.parent_id
    }

    pub fn class(&self) -> ClassTag {
        self.class
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    pub fn restricted(&self) -> bool {
        self.restricted
    }

    pub fn write_status(&self) -> WriteStatus {
        self.write_status
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == NO_PARENT
    }

    pub fn is_container(&self) -> bool {
        matches!(self.body, EntryBody::Container(_))
    }

    pub fn body(&self) -> &EntryBody {
        &self.body
    }

    pub fn as_item(&self) -> Option<&Item> {
        match &self.body {
            EntryBody::Item(item) => Some(item),
            EntryBody::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.body {
            EntryBody::Container(container) => Some(container),
            EntryBody::Item(_) => None,
        }
    }

    /// Mutable access to the item variant state; counts as a mutation.
    pub fn item_kind_mut(&mut self) -> Option<&mut ItemKind> {
        self.touch();
        match &mut self.body {
            EntryBody::Item(item) => Some(&mut item.kind),
            EntryBody::Container(_) => None,
        }
    }

    /// Mutable access to container settings; counts as a mutation.
    ///
    /// The child set itself only changes through [`CatalogEntry::add_child`]
    /// and [`CatalogEntry::remove_child`].
    pub fn container_mut(&mut self) -> Option<&mut Container> {
        self.touch();
        match &mut self.body {
            EntryBody::Container(container) => Some(container),
            EntryBody::Item(_) => None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), ModelError> {
        if title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }
        self.title = title.to_string();
        self.touch();
        Ok(())
    }

    pub fn set_creator(&mut self, creator: Option<&str>) {
        self.creator = creator.map(str::to_string);
        self.touch();
    }

    pub fn set_restricted(&mut self, restricted: bool) {
        self.restricted = restricted;
        self.touch();
    }

    pub fn set_write_status(&mut self, status: WriteStatus) {
        self.write_status = status;
        self.touch();
    }

    /// Point this item at another item, or clear the alias with [`NO_REFERENCE`].
    pub fn set_reference_id(&mut self, reference_id: ObjectId) -> Result<(), ModelError> {
        let own_id = self.id;
        let EntryBody::Item(item) = &mut self.body else {
            return Err(ModelError::UnknownProperty("@refID".to_string()));
        };
        if reference_id != NO_REFERENCE && (reference_id < 0 || Some(reference_id) == own_id) {
            return Err(ModelError::InvalidReference(reference_id));
        }
        item.reference_id = reference_id;
        self.touch();
        Ok(())
    }

    /// Register `key` in the fast-find index when this entry is next saved.
    pub fn add_fast_find_key(&mut self, key: &str) {
        if !self.pending_fast_find.iter().any(|k| k == key) {
            self.pending_fast_find.push(key.to_string());
        }
    }

    /// Make `child` a child of this container.
    ///
    /// Sets the child's parent, appends it to the ordered child list and the
    /// id index, and bumps the container's update id.
    pub fn add_child(&mut self, child: &mut CatalogEntry) -> Result<(), ModelError> {
        let parent_id = self.id.ok_or(ModelError::NotPersisted)?;
        let child_id = child.id.ok_or(ModelError::NotPersisted)?;
        let EntryBody::Container(container) = &mut self.body else {
            return Err(ModelError::NotAContainer(parent_id));
        };
        if child_id == parent_id {
            return Err(ModelError::InvalidReference(child_id));
        }
        container.insert_child(child_id);
        child.parent_id = parent_id;
        child.touch();
        self.touch();
        Ok(())
    }

    /// Detach `child` from this container and clear its parent reference.
    pub fn remove_child(&mut self, child: &mut CatalogEntry) -> Result<bool, ModelError> {
        let child_id = child.id.ok_or(ModelError::NotPersisted)?;
        let removed = self.remove_child_id(child_id)?;
        if removed {
            child.parent_id = NO_PARENT;
            child.touch();
        }
        Ok(removed)
    }

    /// Drop `child_id` from the child set when the child entry itself is not at hand.
    pub(crate) fn remove_child_id(&mut self, child_id: ObjectId) -> Result<bool, ModelError> {
        let own_id = self.id.unwrap_or(NO_PARENT);
        let EntryBody::Container(container) = &mut self.body else {
            return Err(ModelError::NotAContainer(own_id));
        };
        let removed = container.remove_child(child_id);
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Check every invariant required before the entry may be persisted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }
        match &self.body {
            EntryBody::Item(item) => item.kind.validate(),
            EntryBody::Container(_) => Ok(()),
        }
    }

    /// Read a property by name.
    pub fn get_property(&self, name: &str) -> Result<PropertyValue, ModelError> {
        if !self.class.has_property(name) {
            return Err(ModelError::UnknownProperty(name.to_string()));
        }

        let value = match name {
            "@id" => Some(PropertyValue::Integer(self.id.unwrap_or(NO_PARENT))),
            "@parentID" => Some(PropertyValue::Integer(self.parent_id)),
            "upnp:class" => Some(PropertyValue::Text(self.class.as_str().to_string())),
            "dc:title" => Some(PropertyValue::Text(self.title.clone())),
            "dc:creator" => Some(PropertyValue::Text(
                self.creator.clone().unwrap_or_default(),
            )),
            "@restricted" => Some(PropertyValue::Bool(self.restricted)),
            "upnp:writeStatus" => Some(PropertyValue::Integer(self.write_status.code())),
            _ => None,
        };
        if let Some(value) = value {
            return Ok(value);
        }

        let value = match &self.body {
            EntryBody::Item(item) => match name {
                "@refID" => Some(PropertyValue::Integer(item.reference_id)),
                _ => item.kind.property(name),
            },
            EntryBody::Container(container) => match name {
                "@childCount" => Some(PropertyValue::Integer(container.child_count() as i64)),
                "@searchable" => Some(PropertyValue::Bool(container.searchable)),
                "upnp:containerUpdateID" => Some(PropertyValue::Integer(container.update_id())),
                _ => container.epg.as_ref().and_then(|epg| epg.get(name)),
            },
        };
        value.ok_or_else(|| ModelError::UnknownProperty(name.to_string()))
    }

    /// Write a property by name. A rejected value leaves the entry unchanged.
    pub fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), ModelError> {
        if !self.class.has_property(name) {
            return Err(ModelError::UnknownProperty(name.to_string()));
        }
        if READ_ONLY_PROPERTIES.contains(&name) {
            return Err(ModelError::ReadOnlyProperty(name.to_string()));
        }

        match name {
            "dc:title" => return self.set_title(&text(name, value)?),
            "dc:creator" => {
                let creator = text(name, value)?;
                self.set_creator((!creator.is_empty()).then_some(creator.as_str()));
                return Ok(());
            }
            "@restricted" => {
                self.set_restricted(boolean(name, value)?);
                return Ok(());
            }
            "upnp:writeStatus" => {
                self.set_write_status(WriteStatus::from_code(integer(name, value)?)?);
                return Ok(());
            }
            "@refID" => return self.set_reference_id(integer(name, value)?),
            _ => {}
        }

        let outcome = match &mut self.body {
            EntryBody::Item(item) => item.kind.set_property(name, value),
            EntryBody::Container(container) => match name {
                "@searchable" => Some(boolean(name, value).map(|b| {
                    container.searchable = b;
                })),
                _ => container.epg.as_mut().and_then(|epg| epg.set(name, value)),
            },
        };
        match outcome {
            Some(result) => {
                result?;
                self.touch();
                Ok(())
            }
            None => Err(ModelError::UnknownProperty(name.to_string())),
        }
    }
}

/// Shared, lockable reference to a cached entry.
///
/// Clones point at the same in-memory instance.
#[derive(Debug, Clone)]
pub struct EntryHandle {
    id: ObjectId,
    inner: Arc<RwLock<CatalogEntry>>,
}

impl EntryHandle {
    pub(crate) fn new(id: ObjectId, entry: CatalogEntry) -> Self {
        Self {
            id,
            inner: Arc::new(RwLock::new(entry)),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, CatalogEntry>, ModelError> {
        self.inner.read().map_err(|_| ModelError::Poisoned(self.id))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogEntry>, ModelError> {
        self.inner.write().map_err(|_| ModelError::Poisoned(self.id))
    }

    /// Whether both handles refer to the same in-memory instance.
    pub fn ptr_eq(&self, other: &EntryHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(class: ClassTag, title: &str, id: ObjectId) -> CatalogEntry {
        let mut entry = CatalogEntry::new(class, title, true).unwrap();
        entry.id = Some(id);
        entry.state = EntryState::Persisted;
        entry
    }

    #[test]
    fn test_new_rejects_abstract_and_empty_title() {
        assert_eq!(
            CatalogEntry::new(ClassTag::Item, "x", true),
            Err(ModelError::AbstractClass(ClassTag::Item))
        );
        assert_eq!(
            CatalogEntry::new(ClassTag::Object, "x", true),
            Err(ModelError::AbstractClass(ClassTag::Object))
        );
        assert_eq!(
            CatalogEntry::new(ClassTag::Movie, "   ", true),
            Err(ModelError::EmptyTitle)
        );
    }

    #[test]
    fn test_new_entry_is_transient() {
        let entry = CatalogEntry::new(ClassTag::EpgContainer, "Das Erste", true).unwrap();
        assert_eq!(entry.state(), EntryState::Transient);
        assert_eq!(entry.id(), None);
        assert!(entry.is_container());
        assert!(entry.as_container().unwrap().epg.is_some());
    }

    #[test]
    fn test_set_title_rejects_empty_without_mutation() {
        let mut entry = CatalogEntry::new(ClassTag::VideoItem, "Clip", true).unwrap();
        assert_eq!(entry.set_title(""), Err(ModelError::EmptyTitle));
        assert_eq!(entry.title(), "Clip");
    }

    #[test]
    fn test_mutation_refreshes_last_modified() {
        let mut entry = CatalogEntry::new(ClassTag::VideoItem, "Clip", true).unwrap();
        let before = entry.last_modified();
        std::thread::sleep(std::time::Duration::from_millis(2));
        entry.set_restricted(false);
        assert!(entry.last_modified() > before);
    }

    #[test]
    fn test_add_child_links_both_sides() {
        let mut parent = persisted(ClassTag::Container, "Video", 1);
        let mut child = persisted(ClassTag::Movie, "Metropolis", 100);
        let before = parent.as_container().unwrap().update_id();

        parent.add_child(&mut child).unwrap();

        assert_eq!(child.parent_id(), 1);
        let container = parent.as_container().unwrap();
        assert!(container.contains(100));
        assert_eq!(container.children(), &[100]);
        assert!(container.update_id() > before);
    }

    #[test]
    fn test_remove_child_clears_parent_reference() {
        let mut parent = persisted(ClassTag::Container, "Video", 1);
        let mut child = persisted(ClassTag::Movie, "Metropolis", 100);
        parent.add_child(&mut child).unwrap();
        let before = parent.as_container().unwrap().update_id();

        assert!(parent.remove_child(&mut child).unwrap());

        assert_eq!(child.parent_id(), NO_PARENT);
        assert!(!parent.as_container().unwrap().contains(100));
        assert!(parent.as_container().unwrap().update_id() > before);
    }

    #[test]
    fn test_add_child_to_item_fails() {
        let mut item = persisted(ClassTag::VideoItem, "Clip", 5);
        let mut child = persisted(ClassTag::VideoItem, "Other", 6);
        assert_eq!(item.add_child(&mut child), Err(ModelError::NotAContainer(5)));
        assert_eq!(child.parent_id(), NO_PARENT);
    }

    #[test]
    fn test_get_and_set_properties() {
        let mut entry = persisted(ClassTag::VideoBroadcast, "Channel 5", 120);
        entry.set_property("upnp:channelNr", &5i64.into()).unwrap();
        entry.set_property("upnp:genre", &"News".into()).unwrap();
        entry.set_property("dc:creator", &"Broadcaster".into()).unwrap();

        assert_eq!(entry.get_property("@id").unwrap(), PropertyValue::Integer(120));
        assert_eq!(entry.get_property("upnp:channelNr").unwrap(), PropertyValue::Integer(5));
        assert_eq!(entry.get_property("upnp:genre").unwrap(), "News".into());
        assert_eq!(entry.creator(), Some("Broadcaster"));
        assert_eq!(
            entry.get_property("upnp:class").unwrap(),
            "object.item.videoItem.videoBroadcast".into()
        );
    }

    #[test]
    fn test_set_property_errors() {
        let mut entry = persisted(ClassTag::Movie, "Metropolis", 101);
        assert_eq!(
            entry.set_property("@id", &7i64.into()),
            Err(ModelError::ReadOnlyProperty("@id".to_string()))
        );
        assert_eq!(
            entry.set_property("upnp:channelNr", &7i64.into()),
            Err(ModelError::UnknownProperty("upnp:channelNr".to_string()))
        );
        assert_eq!(
            entry.set_property("upnp:DVDRegionCode", &12i64.into()),
            Err(ModelError::InvalidRegionCode(12))
        );
        assert!(matches!(
            entry.set_property("dc:title", &5i64.into()),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert_eq!(
            entry.set_property("upnp:writeStatus", &9i64.into()),
            Err(ModelError::InvalidWriteStatus(9))
        );
        assert_eq!(entry.write_status(), WriteStatus::Unknown);
    }

    #[test]
    fn test_container_properties() {
        let mut entry = persisted(ClassTag::EpgContainer, "Das Erste", 130);
        entry.set_property("@searchable", &true.into()).unwrap();
        entry.set_property("epg:channelID", &"C1-1051-28106".into()).unwrap();

        assert_eq!(entry.get_property("@childCount").unwrap(), PropertyValue::Integer(0));
        assert_eq!(entry.get_property("@searchable").unwrap(), true.into());
        assert_eq!(
            entry.get_property("epg:channelID").unwrap(),
            "C1-1051-28106".into()
        );
        assert!(entry.get_property("@refID").is_err());
    }

    #[test]
    fn test_reference_cannot_point_at_itself() {
        let mut entry = persisted(ClassTag::VideoItem, "Alias", 150);
        assert_eq!(
            entry.set_reference_id(150),
            Err(ModelError::InvalidReference(150))
        );
        entry.set_reference_id(149).unwrap();
        assert_eq!(entry.as_item().unwrap().reference_id(), 149);
        entry.set_reference_id(NO_REFERENCE).unwrap();
        assert!(!entry.as_item().unwrap().is_reference());
    }

    #[test]
    fn test_write_status_codes() {
        for code in 0..=4 {
            assert_eq!(WriteStatus::from_code(code).unwrap().code(), code);
        }
        assert_eq!(
            WriteStatus::from_code(-1),
            Err(ModelError::InvalidWriteStatus(-1))
        );
    }

    #[test]
    fn test_handle_clones_share_instance() {
        let handle = EntryHandle::new(1, persisted(ClassTag::Container, "Video", 1));
        let clone = handle.clone();
        assert!(handle.ptr_eq(&clone));

        clone.write().unwrap().set_title("Videos").unwrap();
        assert_eq!(handle.read().unwrap().title(), "Videos");

        let other = EntryHandle::new(1, persisted(ClassTag::Container, "Video", 1));
        assert!(!handle.ptr_eq(&other));
    }
}

//! Class tags of the catalog entry hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::item::{
    AudioBroadcastProps, AudioItemProps, AudioRecordProps, EpgContainerProps, EpgItemProps,
    MovieProps, RecordTimerProps, VideoBroadcastProps, VideoItemProps,
};
use super::property::{PropertyLevel, CONTAINER_PROPERTIES, ITEM_PROPERTIES, OBJECT_PROPERTIES};
use super::ModelError;

/// Closed set of catalog entry variants.
///
/// Every tag except [`ClassTag::Object`] extends exactly one parent tag; the
/// chain from the root to a tag is its [`lineage`](ClassTag::lineage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassTag {
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "object.item")]
    Item,
    #[serde(rename = "object.item.videoItem")]
    VideoItem,
    #[serde(rename = "object.item.audioItem")]
    AudioItem,
    #[serde(rename = "object.item.videoItem.movie")]
    Movie,
    #[serde(rename = "object.item.audioItem.audioRecord")]
    AudioRecord,
    #[serde(rename = "object.item.videoItem.videoBroadcast")]
    VideoBroadcast,
    #[serde(rename = "object.item.audioItem.audioBroadcast")]
    AudioBroadcast,
    #[serde(rename = "object.item.epgItem")]
    EpgItem,
    #[serde(rename = "object.item.recordTimerItem")]
    RecordTimerItem,
    #[serde(rename = "object.container")]
    Container,
    #[serde(rename = "object.container.epgContainer")]
    EpgContainer,
}

impl ClassTag {
    pub const ALL: [ClassTag; 12] = [
        ClassTag::Object,
        ClassTag::Item,
        ClassTag::VideoItem,
        ClassTag::AudioItem,
        ClassTag::Movie,
        ClassTag::AudioRecord,
        ClassTag::VideoBroadcast,
        ClassTag::AudioBroadcast,
        ClassTag::EpgItem,
        ClassTag::RecordTimerItem,
        ClassTag::Container,
        ClassTag::EpgContainer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassTag::Object => "object",
            ClassTag::Item => "object.item",
            ClassTag::VideoItem => "object.item.videoItem",
            ClassTag::AudioItem => "object.item.audioItem",
            ClassTag::Movie => "object.item.videoItem.movie",
            ClassTag::AudioRecord => "object.item.audioItem.audioRecord",
            ClassTag::VideoBroadcast => "object.item.videoItem.videoBroadcast",
            ClassTag::AudioBroadcast => "object.item.audioItem.audioBroadcast",
            ClassTag::EpgItem => "object.item.epgItem",
            ClassTag::RecordTimerItem => "object.item.recordTimerItem",
            ClassTag::Container => "object.container",
            ClassTag::EpgContainer => "object.container.epgContainer",
        }
    }

    /// The tag this one extends, `None` for the root tag.
    pub fn parent(self) -> Option<ClassTag> {
        match self {
            ClassTag::Object => None,
            ClassTag::Item | ClassTag::Container => Some(ClassTag::Object),
            ClassTag::VideoItem
            | ClassTag::AudioItem
            | ClassTag::EpgItem
            | ClassTag::RecordTimerItem => Some(ClassTag::Item),
            ClassTag::Movie | ClassTag::VideoBroadcast => Some(ClassTag::VideoItem),
            ClassTag::AudioRecord | ClassTag::AudioBroadcast => Some(ClassTag::AudioItem),
            ClassTag::EpgContainer => Some(ClassTag::Container),
        }
    }

    /// Tags from the root down to (and including) this one.
    pub fn lineage(self) -> Vec<ClassTag> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Whether `self` is `ancestor` or extends it.
    pub fn derives_from(self, ancestor: ClassTag) -> bool {
        let mut current = Some(self);
        while let Some(tag) = current {
            if tag == ancestor {
                return true;
            }
            current = tag.parent();
        }
        false
    }

    /// Abstract tags cannot be instantiated or loaded.
    pub fn is_abstract(self) -> bool {
        matches!(self, ClassTag::Object | ClassTag::Item)
    }

    pub fn is_container(self) -> bool {
        self.derives_from(ClassTag::Container)
    }

    /// Properties introduced by this level alone.
    pub fn level_properties(self) -> &'static [&'static str] {
        match self {
            ClassTag::Object => OBJECT_PROPERTIES,
            ClassTag::Item => ITEM_PROPERTIES,
            ClassTag::VideoItem => VideoItemProps::NAMES,
            ClassTag::AudioItem => AudioItemProps::NAMES,
            ClassTag::Movie => MovieProps::NAMES,
            ClassTag::AudioRecord => AudioRecordProps::NAMES,
            ClassTag::VideoBroadcast => VideoBroadcastProps::NAMES,
            ClassTag::AudioBroadcast => AudioBroadcastProps::NAMES,
            ClassTag::EpgItem => EpgItemProps::NAMES,
            ClassTag::RecordTimerItem => RecordTimerProps::NAMES,
            ClassTag::Container => CONTAINER_PROPERTIES,
            ClassTag::EpgContainer => EpgContainerProps::NAMES,
        }
    }

    /// Every property an entry of this class exposes, root level first.
    pub fn properties(self) -> Vec<&'static str> {
        self.lineage()
            .into_iter()
            .flat_map(|tag| tag.level_properties().iter().copied())
            .collect()
    }

    pub fn has_property(self, name: &str) -> bool {
        self.lineage()
            .into_iter()
            .any(|tag| tag.level_properties().contains(&name))
    }
}

impl fmt::Display for ClassTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClassTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ModelError::UnknownClass(s.to_string()))
    }
}

/// Which list of a container a [`ClassFilter`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Search,
    Create,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Search => "search",
            FilterKind::Create => "create",
        }
    }
}

impl FromStr for FilterKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(FilterKind::Search),
            "create" => Ok(FilterKind::Create),
            other => Err(ModelError::UnknownClass(other.to_string())),
        }
    }
}

/// A class allowed for searching in, or creating under, a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassFilter {
    pub class: ClassTag,
    /// Also accept every class that extends `class`.
    pub include_derived: bool,
}

impl ClassFilter {
    pub fn new(class: ClassTag, include_derived: bool) -> Self {
        Self {
            class,
            include_derived,
        }
    }

    pub fn matches(&self, tag: ClassTag) -> bool {
        if self.include_derived {
            tag.derives_from(self.class)
        } else {
            tag == self.class
        }
    }
}

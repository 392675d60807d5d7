//! Fixed top-level containers.

use serde::{Deserialize, Serialize};

use crate::model::{ClassFilter, ClassTag, ObjectId};

/// First identifier handed out to dynamically created entries.
///
/// Everything below is reserved for the well-known containers.
pub const FIRST_DYNAMIC_ID: ObjectId = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKnownContainer {
    Root,
    Video,
    Audio,
    Tv,
    Radio,
    Epg,
    RecordTimers,
}

impl WellKnownContainer {
    /// Parents before children.
    pub const ALL: [WellKnownContainer; 7] = [
        WellKnownContainer::Root,
        WellKnownContainer::Video,
        WellKnownContainer::Audio,
        WellKnownContainer::Tv,
        WellKnownContainer::Radio,
        WellKnownContainer::Epg,
        WellKnownContainer::RecordTimers,
    ];

    pub fn id(self) -> ObjectId {
        match self {
            WellKnownContainer::Root => 0,
            WellKnownContainer::Video => 1,
            WellKnownContainer::Audio => 2,
            WellKnownContainer::Tv => 3,
            WellKnownContainer::Radio => 4,
            WellKnownContainer::Epg => 5,
            WellKnownContainer::RecordTimers => 6,
        }
    }

    /// Key in the `well_known_objects` table.
    pub fn name(self) -> &'static str {
        match self {
            WellKnownContainer::Root => "root",
            WellKnownContainer::Video => "video",
            WellKnownContainer::Audio => "audio",
            WellKnownContainer::Tv => "tv",
            WellKnownContainer::Radio => "radio",
            WellKnownContainer::Epg => "epg",
            WellKnownContainer::RecordTimers => "record_timers",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WellKnownContainer::Root => "Root",
            WellKnownContainer::Video => "Video",
            WellKnownContainer::Audio => "Audio",
            WellKnownContainer::Tv => "TV",
            WellKnownContainer::Radio => "Radio",
            WellKnownContainer::Epg => "Program Guide",
            WellKnownContainer::RecordTimers => "Record Timers",
        }
    }

    pub fn parent(self) -> Option<WellKnownContainer> {
        match self {
            WellKnownContainer::Root => None,
            _ => Some(WellKnownContainer::Root),
        }
    }

    pub fn search_classes(self) -> Vec<ClassFilter> {
        match self {
            WellKnownContainer::Root => Vec::new(),
            WellKnownContainer::Video => vec![ClassFilter::new(ClassTag::VideoItem, true)],
            WellKnownContainer::Audio => vec![ClassFilter::new(ClassTag::AudioItem, true)],
            WellKnownContainer::Tv => vec![ClassFilter::new(ClassTag::VideoBroadcast, false)],
            WellKnownContainer::Radio => vec![ClassFilter::new(ClassTag::AudioBroadcast, false)],
            WellKnownContainer::Epg => vec![
                ClassFilter::new(ClassTag::EpgContainer, false),
                ClassFilter::new(ClassTag::EpgItem, false),
            ],
            WellKnownContainer::RecordTimers => {
                vec![ClassFilter::new(ClassTag::RecordTimerItem, false)]
            }
        }
    }

    pub fn from_id(id: ObjectId) -> Option<WellKnownContainer> {
        WellKnownContainer::ALL.into_iter().find(|w| w.id() == id)
    }
}

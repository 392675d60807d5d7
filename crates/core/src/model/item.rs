//! Leaf entries and the columns each item variant adds.

use serde::Serialize;

use super::class::ClassTag;
use super::property::{
    assign_integer, assign_text, boolean, integer, PropertyLevel, PropertyValue,
};
use super::{ModelError, ObjectId, NO_REFERENCE};

/// Highest valid DVD region code (0 means region free).
pub const MAX_DVD_REGION_CODE: i64 = 8;

// ============================================================================
// Video / Audio base levels
// ============================================================================

/// Descriptive fields shared by every video item. Lists are comma separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoItemProps {
    pub genre: String,
    pub description: String,
    pub long_description: String,
    pub producers: String,
    pub rating: String,
    pub actors: String,
    pub directors: String,
    pub publishers: String,
    pub language: String,
    pub relations: String,
}

impl PropertyLevel for VideoItemProps {
    const NAMES: &'static [&'static str] = &[
        "upnp:genre",
        "dc:description",
        "upnp:longDescription",
        "upnp:producer",
        "upnp:rating",
        "upnp:actor",
        "upnp:director",
        "dc:publisher",
        "dc:language",
        "dc:relation",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "upnp:genre" => &self.genre,
            "dc:description" => &self.description,
            "upnp:longDescription" => &self.long_description,
            "upnp:producer" => &self.producers,
            "upnp:rating" => &self.rating,
            "upnp:actor" => &self.actors,
            "upnp:director" => &self.directors,
            "dc:publisher" => &self.publishers,
            "dc:language" => &self.language,
            "dc:relation" => &self.relations,
            _ => return None,
        };
        Some(PropertyValue::Text(value.clone()))
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        let slot = match name {
            "upnp:genre" => &mut self.genre,
            "dc:description" => &mut self.description,
            "upnp:longDescription" => &mut self.long_description,
            "upnp:producer" => &mut self.producers,
            "upnp:rating" => &mut self.rating,
            "upnp:actor" => &mut self.actors,
            "upnp:director" => &mut self.directors,
            "dc:publisher" => &mut self.publishers,
            "dc:language" => &mut self.language,
            "dc:relation" => &mut self.relations,
            _ => return None,
        };
        Some(assign_text(slot, name, value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioItemProps {
    pub genre: String,
    pub description: String,
    pub long_description: String,
    pub publishers: String,
    pub language: String,
    pub relations: String,
    pub rights: String,
}

impl PropertyLevel for AudioItemProps {
    const NAMES: &'static [&'static str] = &[
        "upnp:genre",
        "dc:description",
        "upnp:longDescription",
        "dc:publisher",
        "dc:language",
        "dc:relation",
        "dc:rights",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "upnp:genre" => &self.genre,
            "dc:description" => &self.description,
            "upnp:longDescription" => &self.long_description,
            "dc:publisher" => &self.publishers,
            "dc:language" => &self.language,
            "dc:relation" => &self.relations,
            "dc:rights" => &self.rights,
            _ => return None,
        };
        Some(PropertyValue::Text(value.clone()))
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        let slot = match name {
            "upnp:genre" => &mut self.genre,
            "dc:description" => &mut self.description,
            "upnp:longDescription" => &mut self.long_description,
            "dc:publisher" => &mut self.publishers,
            "dc:language" => &mut self.language,
            "dc:relation" => &mut self.relations,
            "dc:rights" => &mut self.rights,
            _ => return None,
        };
        Some(assign_text(slot, name, value))
    }
}

// ============================================================================
// Recordings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MovieProps {
    pub storage_medium: String,
    /// 0 (region free) through [`MAX_DVD_REGION_CODE`].
    pub dvd_region_code: i64,
    /// Channel the movie was recorded from.
    pub channel_name: String,
}

impl MovieProps {
    pub fn set_dvd_region_code(&mut self, code: i64) -> Result<(), ModelError> {
        if !(0..=MAX_DVD_REGION_CODE).contains(&code) {
            return Err(ModelError::InvalidRegionCode(code));
        }
        self.dvd_region_code = code;
        Ok(())
    }
}

impl PropertyLevel for MovieProps {
    const NAMES: &'static [&'static str] =
        &["upnp:storageMedium", "upnp:DVDRegionCode", "upnp:channelName"];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "upnp:storageMedium" => Some(PropertyValue::Text(self.storage_medium.clone())),
            "upnp:DVDRegionCode" => Some(PropertyValue::Integer(self.dvd_region_code)),
            "upnp:channelName" => Some(PropertyValue::Text(self.channel_name.clone())),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "upnp:storageMedium" => Some(assign_text(&mut self.storage_medium, name, value)),
            "upnp:DVDRegionCode" => {
                Some(integer(name, value).and_then(|code| self.set_dvd_region_code(code)))
            }
            "upnp:channelName" => Some(assign_text(&mut self.channel_name, name, value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioRecordProps {
    pub storage_medium: String,
    pub channel_name: String,
}

impl PropertyLevel for AudioRecordProps {
    const NAMES: &'static [&'static str] = &["upnp:storageMedium", "upnp:channelName"];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "upnp:storageMedium" => Some(PropertyValue::Text(self.storage_medium.clone())),
            "upnp:channelName" => Some(PropertyValue::Text(self.channel_name.clone())),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "upnp:storageMedium" => Some(assign_text(&mut self.storage_medium, name, value)),
            "upnp:channelName" => Some(assign_text(&mut self.channel_name, name, value)),
            _ => None,
        }
    }
}

// ============================================================================
// Broadcasts
// ============================================================================

fn checked_channel_nr(name: &str, value: &PropertyValue) -> Result<i64, ModelError> {
    let nr = integer(name, value)?;
    if nr <= 0 {
        return Err(ModelError::InvalidChannelNumber(nr));
    }
    Ok(nr)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoBroadcastProps {
    pub icon: String,
    pub region: String,
    /// Must be positive before the entry is persisted.
    pub channel_nr: i64,
    pub channel_name: String,
}

impl PropertyLevel for VideoBroadcastProps {
    const NAMES: &'static [&'static str] = &[
        "upnp:icon",
        "upnp:region",
        "upnp:channelNr",
        "upnp:channelName",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "upnp:icon" => Some(PropertyValue::Text(self.icon.clone())),
            "upnp:region" => Some(PropertyValue::Text(self.region.clone())),
            "upnp:channelNr" => Some(PropertyValue::Integer(self.channel_nr)),
            "upnp:channelName" => Some(PropertyValue::Text(self.channel_name.clone())),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "upnp:icon" => Some(assign_text(&mut self.icon, name, value)),
            "upnp:region" => Some(assign_text(&mut self.region, name, value)),
            "upnp:channelNr" => Some(checked_channel_nr(name, value).map(|nr| {
                self.channel_nr = nr;
            })),
            "upnp:channelName" => Some(assign_text(&mut self.channel_name, name, value)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioBroadcastProps {
    pub region: String,
    pub radio_call_sign: String,
    pub radio_station_id: String,
    pub radio_band: String,
    /// Must be positive before the entry is persisted.
    pub channel_nr: i64,
    pub channel_name: String,
}

impl PropertyLevel for AudioBroadcastProps {
    const NAMES: &'static [&'static str] = &[
        "upnp:region",
        "upnp:radioCallSign",
        "upnp:radioStationID",
        "upnp:radioBand",
        "upnp:channelNr",
        "upnp:channelName",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "upnp:region" => Some(PropertyValue::Text(self.region.clone())),
            "upnp:radioCallSign" => Some(PropertyValue::Text(self.radio_call_sign.clone())),
            "upnp:radioStationID" => Some(PropertyValue::Text(self.radio_station_id.clone())),
            "upnp:radioBand" => Some(PropertyValue::Text(self.radio_band.clone())),
            "upnp:channelNr" => Some(PropertyValue::Integer(self.channel_nr)),
            "upnp:channelName" => Some(PropertyValue::Text(self.channel_name.clone())),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "upnp:region" => Some(assign_text(&mut self.region, name, value)),
            "upnp:radioCallSign" => Some(assign_text(&mut self.radio_call_sign, name, value)),
            "upnp:radioStationID" => Some(assign_text(&mut self.radio_station_id, name, value)),
            "upnp:radioBand" => Some(assign_text(&mut self.radio_band, name, value)),
            "upnp:channelNr" => Some(checked_channel_nr(name, value).map(|nr| {
                self.channel_nr = nr;
            })),
            "upnp:channelName" => Some(assign_text(&mut self.channel_name, name, value)),
            _ => None,
        }
    }
}

// ============================================================================
// Program guide and scheduling
// ============================================================================

/// One broadcast event from the program guide. Times are Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpgItemProps {
    pub event_id: i64,
    pub channel_id: String,
    /// Length of the event in seconds.
    pub duration: i64,
    pub synopsis: String,
    pub start_time: i64,
    pub table_id: i64,
    pub version: i64,
}

impl EpgItemProps {
    pub fn end_time(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Whether an incoming guide section stamped `(table_id, version)`
    /// supersedes what this event was built from.
    pub fn is_outdated(&self, table_id: i64, version: i64) -> bool {
        self.table_id != table_id || self.version != version
    }
}

impl PropertyLevel for EpgItemProps {
    const NAMES: &'static [&'static str] = &[
        "epg:eventID",
        "epg:channelID",
        "epg:duration",
        "epg:synopsis",
        "epg:startTime",
        "epg:tableID",
        "epg:version",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "epg:eventID" => Some(PropertyValue::Integer(self.event_id)),
            "epg:channelID" => Some(PropertyValue::Text(self.channel_id.clone())),
            "epg:duration" => Some(PropertyValue::Integer(self.duration)),
            "epg:synopsis" => Some(PropertyValue::Text(self.synopsis.clone())),
            "epg:startTime" => Some(PropertyValue::Integer(self.start_time)),
            "epg:tableID" => Some(PropertyValue::Integer(self.table_id)),
            "epg:version" => Some(PropertyValue::Integer(self.version)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "epg:eventID" => Some(assign_integer(&mut self.event_id, name, value)),
            "epg:channelID" => Some(assign_text(&mut self.channel_id, name, value)),
            "epg:duration" => Some(assign_integer(&mut self.duration, name, value)),
            "epg:synopsis" => Some(assign_text(&mut self.synopsis, name, value)),
            "epg:startTime" => Some(assign_integer(&mut self.start_time, name, value)),
            "epg:tableID" => Some(assign_integer(&mut self.table_id, name, value)),
            "epg:version" => Some(assign_integer(&mut self.version, name, value)),
            _ => None,
        }
    }
}

/// A scheduled recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordTimerProps {
    pub status: i64,
    pub day: String,
    pub start: i64,
    pub stop: i64,
    pub priority: i64,
    pub lifetime: i64,
    /// Target file of the recording.
    pub file: String,
    pub channel_id: String,
}

impl PropertyLevel for RecordTimerProps {
    const NAMES: &'static [&'static str] = &[
        "timer:status",
        "timer:day",
        "timer:start",
        "timer:stop",
        "timer:priority",
        "timer:lifetime",
        "timer:file",
        "timer:channelID",
    ];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "timer:status" => Some(PropertyValue::Integer(self.status)),
            "timer:day" => Some(PropertyValue::Text(self.day.clone())),
            "timer:start" => Some(PropertyValue::Integer(self.start)),
            "timer:stop" => Some(PropertyValue::Integer(self.stop)),
            "timer:priority" => Some(PropertyValue::Integer(self.priority)),
            "timer:lifetime" => Some(PropertyValue::Integer(self.lifetime)),
            "timer:file" => Some(PropertyValue::Text(self.file.clone())),
            "timer:channelID" => Some(PropertyValue::Text(self.channel_id.clone())),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "timer:status" => Some(assign_integer(&mut self.status, name, value)),
            "timer:day" => Some(assign_text(&mut self.day, name, value)),
            "timer:start" => Some(assign_integer(&mut self.start, name, value)),
            "timer:stop" => Some(assign_integer(&mut self.stop, name, value)),
            "timer:priority" => Some(assign_integer(&mut self.priority, name, value)),
            "timer:lifetime" => Some(assign_integer(&mut self.lifetime, name, value)),
            "timer:file" => Some(assign_text(&mut self.file, name, value)),
            "timer:channelID" => Some(assign_text(&mut self.channel_id, name, value)),
            _ => None,
        }
    }
}

/// Virtual channel grouping program guide events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpgContainerProps {
    pub channel_id: String,
    pub channel_name: String,
    pub is_radio: bool,
}

impl PropertyLevel for EpgContainerProps {
    const NAMES: &'static [&'static str] = &["epg:channelID", "epg:channelName", "epg:isRadio"];

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "epg:channelID" => Some(PropertyValue::Text(self.channel_id.clone())),
            "epg:channelName" => Some(PropertyValue::Text(self.channel_name.clone())),
            "epg:isRadio" => Some(PropertyValue::Bool(self.is_radio)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>> {
        match name {
            "epg:channelID" => Some(assign_text(&mut self.channel_id, name, value)),
            "epg:channelName" => Some(assign_text(&mut self.channel_name, name, value)),
            "epg:isRadio" => Some(boolean(name, value).map(|b| {
                self.is_radio = b;
            })),
            _ => None,
        }
    }
}

// ============================================================================
// Item
// ============================================================================

/// Variant-specific state of an item, one arm per concrete class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Video(VideoItemProps),
    Audio(AudioItemProps),
    Movie(VideoItemProps, MovieProps),
    AudioRecord(AudioItemProps, AudioRecordProps),
    VideoBroadcast(VideoItemProps, VideoBroadcastProps),
    AudioBroadcast(AudioItemProps, AudioBroadcastProps),
    Epg(EpgItemProps),
    RecordTimer(RecordTimerProps),
}

impl ItemKind {
    /// Empty state for a concrete item class, `None` for anything else.
    pub fn for_class(class: ClassTag) -> Option<Self> {
        let kind = match class {
            ClassTag::VideoItem => ItemKind::Video(VideoItemProps::default()),
            ClassTag::AudioItem => ItemKind::Audio(AudioItemProps::default()),
            ClassTag::Movie => ItemKind::Movie(VideoItemProps::default(), MovieProps::default()),
            ClassTag::AudioRecord => {
                ItemKind::AudioRecord(AudioItemProps::default(), AudioRecordProps::default())
            }
            ClassTag::VideoBroadcast => ItemKind::VideoBroadcast(
                VideoItemProps::default(),
                VideoBroadcastProps::default(),
            ),
            ClassTag::AudioBroadcast => ItemKind::AudioBroadcast(
                AudioItemProps::default(),
                AudioBroadcastProps::default(),
            ),
            ClassTag::EpgItem => ItemKind::Epg(EpgItemProps::default()),
            ClassTag::RecordTimerItem => ItemKind::RecordTimer(RecordTimerProps::default()),
            _ => return None,
        };
        Some(kind)
    }

    pub fn class(&self) -> ClassTag {
        match self {
            ItemKind::Video(_) => ClassTag::VideoItem,
            ItemKind::Audio(_) => ClassTag::AudioItem,
            ItemKind::Movie(..) => ClassTag::Movie,
            ItemKind::AudioRecord(..) => ClassTag::AudioRecord,
            ItemKind::VideoBroadcast(..) => ClassTag::VideoBroadcast,
            ItemKind::AudioBroadcast(..) => ClassTag::AudioBroadcast,
            ItemKind::Epg(_) => ClassTag::EpgItem,
            ItemKind::RecordTimer(_) => ClassTag::RecordTimerItem,
        }
    }

    pub fn video(&self) -> Option<&VideoItemProps> {
        match self {
            ItemKind::Video(v) | ItemKind::Movie(v, _) | ItemKind::VideoBroadcast(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn video_mut(&mut self) -> Option<&mut VideoItemProps> {
        match self {
            ItemKind::Video(v) | ItemKind::Movie(v, _) | ItemKind::VideoBroadcast(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioItemProps> {
        match self {
            ItemKind::Audio(a) | ItemKind::AudioRecord(a, _) | ItemKind::AudioBroadcast(a, _) => {
                Some(a)
            }
            _ => None,
        }
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioItemProps> {
        match self {
            ItemKind::Audio(a) | ItemKind::AudioRecord(a, _) | ItemKind::AudioBroadcast(a, _) => {
                Some(a)
            }
            _ => None,
        }
    }

    pub(crate) fn property(&self, name: &str) -> Option<PropertyValue> {
        match self {
            ItemKind::Video(v) => v.get(name),
            ItemKind::Audio(a) => a.get(name),
            ItemKind::Movie(v, m) => v.get(name).or_else(|| m.get(name)),
            ItemKind::AudioRecord(a, r) => a.get(name).or_else(|| r.get(name)),
            ItemKind::VideoBroadcast(v, b) => v.get(name).or_else(|| b.get(name)),
            ItemKind::AudioBroadcast(a, b) => a.get(name).or_else(|| b.get(name)),
            ItemKind::Epg(e) => e.get(name),
            ItemKind::RecordTimer(t) => t.get(name),
        }
    }

    pub(crate) fn set_property(
        &mut self,
        name: &str,
        value: &PropertyValue,
    ) -> Option<Result<(), ModelError>> {
        match self {
            ItemKind::Video(v) => v.set(name, value),
            ItemKind::Audio(a) => a.set(name, value),
            ItemKind::Movie(v, m) => v.set(name, value).or_else(|| m.set(name, value)),
            ItemKind::AudioRecord(a, r) => a.set(name, value).or_else(|| r.set(name, value)),
            ItemKind::VideoBroadcast(v, b) => v.set(name, value).or_else(|| b.set(name, value)),
            ItemKind::AudioBroadcast(a, b) => a.set(name, value).or_else(|| b.set(name, value)),
            ItemKind::Epg(e) => e.set(name, value),
            ItemKind::RecordTimer(t) => t.set(name, value),
        }
    }

    /// Check invariants that only hold once the entry is persisted.
    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        match self {
            ItemKind::Movie(_, m) if !(0..=MAX_DVD_REGION_CODE).contains(&m.dvd_region_code) => {
                Err(ModelError::InvalidRegionCode(m.dvd_region_code))
            }
            ItemKind::VideoBroadcast(_, b) if b.channel_nr <= 0 => {
                Err(ModelError::InvalidChannelNumber(b.channel_nr))
            }
            ItemKind::AudioBroadcast(_, b) if b.channel_nr <= 0 => {
                Err(ModelError::InvalidChannelNumber(b.channel_nr))
            }
            _ => Ok(()),
        }
    }
}

/// Leaf entry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Item this one aliases, or [`NO_REFERENCE`].
    pub(crate) reference_id: ObjectId,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            reference_id: NO_REFERENCE,
            kind,
        }
    }

    pub fn reference_id(&self) -> ObjectId {
        self.reference_id
    }

    pub fn is_reference(&self) -> bool {
        self.reference_id != NO_REFERENCE
    }
}

//! Playable locators attached to catalog entries.

use serde::{Deserialize, Serialize};

use super::{ModelError, ObjectId};

pub type ResourceId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Live channel stream
    Channel,
    Recording,
    File,
    Url,
}

impl ResourceType {
    pub fn code(self) -> i64 {
        match self {
            ResourceType::Channel => 0,
            ResourceType::Recording => 1,
            ResourceType::File => 2,
            ResourceType::Url => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, ModelError> {
        match code {
            0 => Ok(ResourceType::Channel),
            1 => Ok(ResourceType::Recording),
            2 => Ok(ResourceType::File),
            3 => Ok(ResourceType::Url),
            other => Err(ModelError::InvalidResourceType(other)),
        }
    }
}

/// A persisted resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    /// Entry owning this resource.
    pub object_id: ObjectId,
    pub resource_type: ResourceType,
    pub locator: String,
    pub protocol_info: String,
    pub content_type: String,
    pub size: Option<i64>,
    /// `H+:MM:SS[.F+]` as rendered to clients.
    pub duration: Option<String>,
    pub bitrate: Option<i64>,
    pub sample_frequency: Option<i64>,
    pub bits_per_sample: Option<i64>,
    pub nr_audio_channels: Option<i64>,
    pub resolution: Option<String>,
    pub color_depth: Option<i64>,
    /// Set while consuming this resource should create or purge a record timer.
    pub record_timer_flag: bool,
}

/// A resource not yet registered with the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub resource_type: ResourceType,
    pub locator: String,
    pub protocol_info: String,
    pub content_type: String,
    pub size: Option<i64>,
    pub duration: Option<String>,
    pub bitrate: Option<i64>,
    pub sample_frequency: Option<i64>,
    pub bits_per_sample: Option<i64>,
    pub nr_audio_channels: Option<i64>,
    pub resolution: Option<String>,
    pub color_depth: Option<i64>,
    pub record_timer_flag: bool,
}

impl NewResource {
    pub fn new(
        resource_type: ResourceType,
        locator: impl Into<String>,
        protocol_info: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            locator: locator.into(),
            protocol_info: protocol_info.into(),
            content_type: content_type.into(),
            size: None,
            duration: None,
            bitrate: None,
            sample_frequency: None,
            bits_per_sample: None,
            nr_audio_channels: None,
            resolution: None,
            color_depth: None,
            record_timer_flag: false,
        }
    }

    pub(crate) fn into_resource(self, id: ResourceId, object_id: ObjectId) -> Resource {
        Resource {
            id,
            object_id,
            resource_type: self.resource_type,
            locator: self.locator,
            protocol_info: self.protocol_info,
            content_type: self.content_type,
            size: self.size,
            duration: self.duration,
            bitrate: self.bitrate,
            sample_frequency: self.sample_frequency,
            bits_per_sample: self.bits_per_sample,
            nr_audio_channels: self.nr_audio_channels,
            resolution: self.resolution,
            color_depth: self.color_depth,
            record_timer_flag: self.record_timer_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_codes() {
        for ty in [
            ResourceType::Channel,
            ResourceType::Recording,
            ResourceType::File,
            ResourceType::Url,
        ] {
            assert_eq!(ResourceType::from_code(ty.code()).unwrap(), ty);
        }
        assert_eq!(
            ResourceType::from_code(7),
            Err(ModelError::InvalidResourceType(7))
        );
    }

    #[test]
    fn test_into_resource_keeps_optional_fields() {
        let new = NewResource {
            size: Some(1_048_576),
            resolution: Some("720x576".to_string()),
            ..NewResource::new(
                ResourceType::Recording,
                "/recordings/news.ts",
                "http-get:*:video/mpeg:*",
                "video/mpeg",
            )
        };
        let resource = new.into_resource(12, 140);
        assert_eq!(resource.id, 12);
        assert_eq!(resource.object_id, 140);
        assert_eq!(resource.size, Some(1_048_576));
        assert_eq!(resource.resolution.as_deref(), Some("720x576"));
        assert!(!resource.record_timer_flag);
    }
}

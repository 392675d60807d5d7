//! Browse sort criteria (`+dc:title,-upnp:channelNr`).

use std::cmp::Ordering;
use std::str::FromStr;

use super::class::ClassTag;
use super::entry::CatalogEntry;
use super::property::PropertyValue;
use super::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub direction: SortDirection,
}

/// Parsed sort specification.
///
/// Only lives for the duration of one browse; entries are compared through
/// snapshots taken with [`SortCriteria::snapshot`], so no entry lock is held
/// while sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortCriteria {
    keys: Vec<SortKey>,
}

/// Values of the sort properties of one entry, in key order.
pub type SortSnapshot = Vec<Option<PropertyValue>>;

impl SortCriteria {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Capture the sort properties of `entry`. Missing properties sort first.
    pub fn snapshot(&self, entry: &CatalogEntry) -> SortSnapshot {
        self.keys
            .iter()
            .map(|key| entry.get_property(&key.property).ok())
            .collect()
    }

    pub fn compare(&self, a: &SortSnapshot, b: &SortSnapshot) -> Ordering {
        for (index, key) in self.keys.iter().enumerate() {
            let left = a.get(index).and_then(Option::as_ref);
            let right = b.get(index).and_then(Option::as_ref);
            let ordering = match (left, right) {
                (Some(x), Some(y)) => x.sort_cmp(y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl FromStr for SortCriteria {
    type Err = ModelError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(Self::default());
        }

        let mut keys = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            let invalid = || ModelError::InvalidSortCriteria(part.to_string());
            let (direction, property) = if let Some(rest) = part.strip_prefix('+') {
                (SortDirection::Ascending, rest)
            } else if let Some(rest) = part.strip_prefix('-') {
                (SortDirection::Descending, rest)
            } else {
                return Err(invalid());
            };
            if property.is_empty() || !ClassTag::ALL.iter().any(|tag| tag.has_property(property)) {
                return Err(invalid());
            }
            keys.push(SortKey {
                property: property.to_string(),
                direction,
            });
        }
        Ok(Self { keys })
    }
}

//! Paged, optionally sorted views over the catalog tree.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::MediaCatalog;
use crate::metrics;
use crate::model::{EntryHandle, ModelError, ObjectId, SortCriteria, SortSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseFlag {
    /// Return the object itself.
    Metadata,
    /// Return the object's direct children.
    DirectChildren,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    pub object_id: ObjectId,
    pub flag: BrowseFlag,
    pub offset: usize,
    /// Maximum number of entries to return; zero means all.
    pub count: usize,
    /// Sort criteria such as `+dc:title,-dc:creator`.
    pub sort: String,
}

impl BrowseRequest {
    pub fn metadata(object_id: ObjectId) -> Self {
        Self {
            object_id,
            flag: BrowseFlag::Metadata,
            offset: 0,
            count: 0,
            sort: String::new(),
        }
    }

    pub fn children(object_id: ObjectId) -> Self {
        Self {
            flag: BrowseFlag::DirectChildren,
            ..Self::metadata(object_id)
        }
    }

    pub fn with_range(mut self, offset: usize, count: usize) -> Self {
        self.offset = offset;
        self.count = count;
        self
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct BrowseResult {
    pub entries: Vec<EntryHandle>,
    pub number_returned: usize,
    pub total_matches: usize,
    /// The container's update id for children browses, the system update id otherwise.
    pub update_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowseError {
    #[error("No such object: {0}")]
    NoSuchObject(ObjectId),

    #[error("Invalid sort criteria: {0}")]
    InvalidSortCriteria(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrowseError {
    fn outcome(&self) -> &'static str {
        match self {
            BrowseError::NoSuchObject(_) => "no_such_object",
            BrowseError::InvalidSortCriteria(_) => "invalid_sort_criteria",
            BrowseError::Internal(_) => "internal_error",
        }
    }
}

fn internal(e: impl Display) -> BrowseError {
    BrowseError::Internal(e.to_string())
}

impl MediaCatalog {
    /// Browse an object's metadata or its direct children.
    ///
    /// Hidden subtrees behave as if they did not exist.
    pub fn browse(&self, request: &BrowseRequest) -> Result<BrowseResult, BrowseError> {
        let result = self.browse_inner(request);
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::BROWSE_REQUESTS.with_label_values(&[outcome]).inc();
        result
    }

    fn browse_inner(&self, request: &BrowseRequest) -> Result<BrowseResult, BrowseError> {
        let criteria: SortCriteria = request.sort.parse().map_err(|e| match e {
            ModelError::InvalidSortCriteria(criteria) => BrowseError::InvalidSortCriteria(criteria),
            other => BrowseError::InvalidSortCriteria(other.to_string()),
        })?;

        let id = request.object_id;
        if self.is_hidden(id) {
            return Err(BrowseError::NoSuchObject(id));
        }
        let handle = self
            .get_object_by_id(id)
            .map_err(internal)?
            .ok_or(BrowseError::NoSuchObject(id))?;

        if request.flag == BrowseFlag::Metadata {
            let update_id = self.system_update_id().map_err(internal)?;
            return Ok(BrowseResult {
                entries: vec![handle],
                number_returned: 1,
                total_matches: 1,
                update_id,
            });
        }

        let (children, update_id) = {
            let entry = handle.read().map_err(internal)?;
            match entry.as_container() {
                Some(container) => (container.children().to_vec(), container.update_id()),
                None => return Err(BrowseError::NoSuchObject(id)),
            }
        };
        let visible: Vec<ObjectId> = children
            .into_iter()
            .filter(|child| !self.is_hidden(*child))
            .collect();
        let total_matches = visible.len();

        let entries = if criteria.is_empty() {
            self.load_all(page(&visible, request.offset, request.count))?
        } else {
            let mut keyed: Vec<(SortSnapshot, EntryHandle)> = Vec::with_capacity(visible.len());
            for handle in self.load_all(&visible)? {
                let snapshot = {
                    let entry = handle.read().map_err(internal)?;
                    criteria.snapshot(&entry)
                };
                keyed.push((snapshot, handle));
            }
            keyed.sort_by(|(a, left), (b, right)| {
                criteria
                    .compare(a, b)
                    .then_with(|| left.id().cmp(&right.id()))
            });
            let sorted: Vec<EntryHandle> = keyed.into_iter().map(|(_, handle)| handle).collect();
            page(&sorted, request.offset, request.count).to_vec()
        };

        debug!(
            "Browsed {} children of {} ({} total)",
            entries.len(),
            id,
            total_matches
        );
        Ok(BrowseResult {
            number_returned: entries.len(),
            entries,
            total_matches,
            update_id,
        })
    }

    /// Children deleted since the container snapshot are skipped.
    fn load_all(&self, ids: &[ObjectId]) -> Result<Vec<EntryHandle>, BrowseError> {
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(handle) = self.get_object_by_id(*id).map_err(internal)? {
                handles.push(handle);
            }
        }
        Ok(handles)
    }
}

fn page<T>(items: &[T], offset: usize, count: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = if count == 0 {
        items.len()
    } else {
        start.saturating_add(count).min(items.len())
    };
    &items[start..end]
}

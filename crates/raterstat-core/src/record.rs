//! Canonical annotation and reference records.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single annotator response, collapsed from the export's three signals.
///
/// Serialised by its label: `True`, `False`, `Undecided`, `Corrupted_Image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Response {
    /// A yes/no answer to the task question.
    Answer(bool),
    /// The annotator marked the task as not solvable.
    Undecided,
    /// The annotator flagged the image as corrupt.
    CorruptedImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown response label: {0:?}")]
pub struct UnknownResponse(pub String);

impl Response {
    /// All categories, in agreement-matrix column order.
    pub const CATEGORIES: [Response; 4] = [
        Response::Answer(true),
        Response::Answer(false),
        Response::Undecided,
        Response::CorruptedImage,
    ];

    /// Collapse the raw signals into one response.
    ///
    /// `corrupt_data` wins over `cant_solve`, which wins over the answer.
    /// `None` only when neither flag is set and there is no answer.
    pub fn from_signals(answer: Option<bool>, cant_solve: bool, corrupt_data: bool) -> Option<Self> {
        if corrupt_data {
            Some(Self::CorruptedImage)
        } else if cant_solve {
            Some(Self::Undecided)
        } else {
            answer.map(Self::Answer)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Answer(true) => "True",
            Self::Answer(false) => "False",
            Self::Undecided => "Undecided",
            Self::CorruptedImage => "Corrupted_Image",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::CATEGORIES.into_iter().find(|c| c.label() == label)
    }

    /// The boolean answer, if this response can be compared to a reference label.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Answer(b) => Some(b),
            _ => None,
        }
    }

    /// Column index in [`Response::CATEGORIES`].
    pub fn category_index(self) -> usize {
        match self {
            Self::Answer(true) => 0,
            Self::Answer(false) => 1,
            Self::Undecided => 2,
            Self::CorruptedImage => 3,
        }
    }

    pub fn is_uncertain(self) -> bool {
        matches!(self, Self::Undecided | Self::CorruptedImage)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Response> for String {
    fn from(r: Response) -> Self {
        r.label().to_string()
    }
}

impl TryFrom<String> for Response {
    type Error = UnknownResponse;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_label(&s).ok_or(UnknownResponse(s))
    }
}

/// One annotator's response to one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub image_id: String,
    pub annotator_id: String,
    pub response: Response,
    pub duration_ms: f64,
}

/// Ordered annotation rows in ingestion order.
///
/// Not unique per `(image_id, annotator_id)`: an annotator may have answered
/// the same item more than once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationTable {
    records: Vec<AnnotationRecord>,
}

impl AnnotationTable {
    pub fn from_records(records: Vec<AnnotationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<AnnotationRecord> for AnnotationTable {
    fn from_iter<I: IntoIterator<Item = AnnotationRecord>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AnnotationTable {
    type Item = &'a AnnotationRecord;
    type IntoIter = std::slice::Iter<'a, AnnotationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Ground-truth label for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub image_id: String,
    pub is_bicycle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate image id in reference set: {0}")]
pub struct DuplicateImageId(pub String);

/// Ground-truth labels, sorted by `image_id` with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReferenceSet {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceSet {
    /// Build from entries in any order. Fails on the first repeated id.
    pub fn try_from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, DuplicateImageId> {
        {
            let mut seen = HashSet::with_capacity(entries.len());
            for entry in &entries {
                if !seen.insert(entry.image_id.as_str()) {
                    return Err(DuplicateImageId(entry.image_id.clone()));
                }
            }
        }
        let mut entries = entries;
        entries.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        Ok(Self { entries })
    }

    /// Reference label for an item, if the item is in the set.
    pub fn label(&self, image_id: &str) -> Option<bool> {
        self.entries
            .binary_search_by(|e| e.image_id.as_str().cmp(image_id))
            .ok()
            .map(|i| self.entries[i].is_bicycle)
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Object tag sets.
//!
//! Each feature owns a fixed set of tag keys. Applying a feature replaces
//! exactly those keys and leaves every other tag alone.

use serde::{Deserialize, Serialize};

use super::errors::ArchiveError;

/// Object stores reject more tags than this per object.
pub const MAX_TAGS_PER_OBJECT: usize = 10;
pub const MAX_TAG_KEY_LEN: usize = 128;
pub const MAX_TAG_VALUE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Like [`Tag::new`], but cuts the value to [`MAX_TAG_VALUE_LEN`] chars.
    pub fn truncated(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut value = value.into();
        if let Some((cut, _)) = value.char_indices().nth(MAX_TAG_VALUE_LEN) {
            value.truncate(cut);
        }
        Self::new(key, value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self(tags)
    }

    pub fn tags(&self) -> &[Tag] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop `owned_keys`, then append `new_tags`.
    pub fn replace_keys(&self, owned_keys: &[&str], new_tags: Vec<Tag>) -> Result<TagSet, ArchiveError> {
        let mut tags: Vec<Tag> = self
            .0
            .iter()
            .filter(|t| !owned_keys.contains(&t.key.as_str()))
            .cloned()
            .collect();
        tags.extend(new_tags);

        let next = TagSet(tags);
        next.check_limits()?;
        Ok(next)
    }

    fn check_limits(&self) -> Result<(), ArchiveError> {
        if self.0.len() > MAX_TAGS_PER_OBJECT {
            return Err(ArchiveError::TagLimitExceeded(format!(
                "{} tags, at most {} allowed",
                self.0.len(),
                MAX_TAGS_PER_OBJECT
            )));
        }
        for tag in &self.0 {
            if tag.key.chars().count() > MAX_TAG_KEY_LEN {
                return Err(ArchiveError::TagLimitExceeded(format!(
                    "key '{}' longer than {MAX_TAG_KEY_LEN} chars",
                    tag.key
                )));
            }
            if tag.value.chars().count() > MAX_TAG_VALUE_LEN {
                return Err(ArchiveError::TagLimitExceeded(format!(
                    "value of '{}' longer than {MAX_TAG_VALUE_LEN} chars",
                    tag.key
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

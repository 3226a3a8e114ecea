//! Ordered listing of file records.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::file::File;

/// Orderings supported by [`Files::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Byte-wise by sort key.
    #[default]
    Name,
    /// Ascending by size.
    Size,
    /// Oldest first.
    Created,
}

/// An ordered collection of files.
///
/// Every entry carries its ordinal and the collection length; both are
/// rewritten whenever the collection is sorted or filtered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Files {
    files: Vec<File>,
}

impl Files {
    /// Create a numbered collection preserving the given order.
    pub fn new(files: Vec<File>) -> Self {
        let mut files = Self { files };
        files.renumber();
        files
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get the entry at `index`.
    pub fn get(&self, index: usize) -> Option<&File> {
        self.files.get(index)
    }

    /// Get the entry at `index` for updating its transient fields.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut File> {
        self.files.get_mut(index)
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, File> {
        self.files.iter()
    }

    /// Iterate mutably over entries in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, File> {
        self.files.iter_mut()
    }

    /// Base names in listing order.
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Rewrite ordinals and totals to match the current order.
    pub fn renumber(&mut self) {
        let total = self.files.len();
        for (number, file) in self.files.iter_mut().enumerate() {
            file.number = number;
            file.total = total;
        }
    }

    /// Stable sort by sort key.
    pub fn sort_by_name(&mut self) {
        self.files.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        self.renumber();
    }

    /// Stable sort by size, smallest first.
    pub fn sort_by_size(&mut self) {
        self.files.sort_by_key(|f| f.size);
        self.renumber();
    }

    /// Stable sort by creation time, oldest first.
    pub fn sort_by_created(&mut self) {
        self.files.sort_by_key(|f| f.timestamps.created_or_modified());
        self.renumber();
    }

    /// Sort with the given order.
    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::Name => self.sort_by_name(),
            SortOrder::Size => self.sort_by_size(),
            SortOrder::Created => self.sort_by_created(),
        }
    }

    /// Reverse the current order.
    pub fn reverse(&mut self) {
        self.files.reverse();
        self.renumber();
    }

    /// Keep only entries matching the predicate.
    pub fn retain(&mut self, keep: impl FnMut(&File) -> bool) {
        self.files.retain(keep);
        self.renumber();
    }

    /// Set the selection flag of the entry at `index`.
    pub fn select(&mut self, index: usize, selected: bool) -> bool {
        match self.files.get_mut(index) {
            Some(file) => {
                file.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Flip the selection flag of the entry at `index`.
    pub fn toggle_selected(&mut self, index: usize) -> bool {
        match self.files.get_mut(index) {
            Some(file) => {
                file.selected = !file.selected;
                true
            }
            None => false,
        }
    }

    /// Move the cursor to `index`, clearing it everywhere else.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.files.len() {
            return false;
        }
        for (i, file) in self.files.iter_mut().enumerate() {
            file.active = i == index;
        }
        true
    }

    /// Entry under the cursor.
    pub fn active(&self) -> Option<&File> {
        self.files.iter().find(|f| f.active)
    }

    /// Entries that are selected or under the cursor.
    pub fn selected(&self) -> Vec<&File> {
        self.files
            .iter()
            .filter(|f| f.selected || f.active)
            .collect()
    }

    /// Total size of all entries.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

impl Index<usize> for Files {
    type Output = File;

    fn index(&self, index: usize) -> &Self::Output {
        &self.files[index]
    }
}

impl FromIterator<File> for Files {
    fn from_iter<I: IntoIterator<Item = File>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Files {
    type Item = File;
    type IntoIter = std::vec::IntoIter<File>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a Files {
    type Item = &'a File;
    type IntoIter = std::slice::Iter<'a, File>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

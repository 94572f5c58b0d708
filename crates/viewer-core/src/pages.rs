//! Page render plan.

use serde::{Serialize, Serializer};
use std::fmt;

/// Stable identity of a rendered page, derived from its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey(u32);

impl PageKey {
    pub fn page_number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page_{}", self.0)
    }
}

impl Serialize for PageKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One page to render: 1-based number, target height, identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRender {
    pub number: u32,
    pub height_px: u32,
    pub key: PageKey,
}

/// Lazy iterator over the pages of a plan. [`PagePlan::pages`] hands out a
/// fresh one on every call.
#[derive(Debug, Clone)]
pub struct Pages {
    next: u64,
    count: u64,
    height_px: u32,
}

impl Pages {
    pub fn empty() -> Self {
        Self { next: 1, count: 0, height_px: 0 }
    }
}

impl Iterator for Pages {
    type Item = PageRender;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.count {
            return None;
        }

        let number = self.next as u32;
        self.next += 1;
        Some(PageRender { number, height_px: self.height_px, key: PageKey(number) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pages {}

/// Memoized inputs of the page sequence.
///
/// The revision only moves when the page count or the page height changes,
/// so callers can skip re-layout for any other state change.
#[derive(Debug, Default)]
pub struct PagePlan {
    page_count: Option<u32>,
    height_px: u32,
    revision: u64,
}

impl PagePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the inputs changed and the sequence was re-derived.
    pub fn update(&mut self, page_count: Option<u32>, height_px: u32) -> bool {
        if self.page_count == page_count && self.height_px == height_px {
            return false;
        }

        self.page_count = page_count;
        self.height_px = height_px;
        self.revision += 1;
        true
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pages(&self) -> Pages {
        match self.page_count {
            Some(count) => Pages { next: 1, count: u64::from(count), height_px: self.height_px },
            None => Pages::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.page_count.unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

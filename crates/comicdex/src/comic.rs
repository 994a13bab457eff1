//! 🦸 The comic: one stick-figure masterpiece in eleven fields, with zero calendar math.
//!
//! 📦 [`Comic`] is the canonical record we pull from `{base}/{num}/info.0.json`
//! and hand, byte for byte, to the `_bulk` API. Day, month and year stay as text
//! because the upstream formats them however it felt like that morning.
//!
//! 🔢 [`IdPlan`] decides which numbers get fetched: a dense inclusive range with
//! holes punched in it. There is exactly one famous hole. It is 404. Of course it is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// 🦸 One comic, as described by its `info.0.json`.
///
/// `num` is the natural key: it becomes the document `_id`, so re-running the
/// indexer overwrites instead of duplicating. Unknown upstream fields are ignored;
/// a missing known field fails decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    pub month: String,
    pub num: u32,
    pub link: String,
    pub year: String,
    pub news: String,
    pub safe_title: String,
    pub transcript: String,
    pub alt: String,
    pub img: String,
    pub title: String,
    pub day: String,
}

impl Comic {
    /// 🔑 The store-side document ID. Always the decimal form of `num`.
    pub fn document_id(&self) -> String {
        self.num.to_string()
    }
}

/// 🔢 Which comic numbers to request.
///
/// An inclusive `first..=last` range minus `skip`. The plan is the ONLY place
/// that knows about 404; the fetcher requests whatever it is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPlan {
    first: u32,
    last: u32,
    skip: BTreeSet<u32>,
}

impl IdPlan {
    pub fn new(first: u32, last: u32, skip: impl IntoIterator<Item = u32>) -> Self {
        Self {
            first,
            last,
            skip: skip.into_iter().collect(),
        }
    }

    /// 📋 Every ID that will actually be fetched, ascending.
    pub fn ids(&self) -> Vec<u32> {
        if self.first > self.last {
            return Vec::new();
        }
        (self.first..=self.last)
            .filter(|id| !self.skip.contains(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        if self.first > self.last {
            return 0;
        }
        let span = (self.last - self.first) as usize + 1;
        let skipped = self.skip.range(self.first..=self.last).count();
        span - skipped
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }
}

#[cfg(test)]
pub(crate) fn sample_comic(num: u32) -> Comic {
    Comic {
        month: "4".to_string(),
        num,
        link: String::new(),
        year: "2006".to_string(),
        news: String::new(),
        safe_title: format!("Comic {num}"),
        transcript: format!("[[A stick figure ponders comic {num}]]"),
        alt: format!("alt text #{num}"),
        img: format!("https://imgs.xkcd.com/comics/comic_{num}.png"),
        title: format!("Comic {num}"),
        day: "1".to_string(),
    }
}

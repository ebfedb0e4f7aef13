//! Pagination cursors.
//!
//! Both cursors are plain state machines: the traversal asks for the next
//! query, performs the request, and feeds the page back. Keeping network
//! access out of them makes the termination rules testable on their own.

use std::collections::HashSet;

use tracing::{debug, info};

use super::model::ItemId;
use crate::api::constants::{MESSAGE_PAGE_SIZE, POLL_PAGE_OVERLAP, POLL_PAGE_SIZE};

/// Offset pagination driven by the server's `nextPageStart`.
///
/// Ends when the next offset is absent, zero, or repeats the previous one.
#[derive(Debug, Clone)]
pub struct MessageCursor {
    page_size: usize,
    start: Option<i64>,
    pages: usize,
    done: bool,
}

impl Default for MessageCursor {
    fn default() -> Self {
        Self::new(MESSAGE_PAGE_SIZE)
    }
}

impl MessageCursor {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            start: None,
            pages: 0,
            done: false,
        }
    }

    /// Query for the next page, or `None` once the listing is exhausted.
    #[must_use]
    pub fn next_query(&self) -> Option<Vec<(&'static str, String)>> {
        if self.done {
            return None;
        }
        let mut query = vec![
            ("count", self.page_size.to_string()),
            ("sortOrder", "asc".to_string()),
            ("direction", "1".to_string()),
        ];
        if let Some(start) = self.start {
            query.push(("start", start.to_string()));
        }
        Some(query)
    }

    /// Zero-based index of the page the next query will fetch.
    #[must_use]
    pub fn page(&self) -> usize {
        self.pages
    }

    /// Records a fetched page and its declared next offset.
    pub fn advance(&mut self, next_page_start: Option<i64>) {
        self.pages += 1;
        match next_page_start {
            Some(next) if next > 0 && Some(next) != self.start => self.start = Some(next),
            Some(next) if next > 0 => {
                debug!(next, "next page offset did not advance, treating as end of list");
                self.done = true;
            }
            _ => self.done = true,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Fixed-size pagination that converges on a service that may loop.
///
/// Pages overlap by one item, so the offset advances by `page_size - overlap`.
/// The walk stops on a short page, on a page whose last item is the last item
/// already held, or on a page that brings nothing new.
#[derive(Debug, Clone)]
pub struct PollCursor {
    page_size: usize,
    overlap: usize,
    offset: Option<usize>,
    done: bool,
    ids: Vec<ItemId>,
    seen: HashSet<ItemId>,
}

impl Default for PollCursor {
    fn default() -> Self {
        Self::new(POLL_PAGE_SIZE, POLL_PAGE_OVERLAP)
    }
}

impl PollCursor {
    /// `overlap` is clamped below `page_size` so the offset always advances.
    #[must_use]
    pub fn new(page_size: usize, overlap: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            overlap: overlap.min(page_size - 1),
            offset: None,
            done: false,
            ids: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Query for the next page, or `None` once converged.
    #[must_use]
    pub fn next_query(&self) -> Option<Vec<(&'static str, String)>> {
        if self.done {
            return None;
        }
        let mut query = vec![
            ("count", self.page_size.to_string()),
            ("sort", "DESC".to_string()),
        ];
        if let Some(offset) = self.offset {
            query.push(("start", offset.to_string()));
        }
        Some(query)
    }

    /// Feeds back the ids of one fetched page.
    pub fn absorb(&mut self, page: Vec<ItemId>) {
        let full = page.len() >= self.page_size;

        if self.offset.is_some() && !page.is_empty() && self.ids.last() == page.last() {
            info!(offset = ?self.offset, "no new polls at this offset");
            self.done = true;
            return;
        }

        let before = self.ids.len();
        for id in page {
            if self.seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
        let added = self.ids.len() - before;
        debug!(added, total = self.ids.len(), "poll page absorbed");

        if !full || (self.offset.is_some() && added == 0) {
            self.done = true;
            return;
        }
        let step = self.page_size - self.overlap;
        self.offset = Some(self.offset.map_or(step, |offset| offset + step));
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The distinct ids collected so far, in listing order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    #[must_use]
    pub fn into_ids(self) -> Vec<ItemId> {
        self.ids
    }
}

//! Paged view state for infinite-scroll consumers.
//!
//! Every fetch is started with [`PagedState::begin`], which hands out a
//! [`FetchTicket`] carrying a generation number. Only the completion holding
//! the newest ticket is applied; anything older is reported as
//! [`Commit::Stale`] and leaves the state untouched.

use crate::aggregate::DashboardSummary;
use crate::error::DashboardError;
use crate::types::{Collection, TaskRecord};
use std::collections::HashMap;
use tracing::debug;

/// How a completed fetch merges into the current rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// First page or a filter change: discard existing rows.
    Replace,
    /// Next page: append to existing rows.
    Append,
}

/// Handle for one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    page: u32,
    merge: Merge,
}

impl FetchTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn merge(&self) -> Merge {
        self.merge
    }
}

/// Result of handing a completion to [`PagedState::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    /// A newer fetch was started after this one; the completion was dropped.
    Stale,
}

/// Rows, paging and status for one listing.
#[derive(Debug, Clone)]
pub struct PagedState<T> {
    pub items: Vec<T>,
    /// Last page successfully applied (0 before the first).
    pub page: u32,
    /// Total matching rows as last reported by the store.
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
    generation: u64,
}

impl<T> Default for PagedState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            total: 0,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> PagedState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_more(&self) -> bool {
        (self.items.len() as u64) < self.total
    }

    /// Start a fetch. Any fetch started earlier becomes stale.
    pub fn begin(&mut self, page: u32, merge: Merge) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            page,
            merge,
        }
    }

    /// Start fetching the next page, unless a fetch is already in flight or
    /// every row has been loaded.
    pub fn try_begin_more(&mut self) -> Option<FetchTicket> {
        if self.loading || !self.has_more() {
            return None;
        }
        Some(self.begin(self.page + 1, Merge::Append))
    }

    /// Apply a completed fetch if it belongs to the newest ticket.
    ///
    /// Success replaces or appends rows and records the total; failure keeps
    /// the rows already shown and records the error.
    pub fn commit(
        &mut self,
        ticket: FetchTicket,
        result: Result<(Vec<T>, u64), DashboardError>,
    ) -> Commit {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale page"
            );
            return Commit::Stale;
        }
        self.loading = false;
        match result {
            Ok((rows, total)) => {
                match ticket.merge {
                    Merge::Replace => self.items = rows,
                    Merge::Append => self.items.extend(rows),
                }
                self.page = ticket.page;
                self.total = total;
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
        Commit::Applied
    }

    /// Drop all rows and invalidate any in-flight fetch.
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = Self::default();
        self.generation = generation;
    }
}

/// Per-collection dashboard state: the task listing and the summary counts.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub tasks: HashMap<Collection, PagedState<TaskRecord>>,
    pub summaries: HashMap<Collection, DashboardSummary>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks_mut(&mut self, collection: Collection) -> &mut PagedState<TaskRecord> {
        self.tasks.entry(collection).or_default()
    }

    pub fn set_summary(&mut self, collection: Collection, summary: DashboardSummary) {
        self.summaries.insert(collection, summary);
    }

    pub fn summary(&self, collection: Collection) -> Option<&DashboardSummary> {
        self.summaries.get(&collection)
    }

    /// Forget one collection, e.g. after its filters change.
    pub fn reset(&mut self, collection: Collection) {
        self.tasks_mut(collection).reset();
        self.summaries.remove(&collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn append_concatenates_and_tracks_more() {
        let mut state = PagedState::new();
        let first = state.begin(1, Merge::Replace);
        state.commit(first, Ok((letters("abc"), 7)));
        let next = state.try_begin_more().unwrap();
        assert_eq!(next.page(), 2);
        state.commit(next, Ok((letters("de"), 7)));
        assert_eq!(state.items, letters("abcde"));
        assert!(state.has_more());

        state.total = 5;
        assert!(!state.has_more());
    }

    #[test]
    fn load_more_is_dropped_while_in_flight() {
        let mut state: PagedState<char> = PagedState::new();
        let _first = state.begin(1, Merge::Replace);
        assert!(state.try_begin_more().is_none());
    }

    #[test]
    fn load_more_stops_at_the_end() {
        let mut state = PagedState::new();
        assert!(state.try_begin_more().is_none());
        let first = state.begin(1, Merge::Replace);
        state.commit(first, Ok((letters("abc"), 3)));
        assert!(state.try_begin_more().is_none());
        assert!(!state.loading);
        assert_eq!(state.page, 1);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut state = PagedState::new();
        let old = state.begin(1, Merge::Replace);
        let new = state.begin(1, Merge::Replace);
        assert_eq!(state.commit(new, Ok((letters("xy"), 2))), Commit::Applied);
        assert_eq!(state.commit(old, Ok((letters("abc"), 3))), Commit::Stale);
        assert_eq!(state.items, letters("xy"));
        assert_eq!(state.total, 2);
    }

    #[test]
    fn failure_keeps_rows() {
        let mut state = PagedState::new();
        let first = state.begin(1, Merge::Replace);
        state.commit(first, Ok((letters("abc"), 6)));
        let more = state.try_begin_more().unwrap();
        state.commit(more, Err(DashboardError::query("timeout")));
        assert_eq!(state.items, letters("abc"));
        assert_eq!(state.page, 1);
        assert_eq!(state.total, 6);
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("query failed: timeout"));

        // the same page is requested again once the store recovers
        let retry = state.try_begin_more().unwrap();
        assert_eq!(retry.page(), 2);
    }

    #[test]
    fn reset_invalidates_in_flight() {
        let mut state = DashboardState::new();
        let ticket = state.tasks_mut(Collection::Checklist).begin(1, Merge::Replace);
        state.reset(Collection::Checklist);
        let listing = state.tasks_mut(Collection::Checklist);
        assert_eq!(listing.commit(ticket, Ok((Vec::new(), 0))), Commit::Stale);
        assert!(!listing.loading);
    }
}

//! Pagination cursor for one view

use super::View;
use crate::article::Article;
use serde::Serialize;

/// Articles requested per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Pagination position, filter and loaded items of one view
#[derive(Debug, Clone)]
pub struct FeedCursor {
    view: View,
    page: u32,
    page_size: usize,
    filter: String,
    items: Vec<Article>,
    has_more: bool,
    busy: bool,
    stale: bool,
    loaded: bool,
    generation: u64,
}

impl FeedCursor {
    /// Empty cursor on page 1
    pub fn new(view: View, page_size: usize) -> Self {
        Self {
            view,
            page: 1,
            page_size: page_size.max(1),
            filter: String::new(),
            items: Vec::new(),
            has_more: false,
            busy: false,
            stale: false,
            loaded: false,
            generation: 0,
        }
    }

    /// View this cursor belongs to
    pub fn view(&self) -> View {
        self.view
    }

    /// Last page requested
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Articles per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Category (feed) or query (search); empty for no filter
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Loaded articles in display order
    pub fn items(&self) -> &[Article] {
        &self.items
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether a fetch is in flight
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether the view must reload when next activated
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether page 1 has been loaded for the current filter
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Incremented on every reset; responses tagged with an older value are dropped
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Render-ready copy
    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            view: self.view,
            page: self.page,
            filter: self.filter.clone(),
            items: self.items.clone(),
            has_more: self.has_more,
            busy: self.busy,
            stale: self.stale,
        }
    }

    pub(crate) fn reset(&mut self, filter: String) -> u64 {
        self.page = 1;
        self.filter = filter;
        self.items.clear();
        self.has_more = false;
        self.busy = true;
        self.stale = false;
        self.loaded = false;
        self.generation += 1;
        self.generation
    }

    pub(crate) fn finish_first_page(&mut self, items: Vec<Article>) {
        self.has_more = self.view.is_paginated() && items.len() >= self.page_size;
        self.items = items;
        self.busy = false;
        self.loaded = true;
    }

    pub(crate) fn fail_first_page(&mut self) {
        self.busy = false;
    }

    /// Claims the next page; `None` when exhausted or already fetching
    pub(crate) fn begin_next_page(&mut self) -> Option<NextPageTicket> {
        if !self.has_more || self.busy {
            return None;
        }
        let ticket = NextPageTicket {
            previous_page: self.page,
            page: self.page + 1,
            generation: self.generation,
        };
        self.busy = true;
        self.page = ticket.page;
        Some(ticket)
    }

    pub(crate) fn finish_next_page(&mut self, items: Vec<Article>) {
        self.has_more = items.len() >= self.page_size;
        self.items.extend(items);
        self.busy = false;
    }

    pub(crate) fn rollback_next_page(&mut self, ticket: &NextPageTicket) {
        self.page = ticket.previous_page;
        self.busy = false;
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Sets the saved flag on every copy of `entity_id`; returns the first previous value
    pub(crate) fn set_saved(&mut self, entity_id: &str, saved: bool) -> Option<bool> {
        let mut previous = None;
        for article in self.items.iter_mut().filter(|a| a.id() == entity_id) {
            previous.get_or_insert(article.is_saved);
            article.is_saved = saved;
        }
        previous
    }

    pub(crate) fn saved(&self, entity_id: &str) -> Option<bool> {
        self.items
            .iter()
            .find(|a| a.id() == entity_id)
            .map(|a| a.is_saved)
    }
}

/// Claim on an in-flight next-page fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NextPageTicket {
    pub(crate) previous_page: u32,
    pub(crate) page: u32,
    pub(crate) generation: u64,
}

/// Render-ready state of one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    /// View
    pub view: View,
    /// Last page loaded
    pub page: u32,
    /// Active filter
    pub filter: String,
    /// Loaded articles
    pub items: Vec<Article>,
    /// Whether "load more" should be offered
    pub has_more: bool,
    /// Whether a fetch is in flight
    pub busy: bool,
    /// Whether the view will reload on activation
    pub stale: bool,
}

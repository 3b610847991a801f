// Orchestrates load / filter / sort / page transitions over a ViewState.
//
// Loads are split into begin_load and complete_load so the fetch can be
// awaited without holding the controller. Each begin_load issues a new
// generation token; complete_load drops any result whose token is no longer
// the latest, so a slow response can never overwrite newer data.
use serde::Serialize;
use shared::models::MarketRecord;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::filter::{FilterKey, Filters};
use super::sort::SortOrder;
use super::view_state::ViewState;
use crate::config::ViewSettings;
use crate::error::ViewerError;
use crate::services::{DataSource, Loadable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListStatus {
    Idle,
    Loading,
    Ready,
    /// The fetch succeeded with zero records.
    Empty,
    /// The last fetch failed; previously loaded records are still shown.
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { count: usize },
    /// A newer load was issued after this one; its result was dropped.
    Stale,
    Failed { message: String },
}

/// What the render layer reads after each transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot<R> {
    pub items: Vec<R>,
    pub current_page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_matched: usize,
    pub total_loaded: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub sort_order: SortOrder,
    pub filters: Filters,
    pub status: ListStatus,
}

pub type SharedController<R> = Arc<RwLock<ViewController<R>>>;

pub struct ViewController<R> {
    state: ViewState<R>,
    status: ListStatus,
    latest: u64,
    default_page_size: NonZeroUsize,
    default_sort: SortOrder,
}

impl<R: MarketRecord> ViewController<R> {
    pub fn new(page_size: NonZeroUsize, sort_order: SortOrder) -> Self {
        Self {
            state: ViewState::new(page_size, sort_order),
            status: ListStatus::Idle,
            latest: 0,
            default_page_size: page_size,
            default_sort: sort_order,
        }
    }

    pub fn from_settings(settings: &ViewSettings) -> Self {
        Self::new(settings.page_size(), settings.sort)
    }

    pub fn into_shared(self) -> SharedController<R> {
        Arc::new(RwLock::new(self))
    }

    pub fn state(&self) -> &ViewState<R> {
        &self.state
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn begin_load<C: fmt::Debug>(&mut self, criteria: &C) -> LoadTicket {
        self.latest += 1;
        self.status = ListStatus::Loading;
        info!(token = self.latest, ?criteria, "Issuing list load");
        LoadTicket(self.latest)
    }

    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<Vec<R>, ViewerError>) -> LoadOutcome {
        if ticket.0 != self.latest {
            warn!(token = ticket.0, latest = self.latest, "Dropping stale list response");
            return LoadOutcome::Stale;
        }

        match result {
            Ok(records) => {
                let count = records.len();
                self.state.replace_all(records);
                self.status = if count == 0 { ListStatus::Empty } else { ListStatus::Ready };
                info!(token = ticket.0, count, matched = self.state.total_matched(), "Applied list load");
                LoadOutcome::Applied { count }
            }
            Err(e) => {
                let message = e.to_string();
                error!(token = ticket.0, error = %message, kept = self.state.all().len(), "List load failed");
                self.status = ListStatus::Failed { message: message.clone() };
                LoadOutcome::Failed { message }
            }
        }
    }

    pub fn set_filter(&mut self, key: FilterKey, value: Option<&str>) {
        debug!(%key, ?value, "Filter changed");
        self.state.set_filter(key, value);
    }

    pub fn clear_filters(&mut self) {
        debug!("Filters cleared");
        self.state.clear_filters();
    }

    pub fn set_sort(&mut self, order: SortOrder) {
        debug!(?order, "Sort changed");
        self.state.set_sort(order);
    }

    pub fn toggle_sort(&mut self) {
        self.set_sort(self.state.sort_order().toggled());
    }

    /// Clamps into `1..=page_count`; never fails.
    pub fn set_page(&mut self, page: isize) {
        self.state.set_page(page);
    }

    pub fn next_page(&mut self) {
        if self.state.page().has_next {
            self.set_page(self.state.current_page() as isize + 1);
        }
    }

    pub fn prev_page(&mut self) {
        if self.state.page().has_prev {
            self.set_page(self.state.current_page() as isize - 1);
        }
    }

    /// Returns false (and leaves the view untouched) for a zero page size.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        match NonZeroUsize::new(page_size) {
            Some(size) => {
                self.state.set_page_size(size);
                true
            }
            None => {
                warn!("Ignoring zero page size");
                false
            }
        }
    }

    /// Drops the list state when the operator leaves the list section.
    /// Loads still in flight become stale.
    pub fn discard(&mut self) {
        self.latest += 1;
        self.state = ViewState::new(self.default_page_size, self.default_sort);
        self.status = ListStatus::Idle;
        info!("List view discarded");
    }
}

impl<R: MarketRecord + Clone> ViewController<R> {
    pub fn snapshot(&self) -> PageSnapshot<R> {
        let page = self.state.page();
        PageSnapshot {
            items: self.state.page_items().into_iter().cloned().collect(),
            current_page: page.current_page,
            page_count: page.page_count,
            page_size: self.state.page_size().get(),
            total_matched: self.state.total_matched(),
            total_loaded: self.state.all().len(),
            has_prev: page.has_prev,
            has_next: page.has_next,
            sort_order: self.state.sort_order(),
            filters: self.state.filters().clone(),
            status: self.status.clone(),
        }
    }
}

impl<R: Loadable> ViewController<R> {
    /// Fetches and applies in one go. Use `load_shared` when other actions
    /// must be able to run while the fetch is pending.
    pub async fn load(&mut self, source: &dyn DataSource, criteria: &R::Criteria) -> LoadOutcome {
        let ticket = self.begin_load(criteria);
        let result = R::fetch(source, criteria).await;
        self.complete_load(ticket, result)
    }
}

/// Runs a load against a shared controller, releasing the lock while the
/// fetch is in flight.
pub async fn load_shared<R: Loadable>(
    handle: &SharedController<R>,
    source: &dyn DataSource,
    criteria: R::Criteria,
) -> LoadOutcome {
    let ticket = handle.write().await.begin_load(&criteria);
    let result = R::fetch(source, &criteria).await;
    handle.write().await.complete_load(ticket, result)
}

// The list view's canonical state. Only ViewController holds one mutably.
use shared::models::MarketRecord;
use std::num::NonZeroUsize;

use super::filter::{filter_indices, FilterKey, Filters};
use super::pager::{self, Page};
use super::sort::{sort_indices, SortOrder};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<R> {
    all: Vec<R>,
    filters: Filters,
    sort_order: SortOrder,
    page_size: NonZeroUsize,
    current_page: usize,
    /// Positions into `all`, filtered then sorted.
    derived: Vec<usize>,
}

impl<R: MarketRecord> ViewState<R> {
    pub fn new(page_size: NonZeroUsize, sort_order: SortOrder) -> Self {
        Self {
            all: Vec::new(),
            filters: Filters::default(),
            sort_order,
            page_size,
            current_page: 1,
            derived: Vec::new(),
        }
    }

    pub fn all(&self) -> &[R] {
        &self.all
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        pager::page_count(self.derived.len(), self.page_size)
    }

    pub fn total_matched(&self) -> usize {
        self.derived.len()
    }

    /// The filtered, sorted subset in display order.
    pub fn derived(&self) -> impl Iterator<Item = &R> + '_ {
        self.derived.iter().map(move |&i| &self.all[i])
    }

    pub fn page(&self) -> Page<'_, usize> {
        pager::paginate(&self.derived, self.page_size, self.current_page)
    }

    pub fn page_items(&self) -> Vec<&R> {
        self.page().items.iter().map(|&i| &self.all[i]).collect()
    }

    pub(crate) fn replace_all(&mut self, records: Vec<R>) {
        self.all = records;
        self.rederive();
    }

    pub(crate) fn set_filter(&mut self, key: FilterKey, value: Option<&str>) {
        self.filters.set(key, value);
        self.rederive();
    }

    pub(crate) fn clear_filters(&mut self) {
        self.filters.clear();
        self.rederive();
    }

    pub(crate) fn set_sort(&mut self, order: SortOrder) {
        self.sort_order = order;
        self.rederive();
    }

    pub(crate) fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.page_size = page_size;
        self.rederive();
    }

    pub(crate) fn set_page(&mut self, requested: isize) {
        self.current_page = pager::clamp_page(requested, self.page_count());
    }

    // Every derivation comes from a load, filter, sort or page-size change,
    // all of which restart at the first page.
    fn rederive(&mut self) {
        let mut derived = filter_indices(&self.all, &self.filters);
        sort_indices(&self.all, &mut derived, self.sort_order);
        self.derived = derived;
        self.current_page = 1;

        tracing::debug!(
            total = self.all.len(),
            matched = self.derived.len(),
            page = self.current_page,
            page_count = self.page_count(),
            "Re-derived list view"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{candle_at, fakeout_at};
    use shared::models::{FakeoutType, TimeFrame};

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_derived_is_a_filtered_sorted_subset() {
        let mut state = ViewState::new(size(5), SortOrder::Descending);
        state.replace_all(vec![
            fakeout_at(1, "btcusdt", TimeFrame::Hour1, FakeoutType::High, 10),
            fakeout_at(2, "ethusdt", TimeFrame::Hour1, FakeoutType::Low, 30),
            fakeout_at(3, "btcusdt", TimeFrame::Day1, FakeoutType::Low, 20),
        ]);
        state.set_filter(FilterKey::Symbol, Some("btcusdt"));

        let ids: Vec<i64> = state.derived().map(|f| f.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(state.derived().all(|f| state.all().contains(f)));

        state.set_sort(SortOrder::Ascending);
        let ids: Vec<i64> = state.derived().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_filter_and_sort_changes_reset_to_first_page() {
        let mut state = ViewState::new(size(2), SortOrder::Ascending);
        state.replace_all((0..10).map(|i| candle_at("btcusdt", i)).collect());
        state.set_page(4);
        assert_eq!(state.current_page(), 4);

        state.set_sort(SortOrder::Descending);
        assert_eq!(state.current_page(), 1);

        state.set_page(3);
        state.set_filter(FilterKey::Symbol, Some("btcusdt"));
        assert_eq!(state.current_page(), 1);

        state.set_page(5);
        state.set_page_size(size(3));
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.page_count(), 4);
    }

    #[test]
    fn test_page_items_follow_derived_order() {
        let mut state = ViewState::new(size(3), SortOrder::Descending);
        state.replace_all((0..7).map(|i| candle_at("btcusdt", i)).collect());
        state.set_page(3);
        let page = state.page_items();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].timestamp, candle_at("btcusdt", 0).timestamp);
    }
}

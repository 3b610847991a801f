// Fixed-size pagination over the derived view. Pages are 1-based.
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub current_page: usize,
    pub page_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// `ceil(len / page_size)`, but never less than one: an empty view still
/// has a single, empty page.
pub fn page_count(len: usize, page_size: NonZeroUsize) -> usize {
    len.div_ceil(page_size.get()).max(1)
}

pub fn clamp_page(requested: isize, page_count: usize) -> usize {
    requested.clamp(1, page_count.max(1) as isize) as usize
}

pub fn paginate<T>(derived: &[T], page_size: NonZeroUsize, current_page: usize) -> Page<'_, T> {
    let page_count = page_count(derived.len(), page_size);
    let current_page = current_page.clamp(1, page_count);
    let start = ((current_page - 1) * page_size.get()).min(derived.len());
    let end = (start + page_size.get()).min(derived.len());

    Page {
        items: &derived[start..end],
        current_page,
        page_count,
        has_prev: current_page > 1,
        has_next: current_page < page_count,
    }
}

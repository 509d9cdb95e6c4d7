//! Fixed-size paging over an ordered listing.

use std::num::NonZeroUsize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page_index: usize,
    pub page_count: usize,
}

pub fn page_count(len: usize, page_size: NonZeroUsize) -> usize {
    len.div_ceil(page_size.get())
}

/// Slice page `page_index` out of `items`. An index past the end yields an
/// empty page; use [`Paginator`] to keep the index in range.
pub fn paginate<T>(items: &[T], page_size: NonZeroUsize, page_index: usize) -> Page<'_, T> {
    let start = page_index.saturating_mul(page_size.get()).min(items.len());
    let end = start.saturating_add(page_size.get()).min(items.len());
    Page {
        items: &items[start..end],
        page_index,
        page_count: page_count(items.len(), page_size),
    }
}

/// Current page of one view.
///
/// The index is clamped to `[0, max(0, page_count - 1)]` every time the
/// source length is synced, so a shrinking listing never strands the view
/// on an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
    page_index: usize,
    len: usize,
}

impl Paginator {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            page_index: 0,
            len: 0,
        }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        page_count(self.len, self.page_size)
    }

    fn last_index(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    /// Record the source length and clamp the index.
    pub fn sync(&mut self, len: usize) {
        self.len = len;
        self.page_index = self.page_index.min(self.last_index());
    }

    /// Sync to `items` and return the current page.
    pub fn page<'a, T>(&mut self, items: &'a [T]) -> Page<'a, T> {
        self.sync(items.len());
        paginate(items, self.page_size, self.page_index)
    }

    /// Jump to `index`, clamped. Returns the resulting index.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.page_index = index.min(self.last_index());
        self.page_index
    }

    pub fn has_next(&self) -> bool {
        self.page_index < self.last_index()
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn next_page(&mut self) -> usize {
        self.go_to(self.page_index.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> usize {
        self.go_to(self.page_index.saturating_sub(1))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[rstest]
    #[case(0, 6, 0)]
    #[case(1, 6, 1)]
    #[case(6, 6, 1)]
    #[case(7, 6, 2)]
    #[case(13, 6, 3)]
    #[case(5, 1, 5)]
    fn test_page_count(#[case] len: usize, #[case] page_size: usize, #[case] expected: usize) {
        assert_eq!(page_count(len, size(page_size)), expected);
    }

    #[test]
    fn test_pages_reconstruct_listing_exactly_once() {
        for len in 0..40usize {
            let items: Vec<usize> = (0..len).collect();
            for page_size in 1..=9 {
                let count = page_count(len, size(page_size));
                assert_eq!(count, len.div_ceil(page_size));

                let rebuilt: Vec<usize> = (0..count)
                    .flat_map(|i| paginate(&items, size(page_size), i).items.to_vec())
                    .collect();
                assert_eq!(rebuilt, items, "len={len} page_size={page_size}");
            }
        }
    }

    #[test]
    fn test_last_page_is_partial() {
        let items: Vec<u32> = (0..14).collect();
        let page = paginate(&items, size(6), 2);
        assert_eq!(page.items, [12, 13]);
        assert_eq!(page.page_count, 3);
    }

    #[test]
    fn test_out_of_range_index_is_empty() {
        let items = [1, 2, 3];
        let page = paginate(&items, size(6), 4);
        assert!(page.items.is_empty());
        assert_eq!(page.page_count, 1);
    }

    #[test]
    fn test_paginator_clamps_when_listing_shrinks() {
        let mut paginator = Paginator::new(size(6));
        let long: Vec<u32> = (0..30).collect();
        paginator.sync(long.len());
        assert_eq!(paginator.go_to(4), 4);

        let short: Vec<u32> = (0..8).collect();
        let page = paginator.page(&short);
        assert_eq!(page.page_index, 1);
        assert_eq!(page.items, [6, 7]);

        let page = paginator.page::<u32>(&[]);
        assert_eq!(page.page_index, 0);
        assert_eq!(page.page_count, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_paginator_navigation() {
        let mut paginator = Paginator::new(size(6));
        paginator.sync(13);
        assert!(!paginator.has_previous());
        assert!(paginator.has_next());

        assert_eq!(paginator.next_page(), 1);
        assert_eq!(paginator.next_page(), 2);
        assert!(!paginator.has_next());
        assert_eq!(paginator.next_page(), 2);

        assert_eq!(paginator.previous_page(), 1);
        assert_eq!(paginator.go_to(99), 2);
        assert_eq!(paginator.go_to(0), 0);
        assert_eq!(paginator.previous_page(), 0);
    }
}

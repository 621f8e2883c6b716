//! Client-side paging

use serde::Serialize;

/// Most page buttons shown at once
const WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    page_sizes: Vec<usize>,
    page_size: usize,
    current_page: usize,
    total_items: usize,
}

impl Pagination {
    pub fn new(page_sizes: Vec<usize>, default_page_size: usize) -> Self {
        let page_size = if default_page_size == 0 {
            page_sizes.first().copied().unwrap_or(5).max(1)
        } else {
            default_page_size
        };
        Self {
            page_sizes,
            page_size,
            current_page: 1,
            total_items: 0,
        }
    }

    pub fn page_sizes(&self) -> &[usize] {
        &self.page_sizes
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size)
    }

    /// New item count; the view returns to page 1
    pub fn set_total(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.current_page = 1;
    }

    /// Item count changed in place (e.g. a delete); stay on the page when possible
    pub fn shrink_to(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.current_page = self.current_page.min(self.total_pages()).max(1);
    }

    /// Sizes outside the allowed set are ignored
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if size == 0 || !self.page_sizes.contains(&size) {
            return false;
        }
        self.page_size = size;
        self.current_page = 1;
        true
    }

    /// Move to `page`; out-of-range requests change nothing
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.current_page + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.current_page > 1 && self.go_to(self.current_page - 1)
    }

    pub fn first(&mut self) -> bool {
        self.go_to(1)
    }

    pub fn last(&mut self) -> bool {
        self.go_to(self.total_pages())
    }

    /// Index range of the current page
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        &items[range.start.min(items.len())..range.end.min(items.len())]
    }

    /// Page numbers for the button strip
    pub fn window(&self) -> Vec<usize> {
        let total = self.total_pages();
        let current = self.current_page;
        if total <= WINDOW {
            (1..=total).collect()
        } else if current <= 3 {
            (1..=WINDOW).collect()
        } else if current >= total - 2 {
            (total - 4..=total).collect()
        } else {
            (current - 2..=current + 2).collect()
        }
    }

    /// "Showing a to b of n" bounds, 1-based
    pub fn showing(&self) -> (usize, usize, usize) {
        let range = self.range();
        if range.is_empty() {
            return (0, 0, self.total_items);
        }
        (range.start + 1, range.end, self.total_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paging(total: usize, size: usize) -> Pagination {
        let mut p = Pagination::new(vec![5, 20, 50], size);
        p.set_total(total);
        p
    }

    #[test]
    fn test_forty_seven_items_at_twenty() {
        let mut p = paging(47, 20);
        assert_eq!(p.total_pages(), 3);
        assert!(p.go_to(3));
        assert_eq!(p.range(), 40..47);
        assert!(!p.go_to(4));
        assert_eq!(p.current_page(), 3);
        assert!(!p.next());
    }

    #[test]
    fn test_page_size_change_resets() {
        let mut p = paging(47, 5);
        p.go_to(4);
        assert!(p.set_page_size(20));
        assert_eq!(p.current_page(), 1);
        assert!(!p.set_page_size(7));
        assert_eq!(p.page_size(), 20);
    }

    #[test]
    fn test_window_shapes() {
        let mut p = paging(15, 5);
        assert_eq!(p.window(), vec![1, 2, 3]);

        let mut p2 = paging(50, 5);
        assert_eq!(p2.window(), vec![1, 2, 3, 4, 5]);
        p2.go_to(6);
        assert_eq!(p2.window(), vec![4, 5, 6, 7, 8]);
        p2.go_to(9);
        assert_eq!(p2.window(), vec![6, 7, 8, 9, 10]);

        p.go_to(2);
        assert_eq!(p.window(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_list() {
        let mut p = paging(0, 5);
        assert_eq!(p.total_pages(), 0);
        assert!(p.window().is_empty());
        assert!(!p.last());
        assert_eq!(p.showing(), (0, 0, 0));
        assert!(p.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_shrink_keeps_page_when_possible() {
        let mut p = paging(11, 5);
        p.go_to(3);
        p.shrink_to(10);
        assert_eq!(p.current_page(), 2);
        assert_eq!(p.showing(), (6, 10, 10));
    }

    #[test]
    fn test_previous_and_first() {
        let mut p = paging(30, 5);
        assert!(!p.previous());
        p.last();
        assert_eq!(p.current_page(), 6);
        assert!(p.previous());
        assert!(p.first());
        assert_eq!(p.current_page(), 1);
    }

    proptest! {
        #[test]
        fn prop_pages_cover_every_item_once(total in 0usize..300, size in prop::sample::select(vec![5usize, 20, 50])) {
            let mut p = paging(total, size);
            let mut seen = 0;
            if p.total_pages() > 0 {
                loop {
                    seen += p.range().len();
                    prop_assert!(p.window().len() <= 5);
                    prop_assert!(p.window().contains(&p.current_page()));
                    if !p.next() { break; }
                }
            }
            prop_assert_eq!(seen, total);
        }
    }
}

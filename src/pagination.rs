use serde::Serialize;

/// Navigation metadata for one page of a result set. Out-of-range pages are
/// clamped, so every combination of inputs produces a valid page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let total_pages = (total / per_page + i64::from(total % per_page != 0)).max(1);
        let page = page.clamp(1, total_pages);

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

pub fn paginate<T: Clone>(items: &[T], page: i64, per_page: i64) -> Page<T> {
    let meta = PageMeta::new(items.len() as i64, page, per_page);
    let start = (meta.offset() as usize).min(items.len());
    let end = start.saturating_add(meta.per_page as usize).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_has_one_page() {
        let page = paginate::<u32>(&[], 3, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.total_pages, 1);
        assert_eq!(page.meta.page, 1);
        assert!(!page.meta.has_prev);
        assert!(!page.meta.has_next);
    }

    #[test]
    fn second_of_two_single_item_pages() {
        let page = paginate(&["A1", "B2"], 2, 1);
        assert_eq!(page.items, vec!["B2"]);
        assert_eq!(page.meta.total_pages, 2);
        assert!(page.meta.has_prev);
        assert!(!page.meta.has_next);
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        let items: Vec<u32> = (0..25).collect();

        let last = paginate(&items, 99, 10);
        assert_eq!(last.meta.page, 3);
        assert_eq!(last.items, (20..25).collect::<Vec<_>>());

        let first = paginate(&items, -4, 10);
        assert_eq!(first.meta.page, 1);
        assert_eq!(first.items.len(), 10);
        assert!(first.meta.has_next);
    }

    #[test]
    fn huge_page_size_holds_everything() {
        let page = paginate(&[1, 2, 3], 1, i64::MAX);
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.meta.total_pages, 1);
        assert!(!page.meta.has_next);

        let meta = PageMeta::new(i64::MAX, i64::MAX, i64::MAX - 1);
        assert_eq!(meta.total_pages, 2);
        assert_eq!(meta.page, 2);
    }

    proptest! {
        #[test]
        fn pages_concatenate_to_input(len in 0usize..200, per_page in 1i64..60) {
            let items: Vec<usize> = (0..len).collect();
            let total_pages = PageMeta::new(len as i64, 1, per_page).total_pages;

            let mut joined = Vec::with_capacity(len);
            for page in 1..=total_pages {
                let slice = paginate(&items, page, per_page);
                prop_assert_eq!(slice.meta.total, len as i64);
                prop_assert!(slice.items.len() as i64 <= per_page);
                joined.extend(slice.items);
            }
            prop_assert_eq!(joined, items);
        }
    }
}

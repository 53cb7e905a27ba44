//! Incremental list filtering for the browsing flows.
//!
//! A [`ListFilter`] owns the master list and derives the displayed subsequence
//! from the current query. The derived list is always recomputed from the
//! master list; lists here are at most a few hundred entries.

/// An item that can be matched by a [`ListFilter`].
pub trait Searchable {
    /// The fields matched against the query, in a fixed order.
    fn search_fields(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter<T> {
    master: Vec<T>,
    query: String,
    /// Indices into `master` of the items currently displayed.
    filtered: Vec<usize>,
    cursor: usize,
}

impl<T: Searchable> ListFilter<T> {
    pub fn new(master: Vec<T>) -> Self {
        let filtered = (0..master.len()).collect();
        Self {
            master,
            query: String::new(),
            filtered,
            cursor: 0,
        }
    }

    /// Replace the query and rescan the master list.
    ///
    /// The cursor always returns to the first displayed item.
    pub fn set_query(mut self, query: &str) -> Self {
        let needle = query.to_lowercase();
        self.filtered = self
            .master
            .iter()
            .enumerate()
            .filter(|(_, item)| matches(*item, &needle))
            .map(|(idx, _)| idx)
            .collect();
        self.query = query.to_string();
        self.cursor = 0;
        self
    }

    /// Drop the query; the displayed list becomes the master list again.
    pub fn clear(self) -> Self {
        self.set_query("")
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_filtered(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn master(&self) -> &[T] {
        &self.master
    }

    /// Items currently displayed, in master order.
    pub fn displayed(&self) -> impl Iterator<Item = &T> + '_ {
        self.filtered.iter().map(move |&idx| &self.master[idx])
    }

    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<&T> {
        self.filtered.get(self.cursor).map(|&idx| &self.master[idx])
    }

    pub fn move_up(mut self) -> Self {
        self.cursor = self.cursor.saturating_sub(1);
        self
    }

    pub fn move_down(mut self) -> Self {
        if self.cursor + 1 < self.filtered.len() {
            self.cursor += 1;
        }
        self
    }

    pub fn move_top(mut self) -> Self {
        self.cursor = 0;
        self
    }

    pub fn move_bottom(mut self) -> Self {
        self.cursor = self.filtered.len().saturating_sub(1);
        self
    }

    /// Move the cursor to the first displayed item satisfying `pred`.
    pub fn select_where(mut self, pred: impl Fn(&T) -> bool) -> Self {
        if let Some(pos) = self
            .filtered
            .iter()
            .position(|&idx| pred(&self.master[idx]))
        {
            self.cursor = pos;
        }
        self
    }
}

fn matches<T: Searchable>(item: &T, needle: &str) -> bool {
    needle.is_empty()
        || item
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        note: &'static str,
    }

    impl Searchable for Item {
        fn search_fields(&self) -> Vec<&str> {
            vec![self.name, self.note]
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "alpha", note: "First" },
            Item { name: "beta", note: "second" },
            Item { name: "gamma", note: "THIRD alpha" },
            Item { name: "delta", note: "fourth" },
        ]
    }

    fn names(filter: &ListFilter<Item>) -> Vec<&str> {
        filter.displayed().map(|i| i.name).collect()
    }

    #[test]
    fn test_new_displays_master() {
        let filter = ListFilter::new(items());
        assert_eq!(names(&filter), vec!["alpha", "beta", "gamma", "delta"]);
        assert_eq!(filter.cursor(), 0);
        assert!(!filter.is_filtered());
    }

    #[test]
    fn test_query_is_case_insensitive_and_order_preserving() {
        let filter = ListFilter::new(items()).set_query("ALPHA");
        assert_eq!(names(&filter), vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_query_matches_any_field() {
        let filter = ListFilter::new(items()).set_query("third");
        assert_eq!(names(&filter), vec!["gamma"]);
    }

    #[test]
    fn test_query_resets_cursor() {
        let filter = ListFilter::new(items()).move_down().move_down().move_down();
        assert_eq!(filter.cursor(), 3);
        let filter = filter.set_query("a");
        assert_eq!(filter.cursor(), 0);
    }

    #[test]
    fn test_rescan_is_not_incremental() {
        // Widening the query must bring back items a narrower query removed.
        let filter = ListFilter::new(items()).set_query("alp").set_query("a");
        assert_eq!(names(&filter), vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn test_filtered_is_subsequence_of_master() {
        for query in ["", "a", "e", "ta", "zzz", "SECOND"] {
            let filter = ListFilter::new(items()).set_query(query);
            let mut master = filter.master().iter();
            for shown in filter.displayed() {
                assert!(master.any(|m| m == shown), "query {query:?}");
            }
        }
    }

    #[test]
    fn test_no_matches_has_zero_cursor_and_no_selection() {
        let filter = ListFilter::new(items()).set_query("zzz");
        assert!(filter.is_empty());
        assert_eq!(filter.cursor(), 0);
        assert!(filter.selected().is_none());
        let filter = filter.move_down().move_bottom();
        assert_eq!(filter.cursor(), 0);
    }

    #[test]
    fn test_clear_restores_master_and_is_idempotent() {
        let filter = ListFilter::new(items()).set_query("beta").move_down();
        let once = filter.clear();
        let twice = once.clone().clear();
        assert_eq!(once, twice);
        assert_eq!(names(&once), vec!["alpha", "beta", "gamma", "delta"]);
        assert_eq!(once.query(), "");
        assert_eq!(once.cursor(), 0);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let filter = ListFilter::new(items()).move_up();
        assert_eq!(filter.cursor(), 0);
        let filter = filter.move_bottom().move_down();
        assert_eq!(filter.cursor(), 3);
        assert_eq!(filter.selected().map(|i| i.name), Some("delta"));
        assert_eq!(filter.move_top().cursor(), 0);
    }

    #[test]
    fn test_select_where() {
        let filter = ListFilter::new(items()).select_where(|i| i.name == "gamma");
        assert_eq!(filter.cursor(), 2);
        let unchanged = filter.select_where(|i| i.name == "omega");
        assert_eq!(unchanged.cursor(), 2);
    }
}

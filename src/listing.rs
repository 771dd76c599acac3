//! Shared list-screen mechanics: substring search, fixed-size pagination,
//! and the selected-row set

use std::collections::BTreeSet;

/// Case-insensitive substring match
pub fn substring_match(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep the rows where any searched field contains the term
pub fn filter_by<T: Clone>(
    items: &[T],
    term: &str,
    fields: impl Fn(&T) -> Vec<String>,
) -> Vec<T> {
    if term.trim().is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| fields(item).iter().any(|f| substring_match(f, term)))
        .cloned()
        .collect()
}

/// Number of pages for `len` items at `per_page` each
pub fn page_count(len: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    len.div_ceil(per_page)
}

/// One page of a filtered collection. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice out page `page` (1-based, clamped into range)
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = page_count(total_items, per_page);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total_items);
    let slice = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Page {
        items: slice,
        page,
        per_page,
        total_pages,
        total_items,
    }
}

/// Selected-row id set. Ordered so listings of the selection are stable.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: &str, selected: bool) {
        if selected {
            self.ids.insert(id.to_string());
        } else {
            self.ids.remove(id);
        }
    }

    /// Replace the selection with every id of the (filtered) collection
    pub fn select_all<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn remove(&mut self, id: &str) {
        self.ids.remove(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

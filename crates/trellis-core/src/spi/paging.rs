use serde::{Deserialize, Serialize};

/// Result ordering requested from the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Backend-determined order (must still be stable within one query)
    #[default]
    Unordered,
    /// Ascending by the named property ("id" sorts by element id)
    Ascending(String),
    /// Descending by the named property
    Descending(String),
}

/// Paging instructions for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pager {
    pub page_number: usize,
    pub page_size: usize,
    pub order: SortOrder,
}

impl Pager {
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
            order: SortOrder::Unordered,
        }
    }

    /// A single page spanning all results
    pub fn all() -> Self {
        Self::new(0, usize::MAX)
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Index of the first element on this page
    pub fn offset(&self) -> usize {
        self.page_number.saturating_mul(self.page_size)
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::all()
    }
}

/// One page of query results, along with the total result count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert each item, keeping the total
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(Pager::new(0, 10).offset(), 0);
        assert_eq!(Pager::new(3, 10).offset(), 30);
        // saturates instead of overflowing
        assert_eq!(Pager::all().offset(), 0);
    }

    #[test]
    fn test_page_map_keeps_total() {
        let page = Page::new(vec![1, 2, 3], 10);
        let mapped = page.map(|n| n * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 10);
    }
}

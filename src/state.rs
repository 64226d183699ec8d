use serde_json::Value;
use std::collections::HashSet;

use crate::results::ProductRecord;

/// Everything a run has collected so far
#[derive(Debug, Default, Clone)]
pub struct ScrapeState {
    /// Identifiers already accumulated; only ever grows
    pub seen_ids: HashSet<String>,

    /// Records in discovery order
    pub accumulated: Vec<ProductRecord>,

    /// Untransformed payload fragments captured during this run
    pub raw: Vec<Value>,
}

impl ScrapeState {
    /// Build a state from previously persisted records.
    ///
    /// Later records repeating an earlier identifier are dropped.
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        let mut state = Self::default();
        state.extend_new(records);
        state
    }

    /// Append records whose identifiers are not yet known, returning how many were kept
    pub fn extend_new(&mut self, records: Vec<ProductRecord>) -> usize {
        let fresh = crate::dedup::filter_new(records, &mut self.seen_ids);
        let count = fresh.len();
        self.accumulated.extend(fresh);
        count
    }

    /// Number of accumulated records discovered under `category`
    pub fn category_count(&self, category: &str) -> usize {
        self.accumulated
            .iter()
            .filter(|record| record.category == category)
            .count()
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, category: &str) -> ProductRecord {
        ProductRecord::new(
            id.to_string(),
            format!("Product {}", id),
            format!("https://shop.example/products/{}", id),
            category.to_string(),
        )
    }

    #[test]
    fn test_from_records_drops_repeated_ids() {
        let state = ScrapeState::from_records(vec![
            record("A", "tops"),
            record("B", "tops"),
            record("A", "bottoms"),
        ]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.accumulated[0].category, "tops");
        assert!(state.seen_ids.contains("A"));
        assert!(state.seen_ids.contains("B"));
    }

    #[test]
    fn test_category_count() {
        let state = ScrapeState::from_records(vec![
            record("A", "tops"),
            record("B", "bottoms"),
            record("C", "tops"),
        ]);
        assert_eq!(state.category_count("tops"), 2);
        assert_eq!(state.category_count("bottoms"), 1);
        assert_eq!(state.category_count("hats"), 0);
    }
}

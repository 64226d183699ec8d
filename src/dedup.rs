use std::collections::HashSet;

use crate::results::ProductRecord;

/// Keeps only records whose identifier is not yet in `seen_ids`.
///
/// Every returned identifier is inserted into `seen_ids`; a repeated
/// identifier within the same batch keeps its first occurrence. An empty
/// result means the batch held nothing new.
pub fn filter_new(records: Vec<ProductRecord>, seen_ids: &mut HashSet<String>) -> Vec<ProductRecord> {
    let mut fresh = Vec::with_capacity(records.len());
    for record in records {
        if seen_ids.contains(&record.id) {
            ::log::trace!("Skipping already seen product {}", record.id);
            continue;
        }
        seen_ids.insert(record.id.clone());
        fresh.push(record);
    }
    fresh
}

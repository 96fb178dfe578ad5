use std::collections::{HashMap, HashSet};

use crate::types::{IndexRecord, WorkItem};

/// Deduplicate requested items by URL, keeping the first-seen label and the
/// original order.
pub fn dedupe_items(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.clone()))
        .collect()
}

/// Compute the items still needing processing against the index snapshot.
///
/// An item is pending unless a record for its URL is settled (done or
/// skipped). Failed records re-enter the pipeline: only success or
/// confirmed-irrelevance is terminal across runs.
///
/// Pure function of its inputs; no side effects.
pub fn pending_items(
    items: Vec<WorkItem>,
    index: &HashMap<String, IndexRecord>,
) -> Vec<WorkItem> {
    dedupe_items(items)
        .into_iter()
        .filter(|item| {
            index
                .get(&item.url)
                .is_none_or(|record| !record.status.is_settled())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordStatus;

    fn item(url: &str) -> WorkItem {
        WorkItem::new(url, format!("label for {url}"))
    }

    fn record(url: &str, status: RecordStatus) -> IndexRecord {
        let mut r = IndexRecord::skipped(&item(url));
        r.status = status;
        r
    }

    fn index_of(records: Vec<IndexRecord>) -> HashMap<String, IndexRecord> {
        records.into_iter().map(|r| (r.url.clone(), r)).collect()
    }

    #[test]
    fn dedupe_keeps_first_seen_label_and_order() {
        let items = vec![
            WorkItem::new("https://a.example", "first"),
            WorkItem::new("https://b.example", "b"),
            WorkItem::new("https://a.example", "second"),
        ];
        let deduped = dedupe_items(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "https://a.example");
        assert_eq!(deduped[0].label, "first");
        assert_eq!(deduped[1].url, "https://b.example");
    }

    #[test]
    fn unprocessed_items_are_pending() {
        let pending = pending_items(vec![item("https://a.example")], &HashMap::new());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn settled_records_are_skipped() {
        let index = index_of(vec![
            record("https://a.example", RecordStatus::Done),
            record("https://b.example", RecordStatus::SkippedNotMeaningful),
        ]);
        let pending = pending_items(
            vec![
                item("https://a.example"),
                item("https://b.example"),
                item("https://c.example"),
            ],
            &index,
        );
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://c.example");
    }

    #[test]
    fn failed_records_are_reprocessed() {
        let index = index_of(vec![record("https://a.example", RecordStatus::Failed)]);
        let pending = pending_items(vec![item("https://a.example")], &index);
        assert_eq!(pending.len(), 1);
    }
}

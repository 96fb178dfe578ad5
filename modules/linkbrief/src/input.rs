use std::path::Path;

use crate::error::{LinkbriefError, Result};
use crate::types::WorkItem;

/// Parse the raw request list: one `url | label` pair per line.
/// Lines without a separator, blank lines, and `#` comments are skipped.
pub fn parse_items(text: &str) -> Vec<WorkItem> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (url, label) = line.split_once('|')?;
            let url = url.trim();
            if url.is_empty() {
                return None;
            }
            Some(WorkItem::new(url, label.trim()))
        })
        .collect()
}

/// Read and parse the input file. A missing or unreadable file is fatal.
pub fn read_items(path: &Path) -> Result<Vec<WorkItem>> {
    let text = std::fs::read_to_string(path).map_err(|source| LinkbriefError::Input {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_items(&text))
}

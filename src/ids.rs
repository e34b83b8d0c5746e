//! Generation of element IDs.
//!
//! IDs consist of a type prefix and a number drawn from one counter per document,
//! so IDs are unique across all element types of a document (`otus0`, `seq1`,
//! `node2`, ...).

/// ID prefixes used by the readers.
pub mod prefixes {
    pub const OTU_LIST: &str = "otus";
    pub const OTU: &str = "otu";
    pub const MATRIX: &str = "matrix";
    pub const SEQUENCE: &str = "seq";
    pub const CHARACTER_SET: &str = "charSet";
    pub const TOKEN_SET: &str = "tokenSet";
    pub const SINGLE_TOKEN: &str = "tokenDefinition";
    pub const TREE_NETWORK_GROUP: &str = "treeGroup";
    pub const TREE: &str = "tree";
    pub const NODE: &str = "node";
    pub const EDGE: &str = "edge";
    pub const META: &str = "meta";
}

/// Hands out document-unique IDs.
#[derive(Debug, Default, Clone)]
pub struct IdManager {
    next: u64,
}

impl IdManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_new_id(&mut self, prefix: &str) -> String {
        let id = format!("{}{}", prefix, self.next);
        self.next += 1;
        id
    }

    /// Number of IDs created so far.
    pub fn count(&self) -> u64 {
        self.next
    }
}

/// Iterates the IDs `prefix + n` for `n` in `start..end`.
#[derive(Debug, Clone)]
pub struct NumberedIdsIterator {
    prefix: String,
    next: u64,
    end: u64,
}

impl NumberedIdsIterator {
    pub fn new(prefix: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: start,
            end: end.max(start),
        }
    }
}

impl Iterator for NumberedIdsIterator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next >= self.end {
            return None;
        }
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NumberedIdsIterator {}

/// Extracts `n` from an ID of the form `prefix + n`.
pub fn extract_index_from_id(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_shared_across_prefixes() {
        let mut ids = IdManager::new();
        assert_eq!(ids.create_new_id(prefixes::OTU_LIST), "otus0");
        assert_eq!(ids.create_new_id(prefixes::SEQUENCE), "seq1");
        assert_eq!(ids.create_new_id(prefixes::NODE), "node2");
        assert_eq!(ids.count(), 3);
    }

    #[test]
    fn test_numbered_ids() {
        let ids: Vec<String> = NumberedIdsIterator::new("otu", 2, 5).collect();
        assert_eq!(ids, vec!["otu2", "otu3", "otu4"]);
        assert_eq!(NumberedIdsIterator::new("otu", 3, 1).len(), 0);
    }

    #[test]
    fn test_extract_index() {
        assert_eq!(extract_index_from_id("seq12", prefixes::SEQUENCE), Some(12));
        assert_eq!(extract_index_from_id("node12", prefixes::SEQUENCE), None);
        assert_eq!(extract_index_from_id("seqx", prefixes::SEQUENCE), None);
    }
}

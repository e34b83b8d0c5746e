//! Resolution of Newick node labels through translation tables.
//!
//! NEXUS tree blocks may declare a `TRANSLATE` table mapping short keys (often the
//! 1-based index of a taxon) to taxon names. Tree strings then use the keys as node
//! labels.

use std::collections::HashMap;

/// Ordered mapping from keys to resolved labels.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. An existing key keeps its position and gets the new value.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.positions.get(&key) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    /// Value of the entry at a 0-based position in declaration order.
    pub fn get_by_position(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Labels of an OTU list in declaration order, with the OTU ID of each label.
#[derive(Debug, Clone, Default)]
pub struct OtuLabelIndex {
    labels: Vec<String>,
    ids: HashMap<String, String>,
}

impl OtuLabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>, otu_id: impl Into<String>) {
        let label = label.into();
        self.ids.insert(label.clone(), otu_id.into());
        self.labels.push(label);
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    pub fn id_for_label(&self, label: &str) -> Option<&str> {
        self.ids.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Turns raw node labels of a tree string into final labels and OTU links.
pub trait NodeLabelProcessor {
    fn process_label(&self, original: Option<&str>) -> Option<String>;

    /// ID of the OTU a processed label refers to, if any.
    fn linked_otu_id(&self, processed: Option<&str>) -> Option<String>;
}

/// Keeps labels as they are. Links labels to OTUs when an OTU list is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimLabelProcessor<'a> {
    otus: Option<&'a OtuLabelIndex>,
}

impl<'a> VerbatimLabelProcessor<'a> {
    pub fn new(otus: Option<&'a OtuLabelIndex>) -> Self {
        Self { otus }
    }
}

impl NodeLabelProcessor for VerbatimLabelProcessor<'_> {
    fn process_label(&self, original: Option<&str>) -> Option<String> {
        original.map(str::to_string)
    }

    fn linked_otu_id(&self, processed: Option<&str>) -> Option<String> {
        let otus = self.otus?;
        otus.id_for_label(processed?).map(str::to_string)
    }
}

/// Resolves labels through a translation table, falling back to taxon positions.
///
/// A label is resolved by the first rule that applies:
/// 1. the label is a key of the table: the mapped value;
/// 2. the label is a 1-based integer `n` and `n - 1` is a position of the table:
///    the value at that position;
/// 3. otherwise, if `n - 1` is a position of the OTU list: the taxon label there;
/// 4. otherwise the label unchanged.
#[derive(Debug, Clone, Copy)]
pub struct TranslatingLabelProcessor<'a> {
    table: &'a TranslationTable,
    otus: Option<&'a OtuLabelIndex>,
}

impl<'a> TranslatingLabelProcessor<'a> {
    pub fn new(table: &'a TranslationTable, otus: Option<&'a OtuLabelIndex>) -> Self {
        Self { table, otus }
    }
}

impl NodeLabelProcessor for TranslatingLabelProcessor<'_> {
    fn process_label(&self, original: Option<&str>) -> Option<String> {
        let label = original?;
        if let Some(value) = self.table.get(label) {
            return Some(value.to_string());
        }
        if let Some(index) = label.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
            if let Some(value) = self.table.get_by_position(index) {
                return Some(value.to_string());
            }
            if let Some(value) = self.otus.and_then(|otus| otus.label(index)) {
                return Some(value.to_string());
            }
        }
        log::debug!("Node label \"{}\" could not be translated and is used unchanged", label);
        Some(label.to_string())
    }

    fn linked_otu_id(&self, processed: Option<&str>) -> Option<String> {
        let otus = self.otus?;
        otus.id_for_label(processed?).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hla_table() -> TranslationTable {
        let mut table = TranslationTable::new();
        table.add("1", "A-2301");
        table.add("2", "A-2501");
        table
    }

    fn six_taxa() -> OtuLabelIndex {
        let mut otus = OtuLabelIndex::new();
        for (index, label) in ["t1", "t2", "t3", "t4", "t5", "t6"].iter().enumerate() {
            otus.add(*label, format!("otu{}", index));
        }
        otus
    }

    #[test]
    fn test_key_lookup() {
        let table = hla_table();
        let processor = TranslatingLabelProcessor::new(&table, None);
        assert_eq!(processor.process_label(Some("1")).as_deref(), Some("A-2301"));
        assert_eq!(processor.process_label(Some("2")).as_deref(), Some("A-2501"));
    }

    #[test]
    fn test_unknown_label_is_kept() {
        let table = hla_table();
        let processor = TranslatingLabelProcessor::new(&table, None);
        assert_eq!(
            processor.process_label(Some("A-2301")).as_deref(),
            Some("A-2301")
        );
        assert_eq!(processor.process_label(None), None);
    }

    #[test]
    fn test_index_beyond_table_uses_taxa() {
        let table = hla_table();
        let otus = six_taxa();
        let processor = TranslatingLabelProcessor::new(&table, Some(&otus));
        assert_eq!(processor.process_label(Some("5")).as_deref(), Some("t5"));
        assert_eq!(
            processor.linked_otu_id(Some("t5")).as_deref(),
            Some("otu4")
        );
        assert_eq!(processor.process_label(Some("7")).as_deref(), Some("7"));
        assert_eq!(processor.process_label(Some("0")).as_deref(), Some("0"));
    }

    #[test]
    fn test_positional_lookup_in_table() {
        let mut table = TranslationTable::new();
        table.add("a", "Alpha");
        table.add("b", "Beta");
        let processor = TranslatingLabelProcessor::new(&table, None);
        assert_eq!(processor.process_label(Some("2")).as_deref(), Some("Beta"));
    }

    #[test]
    fn test_table_replaces_existing_key() {
        let mut table = hla_table();
        table.add("1", "A-3301");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_by_position(0), Some("A-3301"));
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.get("1"), None);
    }

    #[test]
    fn test_verbatim_processor_links_otus() {
        let otus = six_taxa();
        let processor = VerbatimLabelProcessor::new(Some(&otus));
        assert_eq!(processor.process_label(Some("t2")).as_deref(), Some("t2"));
        assert_eq!(processor.linked_otu_id(Some("t2")).as_deref(), Some("otu1"));
        assert_eq!(processor.linked_otu_id(Some("x")), None);
    }
}

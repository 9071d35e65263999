//! Knowledge pipeline type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 2-D grid of cell strings; the first row is the header.
pub type TableGrid = Vec<Vec<String>>;

/// Extracted contents of one manual.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Machine name (file stem of the PDF)
    pub id: String,

    /// Page texts in order; a page without text is an empty string
    pub pages: Vec<String>,

    /// Tables found on each page, parallel to `pages`
    pub tables: Vec<Vec<TableGrid>>,
}

impl SourceDocument {
    /// Build a document from page texts, detecting tables on each page.
    pub fn from_pages(id: impl Into<String>, pages: Vec<String>) -> Self {
        let tables = pages
            .iter()
            .map(|page| crate::extractor::detect_tables(page))
            .collect();
        Self {
            id: id.into(),
            pages,
            tables,
        }
    }

    /// Whether any page mentions `term`, case-insensitively.
    pub fn contains_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.pages
            .iter()
            .any(|page| page.to_lowercase().contains(&needle))
    }
}

/// Tags for chunks that bypass machine filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkTag {
    /// The list of known machines
    MachineList,
    /// Welding process → machines cross-reference rows
    WeldingProcessAnalysis,
}

impl ChunkTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MachineList => "machine_list",
            Self::WeldingProcessAnalysis => "welding_process_analysis",
        }
    }
}

/// Metadata attached to every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,

    /// 1-based page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_idx: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_idx: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ChunkTag>,
}

/// A passage of text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// A text passage from a manual page.
    pub fn text_passage(machine: &str, page: u32, chunk_idx: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                machine: Some(machine.to_string()),
                page: Some(page),
                chunk_idx: Some(chunk_idx),
                ..Default::default()
            },
        }
    }

    /// A rendered table from a manual page.
    pub fn table(machine: &str, page: u32, table_idx: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                machine: Some(machine.to_string()),
                page: Some(page),
                table_idx: Some(table_idx),
                ..Default::default()
            },
        }
    }

    /// A corpus-level chunk that is always kept by the router.
    pub fn tagged(tag: ChunkTag, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                source: Some(tag),
                ..Default::default()
            },
        }
    }

    /// Whether the chunk survives every machine filter.
    pub fn is_always_included(&self) -> bool {
        self.metadata.source.is_some()
    }

    /// Case-insensitive machine comparison.
    pub fn belongs_to(&self, machine: &str) -> bool {
        self.metadata
            .machine
            .as_deref()
            .is_some_and(|m| same_machine(m, machine))
    }
}

/// Machine names compare equal under Unicode lowercasing.
fn same_machine(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Per-machine section label → body text (or the not-found marker).
pub type SectionMap = BTreeMap<String, BTreeMap<String, String>>;

/// Welding process → machines supporting it, ordered by process name.
///
/// Processes without machines are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReferenceTable {
    rows: BTreeMap<String, Vec<String>>,
}

impl CrossReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `machine` supports `attribute`; duplicates are ignored.
    pub fn add(&mut self, attribute: &str, machine: &str) {
        let machines = self.rows.entry(attribute.to_string()).or_default();
        if !machines.iter().any(|m| m == machine) {
            machines.push(machine.to_string());
        }
    }

    /// Rows in attribute order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Machines listed for `attribute`.
    pub fn machines_for(&self, attribute: &str) -> Option<&[String]> {
        self.rows.get(attribute).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Validated machine names, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityManifest {
    names: Vec<String>,
}

impl EntityManifest {
    /// Build a manifest; names are sorted and deduplicated.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// How a detection was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Whole-word match of the machine name
    Exact,
    /// Fuzzy score or plural form
    Approximate,
    /// Nothing matched
    None,
}

/// Machines referenced by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Original-cased machine names, sorted and deduplicated
    pub entities: Vec<String>,
    pub tier: MatchTier,
}

impl DetectionResult {
    pub fn new(entities: impl IntoIterator<Item = String>, tier: MatchTier) -> Self {
        let mut entities: Vec<String> = entities.into_iter().collect();
        entities.sort();
        entities.dedup();
        let tier = if entities.is_empty() { MatchTier::None } else { tier };
        Self { entities, tier }
    }

    pub fn empty() -> Self {
        Self {
            entities: Vec::new(),
            tier: MatchTier::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, machine: &str) -> bool {
        self.entities.iter().any(|e| same_machine(e, machine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_metadata_serialization_skips_absent_fields() {
        let chunk = Chunk::text_passage("Renegade", 2, 0, "Mains supply");
        let json = serde_json::to_value(&chunk).unwrap();

        assert_eq!(json["metadata"]["machine"], "Renegade");
        assert_eq!(json["metadata"]["page"], 2);
        assert!(json["metadata"].get("table_idx").is_none());
        assert!(json["metadata"].get("source").is_none());
    }

    #[test]
    fn test_tag_serializes_snake_case() {
        let chunk = Chunk::tagged(ChunkTag::WeldingProcessAnalysis, "row");
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["metadata"]["source"], "welding_process_analysis");
        assert!(chunk.is_always_included());
        assert_eq!(ChunkTag::MachineList.as_str(), "machine_list");
    }

    #[test]
    fn test_machine_comparison_lowercases_unicode() {
        let chunk = Chunk::text_passage("Ärgon-ÖL", 1, 0, "text");
        assert!(chunk.belongs_to("ärgon-öl"));

        let detection = DetectionResult::new(vec!["Ärgon-ÖL".to_string()], MatchTier::Exact);
        assert!(detection.contains("ÄRGON-öl"));
        assert!(!detection.contains("argon-ol"));
    }

    #[test]
    fn test_belongs_to_is_case_insensitive() {
        let chunk = Chunk::table("Warrior-Edge", 1, 0, "A | B");
        assert!(chunk.belongs_to("warrior-edge"));
        assert!(!chunk.belongs_to("Renegade"));
        assert!(!Chunk::tagged(ChunkTag::MachineList, "x").belongs_to("Renegade"));
    }

    #[test]
    fn test_cross_reference_rows_ordered_and_deduplicated() {
        let mut table = CrossReferenceTable::new();
        table.add("TIG", "Renegade");
        table.add("MMA", "Renegade");
        table.add("TIG", "Renegade");
        table.add("TIG", "Warrior-Edge");

        let rows: Vec<_> = table.rows().map(|(p, _)| p).collect();
        assert_eq!(rows, vec!["MMA", "TIG"]);
        assert_eq!(
            table.machines_for("TIG").unwrap(),
            &["Renegade".to_string(), "Warrior-Edge".to_string()]
        );
    }

    #[test]
    fn test_manifest_sorted_and_deduplicated() {
        let manifest = EntityManifest::new(vec![
            "Warrior-Edge".to_string(),
            "Renegade".to_string(),
            "Renegade".to_string(),
        ]);
        assert_eq!(manifest.names(), &["Renegade", "Warrior-Edge"]);
    }

    #[test]
    fn test_detection_result_empty_has_no_tier() {
        let result = DetectionResult::new(Vec::new(), MatchTier::Exact);
        assert_eq!(result.tier, MatchTier::None);
        assert!(result.is_empty());
    }

    #[test]
    fn test_contains_term_case_insensitive() {
        let doc = SourceDocument::from_pages("M", vec!["".into(), "Overall DIMENSIONS".into()]);
        assert!(doc.contains_term("dimensions"));
        assert!(!doc.contains_term("weight"));
    }
}

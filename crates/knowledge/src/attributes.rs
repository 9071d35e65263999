//! Welding process detection from manual sections.
//!
//! Builds the cross-reference of which machines support which process by
//! whole-word keyword search over each machine's introduction and technical
//! data.

use crate::sections::{INTRODUCTION, TECHNICAL_DATA};
use crate::types::{Chunk, ChunkTag, CrossReferenceTable, SectionMap};
use manualqa_core::{AppError, AppResult};
use regex::Regex;

/// Keyword registry: process name → keywords that indicate support.
pub const WELDING_PROCESSES: &[(&str, &[&str])] = &[
    ("MMA", &["MMA", "STICK", "SMAW"]),
    ("MIG/MAG", &["MIG", "MAG", "GMAW"]),
    ("TIG", &["TIG", "GTAW"]),
    ("FCAW", &["FCAW", "FLUX CORED"]),
];

/// Compiled whole-word matchers for a process registry.
pub struct AttributeDetector {
    processes: Vec<(String, Vec<Regex>)>,
}

impl AttributeDetector {
    pub fn new(registry: &[(&str, &[&str])]) -> AppResult<Self> {
        let mut processes = Vec::with_capacity(registry.len());

        for (process, keywords) in registry {
            let matchers = keywords
                .iter()
                .map(|kw| {
                    let pattern = format!(r"\b{}\b", regex::escape(&kw.to_uppercase()));
                    Regex::new(&pattern).map_err(|e| {
                        AppError::Knowledge(format!("Invalid keyword pattern '{}': {}", kw, e))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;
            processes.push((process.to_string(), matchers));
        }

        Ok(Self { processes })
    }

    /// Detector for the built-in welding process registry.
    pub fn welding() -> AppResult<Self> {
        Self::new(WELDING_PROCESSES)
    }

    /// Processes whose keywords appear as whole words in `text`.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let upper = text.to_uppercase();
        self.processes
            .iter()
            .filter(|(_, matchers)| matchers.iter().any(|m| m.is_match(&upper)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Build the cross-reference table for every machine in `sections`.
    ///
    /// Only the introduction and technical data are searched. A not-found
    /// marker contains none of the keywords, so it never matches.
    pub fn detect(&self, sections: &SectionMap) -> CrossReferenceTable {
        let mut table = CrossReferenceTable::new();

        for (machine, labels) in sections {
            let combined = [INTRODUCTION, TECHNICAL_DATA]
                .iter()
                .filter_map(|label| labels.get(*label))
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");

            for process in self.matches(&combined) {
                tracing::info!("Machine '{}' supports welding process '{}'", machine, process);
                table.add(process, machine);
            }
        }

        tracing::info!("Detected {} welding process(es)", table.len());
        table
    }
}

/// Sentence describing one cross-reference row.
pub fn row_text(process: &str, machines: &[String]) -> String {
    format!(
        "The welding process {} is compatible with the following machines: {}.",
        process,
        machines.join(", ")
    )
}

/// One always-included chunk per cross-reference row, in process order.
pub fn cross_reference_chunks(table: &CrossReferenceTable) -> Vec<Chunk> {
    table
        .rows()
        .map(|(process, machines)| {
            Chunk::tagged(ChunkTag::WeldingProcessAnalysis, row_text(process, machines))
        })
        .collect()
}

//! Labelled section extraction from manual page text.
//!
//! A line-oriented state machine: a target header switches capture to that
//! label, any other numbered all-caps header stops capture, and everything
//! else is appended to the active label. State carries across pages of one
//! manual.

use crate::types::{SectionMap, SourceDocument};
use manualqa_core::{AppError, AppResult};
use regex::Regex;
use std::collections::BTreeMap;

pub const INTRODUCTION: &str = "INTRODUCTION";
pub const TECHNICAL_DATA: &str = "TECHNICAL DATA";

/// Body recorded for a label that never appeared (or captured nothing).
pub fn not_found_marker(label: &str) -> String {
    format!("[INFO] No {} section found.", label.to_uppercase())
}

/// Whether a section body is the not-found marker.
pub fn is_not_found_marker(body: &str) -> bool {
    body.starts_with("[INFO] No ") && body.ends_with(" section found.")
}

struct LabelPatterns {
    label: String,
    patterns: Vec<Regex>,
}

/// Compiled header patterns for a set of section labels.
pub struct SectionParser {
    labels: Vec<LabelPatterns>,
    sentinel: Regex,
}

impl SectionParser {
    /// Compile header patterns for `labels`.
    pub fn new(labels: &[&str]) -> AppResult<Self> {
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| {
                AppError::Knowledge(format!("Invalid section pattern '{}': {}", pattern, e))
            })
        };

        let mut compiled = Vec::with_capacity(labels.len());
        for label in labels {
            let upper = label.to_uppercase();
            let l = regex::escape(&upper);
            let forms = [
                format!(r"(?i)^\d+\.\s+{l}$"),
                format!(r"(?i)^[IVXLCDM]+\.\s+{l}$"),
                format!(r"(?i)^\d+\s+{l}$"),
                format!(r"(?i)^[IVXLCDM]+\s+{l}$"),
                format!(r"(?i)^{l}$"),
                format!(r"(?i)^\d+\.\s+{l}[:\-]$"),
                format!(r"(?i)^[IVXLCDM]+\.\s+{l}[:\-]$"),
                format!(r"(?i)^{l}[:\-]$"),
            ];

            let patterns = forms
                .into_iter()
                .map(compile)
                .collect::<AppResult<Vec<_>>>()?;

            compiled.push(LabelPatterns {
                label: upper,
                patterns,
            });
        }

        Ok(Self {
            labels: compiled,
            sentinel: compile(r"^\d+\.?\s+[A-Z\s\-]+$".to_string())?,
        })
    }

    /// Parser for the introduction and technical-data sections.
    pub fn standard() -> AppResult<Self> {
        Self::new(&[INTRODUCTION, TECHNICAL_DATA])
    }

    fn match_header(&self, trimmed: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|l| l.patterns.iter().any(|p| p.is_match(trimmed)))
    }

    /// Extract every label from a sequence of page texts.
    ///
    /// Each label maps to its trimmed body, or the not-found marker.
    pub fn parse_pages<S: AsRef<str>>(&self, pages: &[S]) -> BTreeMap<String, String> {
        let mut collected: Vec<String> = vec![String::new(); self.labels.len()];
        let mut active: Option<usize> = None;

        for page in pages {
            for line in page.as_ref().lines() {
                let trimmed = line.trim();

                if let Some(idx) = self.match_header(trimmed) {
                    tracing::trace!("Section header '{}'", self.labels[idx].label);
                    active = Some(idx);
                } else if self.sentinel.is_match(&trimmed.to_uppercase()) {
                    active = None;
                } else if let Some(idx) = active {
                    collected[idx].push_str(line);
                    collected[idx].push('\n');
                }
            }
        }

        self.labels
            .iter()
            .zip(collected)
            .map(|(l, text)| {
                let body = text.trim();
                let body = if body.is_empty() {
                    not_found_marker(&l.label)
                } else {
                    body.to_string()
                };
                (l.label.clone(), body)
            })
            .collect()
    }

    /// Extract sections for one manual.
    pub fn parse(&self, doc: &SourceDocument) -> BTreeMap<String, String> {
        let sections = self.parse_pages(&doc.pages);
        for (label, body) in &sections {
            if is_not_found_marker(body) {
                tracing::warn!("No content found for section '{}' in '{}'", label, doc.id);
            } else {
                tracing::debug!("Extracted section '{}' for '{}'", label, doc.id);
            }
        }
        sections
    }
}

/// Extract sections for every manual, keyed by machine name.
pub fn extract_sections(parser: &SectionParser, docs: &[SourceDocument]) -> SectionMap {
    docs.iter()
        .map(|doc| (doc.id.clone(), parser.parse(doc)))
        .collect()
}

//! Chunking of extracted manuals into passages ready for embedding.

use crate::types::{Chunk, SourceDocument, TableGrid};
use manualqa_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Splits page text into overlapping passages and renders tables.
pub struct Chunker {
    splitter: TextSplitter<text_splitter::Characters>,
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with a target size and overlap, both in characters.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(overlap)
            .map_err(|e| {
                AppError::Config(format!(
                    "Invalid chunking (size {}, overlap {}): {}",
                    chunk_size, overlap, e
                ))
            })?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            chunk_size,
            overlap,
        })
    }

    /// Split one page of text into passages.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.splitter
            .chunks(text)
            .filter(|c| !c.trim().is_empty())
            .collect()
    }

    /// Chunk every page of a manual: text passages first, then one chunk per
    /// table with a header and at least one data row.
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (page_idx, page_text) in doc.pages.iter().enumerate() {
            let page = page_idx as u32 + 1;

            for (idx, passage) in self.split_text(page_text).into_iter().enumerate() {
                chunks.push(Chunk::text_passage(&doc.id, page, idx as u32, passage));
            }

            if let Some(tables) = doc.tables.get(page_idx) {
                for (table_idx, table) in tables.iter().enumerate() {
                    if let Some(rendered) = render_table(table) {
                        chunks.push(Chunk::table(&doc.id, page, table_idx as u32, rendered));
                    }
                }
            }
        }

        tracing::debug!(
            "Chunked '{}' into {} chunks (size: {}, overlap: {})",
            doc.id,
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }
}

fn clean_cell(cell: &str) -> String {
    cell.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render a table as a header line followed by one `Header: value` line per
/// data row. Tables without a data row render to `None`.
pub fn render_table(table: &TableGrid) -> Option<String> {
    let (header, rows) = table.split_first()?;
    if rows.is_empty() {
        return None;
    }

    let header: Vec<String> = header.iter().map(|h| clean_cell(h)).collect();

    let mut lines = Vec::with_capacity(table.len());
    lines.push(header.join(" | "));

    for row in rows {
        let cells: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = row.get(i).map(|v| clean_cell(v)).unwrap_or_default();
                format!("{}: {}", name, value)
            })
            .collect();
        lines.push(cells.join(" | "));
    }

    Some(lines.join("\n"))
}

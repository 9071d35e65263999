//! Answer and conversation types.

use crate::router::RouteScope;
use crate::types::Chunk;
use serde::{Deserialize, Serialize};

/// Reply to a bare greeting.
pub const GREETING_REPLY: &str = "Hello, how may I assist you today?";

/// Shown when a query fails for any reason other than a missing index.
pub const UNABLE_TO_PROCESS: &str = "Unable to process the query at the moment.";

/// Greeting tokens answered without retrieval.
pub const GREETINGS: &[&str] = &["hi", "hello", "hey", "hola", "howdy", "greetings"];

/// Maximum snippet length for source references.
const MAX_SNIPPET_LENGTH: usize = 150;

/// Whether `query` is nothing but a greeting.
pub fn is_greeting(query: &str) -> bool {
    let normalized = query.trim().to_lowercase();
    GREETINGS.contains(&normalized.as_str())
}

/// Where a piece of retrieved evidence came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSourceRef {
    /// Machine name, or the kind of corpus-wide entry
    pub source: String,

    /// Human-readable location, e.g. "page 3, table 1"
    pub location: String,

    /// Short snippet showing the evidence
    pub snippet: String,
}

impl RagSourceRef {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let meta = &chunk.metadata;

        let source = match (&meta.machine, meta.source) {
            (Some(machine), _) => machine.clone(),
            (None, Some(tag)) => tag.as_str().to_string(),
            (None, None) => "unknown".to_string(),
        };

        let location = match (meta.page, meta.table_idx, meta.chunk_idx) {
            (Some(page), Some(table), _) => format!("page {}, table {}", page, table + 1),
            (Some(page), None, Some(idx)) => format!("page {}, passage {}", page, idx + 1),
            (Some(page), None, None) => format!("page {}", page),
            _ => "corpus summary".to_string(),
        };

        Self {
            source,
            location,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
        }
    }
}

/// Sources for retrieved chunks, deduplicated, in retrieval order.
pub fn map_chunks_to_sources<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Vec<RagSourceRef> {
    let mut sources: Vec<RagSourceRef> = Vec::new();
    for chunk in chunks {
        let source = RagSourceRef::from_chunk(chunk);
        if !sources
            .iter()
            .any(|s| s.source == source.source && s.location == source.location)
        {
            sources.push(source);
        }
    }
    sources
}

/// Truncate at a word boundary, on a char boundary.
pub(crate) fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }

    let truncated: String = flat.chars().take(max_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}

/// A grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,

    pub sources: Vec<RagSourceRef>,

    /// Machines the retrieval was narrowed to (empty for the full index)
    pub machines: Vec<String>,

    #[serde(skip)]
    pub scope: Option<RouteScope>,

    /// Highest similarity score among retrieved chunks
    #[serde(skip_serializing)]
    pub max_score: f32,
}

/// One completed exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// Render prior turns for the `chat_history` prompt slot.
pub fn render_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nBot: {}", t.user, t.assistant))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of one chat turn.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Greeting fast path; nothing retrieved.
    Greeting(String),
    /// Generated answer.
    Answer(RagResponse),
    /// The query failed; the message is safe to show.
    Failed(String),
}

impl Reply {
    /// Text to show the user.
    pub fn text(&self) -> &str {
        match self {
            Reply::Greeting(text) | Reply::Failed(text) => text,
            Reply::Answer(response) => &response.answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkTag;

    #[test]
    fn test_greetings_exact_only() {
        assert!(is_greeting("Hello"));
        assert!(is_greeting("  hey "));
        assert!(!is_greeting("hello, what fuse does the Warrior need?"));
        assert!(!is_greeting("hi!"));
    }

    #[test]
    fn test_source_ref_locations() {
        let table = RagSourceRef::from_chunk(&Chunk::table("Warrior", 3, 0, "A | B"));
        assert_eq!(table.source, "Warrior");
        assert_eq!(table.location, "page 3, table 1");

        let passage = RagSourceRef::from_chunk(&Chunk::text_passage("Warrior", 2, 4, "text"));
        assert_eq!(passage.location, "page 2, passage 5");

        let manifest = RagSourceRef::from_chunk(&Chunk::tagged(ChunkTag::MachineList, "list"));
        assert_eq!(manifest.source, "machine_list");
        assert_eq!(manifest.location, "corpus summary");
    }

    #[test]
    fn test_sources_deduplicated() {
        let chunks = [
            Chunk::table("Warrior", 3, 0, "A | B"),
            Chunk::table("Warrior", 3, 0, "A | B"),
            Chunk::text_passage("Aristo", 1, 0, "x"),
        ];
        assert_eq!(map_chunks_to_sources(&chunks).len(), 2);
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("Short\n text", 100), "Short text");

        let long = "Rated input voltage 400 V three phase with a fuse rating of 16 A slow";
        let result = truncate_snippet(long, 30);
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 33);

        assert_eq!(truncate_snippet("ÄÖÜÄÖÜÄÖÜ", 3), "ÄÖÜ...");
    }

    #[test]
    fn test_render_history() {
        let turns = vec![
            Turn {
                user: "fuse?".to_string(),
                assistant: "16 A".to_string(),
            },
            Turn {
                user: "weight?".to_string(),
                assistant: "20 kg".to_string(),
            },
        ];
        assert_eq!(
            render_history(&turns),
            "User: fuse?\nBot: 16 A\nUser: weight?\nBot: 20 kg"
        );
        assert_eq!(render_history(&[]), "");
    }
}

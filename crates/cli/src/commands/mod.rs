//! Command handlers for the ManualQA CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod build;
pub mod chat;
pub mod detect;
pub mod machines;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use build::BuildCommand;
pub use chat::ChatCommand;
pub use detect::DetectCommand;
pub use machines::MachinesCommand;
pub use stats::StatsCommand;

use manualqa_knowledge::{RagResponse, Reply};

/// Print a reply, with sources when requested.
pub(crate) fn print_reply(reply: &Reply, show_sources: bool) {
    println!("{}", reply.text());

    if let Reply::Answer(response) = reply {
        if show_sources {
            print_sources(response);
        }
    }
}

fn print_sources(response: &RagResponse) {
    if response.sources.is_empty() {
        return;
    }
    println!("\nSources:");
    for source in &response.sources {
        println!("  - {} ({}): {}", source.source, source.location, source.snippet);
    }
}

/// JSON rendering of a reply.
pub(crate) fn reply_json(reply: &Reply) -> serde_json::Value {
    match reply {
        Reply::Greeting(text) => serde_json::json!({ "kind": "greeting", "answer": text }),
        Reply::Failed(text) => serde_json::json!({ "kind": "error", "answer": text }),
        Reply::Answer(response) => serde_json::json!({
            "kind": "answer",
            "answer": response.answer,
            "machines": response.machines,
            "sources": response.sources,
        }),
    }
}

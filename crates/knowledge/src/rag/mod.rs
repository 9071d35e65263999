//! Question answering over the routed index.

pub mod ask;
pub mod context;
pub mod session;
pub mod types;

pub use ask::ask_rag;
pub use context::{context_key, AppContext, GENERAL_KEY};
pub use session::ChatSession;
pub use types::{is_greeting, RagResponse, RagSourceRef, Reply, Turn};

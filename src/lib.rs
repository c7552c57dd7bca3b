// Public API exports
pub mod error;
pub mod splitter;
pub mod token;
pub mod tokenizer;

// Re-export main types for convenience
pub use error::{Error, ParseError, SplitError};
pub use splitter::{split_message, split_message_with, Fragments};
pub use token::{Bracket, Chunk, TagSet, Token};
pub use tokenizer::tokenize;

/// Default fragment budget in characters (configurable per call)
pub const DEFAULT_MAX_LEN: usize = 4096;

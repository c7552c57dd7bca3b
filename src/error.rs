use thiserror::Error;

/// The input markup is structurally invalid with respect to the whitelist.
///
/// Always indicates malformed input, never a size problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected closing tag `{tag}` at position {pos}")]
    UnexpectedClosingTag { tag: String, pos: usize },

    #[error("unpaired closing tag `{tag}` at position {pos}")]
    UnpairedTag { tag: String, pos: usize },

    #[error("unclosed tag `{tag}` opened at position {pos}")]
    UnclosedTag { tag: String, pos: usize },
}

/// The markup is well-formed but cannot be packed into the requested budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("unsplittable block at position {pos}: {len} characters exceed the limit of {max_len}")]
    UnsplittableBlock {
        pos: usize,
        len: usize,
        max_len: usize,
        /// Literal source slice of the offending block
        snippet: String,
    },

    #[error("open tag hierarchy needs {required} characters, more than the limit of {max_len}")]
    HierarchyOverflow { required: usize, max_len: usize },

    #[error(
        "unbreakable element at position {pos} needs {required} characters \
         with its enclosing tags, more than the limit of {max_len}"
    )]
    OversizedElement {
        pos: usize,
        required: usize,
        max_len: usize,
    },

    #[error("tag scaffolding leaves no room for content at position {pos} within the limit of {max_len}")]
    BudgetExhausted { pos: usize, max_len: usize },
}

/// Any failure the fragment sequence can terminate with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Split(#[from] SplitError),
}

//! Token model: position-tagged pieces of the source markup.
//!
//! The tokenizer reduces the source to an ordered sequence of [`Token`]s:
//! [`Bracket`]s for the open/close occurrences of breakable (whitelisted)
//! tags, and opaque [`Chunk`]s for entire non-whitelisted elements. All
//! offsets are character (Unicode scalar) indices into the source, never
//! byte indices.

/// Immutable set of tag names whose elements may be split across fragments.
///
/// Any tag outside the set is treated as opaque: its whole element must fit
/// inside a single fragment. Lookup expects lowercased names, which is what
/// the tokenizer produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    names: Vec<String>,
}

impl TagSet {
    /// Build a custom set of breakable tag names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.names.iter().any(|n| n == tag)
    }
}

impl Default for TagSet {
    /// The fixed whitelist of breakable message tags.
    fn default() -> Self {
        Self::new(["p", "b", "strong", "i", "ul", "ol", "div", "span"])
    }
}

/// One occurrence (open or close) of a breakable tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    /// Lowercased tag name
    pub tag: String,
    /// True for the opening occurrence, false for the closing one
    pub is_start: bool,
    /// Character offset of the `<`
    pub pos_start: usize,
    /// Character offset just past the `>` (exclusive)
    pub pos_end: usize,
}

impl Bracket {
    /// Minimal opening markup, without any attributes.
    pub fn open_tag(&self) -> String {
        format!("<{}>", self.tag)
    }

    /// Minimal closing markup.
    pub fn close_tag(&self) -> String {
        format!("</{}>", self.tag)
    }

    /// Length of `open_tag()` in characters.
    pub fn open_len(&self) -> usize {
        self.tag.len() + 2
    }

    /// Length of `close_tag()` in characters.
    pub fn close_len(&self) -> usize {
        self.tag.len() + 3
    }

    /// Combined length of a minimal `<tag></tag>` pair.
    ///
    /// The size accounting relies on this matching the reconstructed markup
    /// exactly: `len("<tag>") + len("</tag>") = 2*len(tag) + 5`.
    pub fn paired_len(&self) -> usize {
        2 * self.tag.len() + 5
    }

    /// Literal span length of this occurrence in the source.
    pub fn char_len(&self) -> usize {
        self.pos_end - self.pos_start
    }
}

/// One entire non-whitelisted element, opening tag through matching close,
/// nested markup included. Indivisible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Lowercased tag name of the element
    pub tag: String,
    /// Character offset of the `<`
    pub pos_start: usize,
    /// Character offset just past the closing tag's `>`; `None` when the
    /// element is still unterminated at end of input
    pub pos_end: Option<usize>,
}

impl Chunk {
    /// Span length in characters, when the element was terminated.
    pub fn char_len(&self) -> Option<usize> {
        self.pos_end.map(|end| end - self.pos_start)
    }
}

/// A position-tagged piece of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Bracket(Bracket),
    Chunk(Chunk),
}

impl Token {
    pub fn pos_start(&self) -> usize {
        match self {
            Token::Bracket(b) => b.pos_start,
            Token::Chunk(c) => c.pos_start,
        }
    }

    /// Resolved span length; `None` for an unterminated chunk.
    pub fn char_len(&self) -> Option<usize> {
        match self {
            Token::Bracket(b) => Some(b.char_len()),
            Token::Chunk(c) => c.char_len(),
        }
    }
}

//! Tag-boundary scanner producing the packer's token sequence.
//!
//! The source is scanned as a stream of start-tag, end-tag and text events.
//! Whitelisted tag occurrences become [`Bracket`] tokens; a non-whitelisted
//! start tag opens an opaque [`Chunk`] that absorbs its entire subtree,
//! tracked with a nesting counter so nested same-named elements do not end
//! it early. Attributes are scanned past and discarded; entities are left
//! as-is.


use crate::error::ParseError;
use crate::token::{Bracket, Chunk, TagSet, Token};

/// Tokenize `source` into an ordered, position-monotonic token sequence.
///
/// Offsets are character indices. Fails when a closing tag outside the
/// whitelist has no matching open element.
pub fn tokenize(source: &str, tags: &TagSet) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    tokenize_chars(&chars, tags)
}

/// Char-slice entry point shared with the splitter, which owns its own
/// character buffer for slicing fragment bodies.
pub(crate) fn tokenize_chars(chars: &[char], tags: &TagSet) -> Result<Vec<Token>, ParseError> {
    let mut scanner = Scanner {
        tokens: Vec::new(),
        opaque_depth: 0,
        tags,
    };

    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '<' {
            i += 1;
            continue;
        }
        let Some(tag) = scan_tag(chars, i) else {
            // Not a tag boundary: a literal `<`, a comment, or a truncated
            // tag. All of it is plain text to the packer.
            i += 1;
            continue;
        };
        if tag.is_end {
            scanner.end_tag(&tag)?;
        } else {
            scanner.start_tag(&tag);
            if tag.self_closing {
                scanner.end_tag(&tag)?;
            }
        }
        i = tag.pos_end;
    }

    Ok(scanner.tokens)
}

struct Scanner<'a> {
    tokens: Vec<Token>,
    /// Nesting height of same-named elements inside the open opaque chunk
    opaque_depth: usize,
    tags: &'a TagSet,
}

impl Scanner<'_> {
    fn start_tag(&mut self, tag: &RawTag) {
        let Scanner {
            tokens,
            opaque_depth,
            tags,
        } = self;

        if let Some(Token::Chunk(chunk)) = tokens.last() {
            if chunk.pos_end.is_none() {
                if chunk.tag == tag.name {
                    *opaque_depth += 1;
                }
                return;
            }
        }

        if tags.contains(&tag.name) {
            tokens.push(Token::Bracket(Bracket {
                tag: tag.name.clone(),
                is_start: true,
                pos_start: tag.pos_start,
                pos_end: tag.pos_end,
            }));
        } else {
            tokens.push(Token::Chunk(Chunk {
                tag: tag.name.clone(),
                pos_start: tag.pos_start,
                pos_end: None,
            }));
            *opaque_depth = 1;
        }
    }

    fn end_tag(&mut self, tag: &RawTag) -> Result<(), ParseError> {
        let Scanner {
            tokens,
            opaque_depth,
            tags,
        } = self;

        if let Some(Token::Chunk(chunk)) = tokens.last_mut() {
            if chunk.pos_end.is_none() {
                if chunk.tag == tag.name {
                    *opaque_depth -= 1;
                    if *opaque_depth == 0 {
                        chunk.pos_end = Some(tag.pos_end);
                    }
                }
                return Ok(());
            }
        }

        if tags.contains(&tag.name) {
            // A close with no matching open is the packer's concern; it has
            // the open stack to judge it against.
            tokens.push(Token::Bracket(Bracket {
                tag: tag.name.clone(),
                is_start: false,
                pos_start: tag.pos_start,
                pos_end: tag.pos_end,
            }));
            Ok(())
        } else {
            Err(ParseError::UnexpectedClosingTag {
                tag: tag.name.clone(),
                pos: tag.pos_start,
            })
        }
    }
}

/// One `<...>` occurrence as found in the source.
struct RawTag {
    /// Lowercased name
    name: String,
    is_end: bool,
    self_closing: bool,
    /// Offset of the `<`
    pos_start: usize,
    /// Offset just past the `>`
    pos_end: usize,
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

/// Find the `>` closing the tag that starts at `lt`, skipping quoted
/// attribute values.
fn find_tag_end(chars: &[char], lt: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate().skip(lt + 1) {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == '>' {
                    return Some(i);
                }
            }
        }
    }
    None
}

/// Recognize a start or end tag at `lt` (`chars[lt] == '<'`).
///
/// Returns `None` unless a tag name letter directly follows `<` or `</` and
/// a closing `>` exists.
fn scan_tag(chars: &[char], lt: usize) -> Option<RawTag> {
    let mut i = lt + 1;
    let is_end = chars.get(i) == Some(&'/');
    if is_end {
        i += 1;
    }
    if !chars.get(i).is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let gt = find_tag_end(chars, lt)?;

    let name_start = i;
    while i < gt && is_name_char(chars[i]) {
        i += 1;
    }
    let name: String = chars[name_start..i]
        .iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();

    // Self-closing: a `/` directly before the `>`, ignoring whitespace.
    let mut j = gt;
    while j > name_start && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    let self_closing = !is_end && j > name_start && chars[j - 1] == '/';

    Some(RawTag {
        name,
        is_end,
        self_closing,
        pos_start: lt,
        pos_end: gt + 1,
    })
}

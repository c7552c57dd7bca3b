//! Greedy fragment packer.
//!
//! Walks the token sequence in order, tracking the currently-open tag
//! hierarchy and the overhead of re-entering it, and cuts a fragment
//! whenever the next token no longer fits the budget. Cut fragments are made
//! self-contained by synthesizing a header (tags to reopen) and a footer
//! (tags to close); the literal body text is never rewritten.

#[cfg(test)]
mod tests;

use std::iter::FusedIterator;

use crate::error::{Error, ParseError, SplitError};
use crate::token::{Bracket, Chunk, TagSet, Token};
use crate::tokenizer;

/// Split `source` into fragments of at most `max_len` characters, using the
/// default breakable-tag whitelist.
///
/// Fragments are produced lazily and in source order. The first failure ends
/// the sequence; earlier fragments stand.
pub fn split_message(source: &str, max_len: usize) -> Fragments {
    split_message_with(source, max_len, &TagSet::default())
}

/// Like [`split_message`], with a caller-supplied tag whitelist.
pub fn split_message_with(source: &str, max_len: usize, tags: &TagSet) -> Fragments {
    let chars: Vec<char> = source.chars().collect();
    let (tokens, failure) = match tokenizer::tokenize_chars(&chars, tags) {
        Ok(tokens) => (tokens, None),
        Err(err) => (Vec::new(), Some(err.into())),
    };
    Fragments {
        chars,
        tokens,
        max_len,
        state: PackerState::default(),
        phase: if failure.is_some() {
            Phase::Done
        } else {
            Phase::Packing
        },
        failure,
    }
}

/// Lazy sequence of self-contained fragments.
///
/// Yields `Ok(fragment)` in source order until the input is exhausted or a
/// terminal failure occurs; after yielding an `Err` the iterator is fused.
pub struct Fragments {
    chars: Vec<char>,
    tokens: Vec<Token>,
    max_len: usize,
    state: PackerState,
    phase: Phase,
    /// Tokenizer failure latched at construction, yielded on first pull
    failure: Option<Error>,
}

enum Phase {
    /// Consuming tokens
    Packing,
    /// Slicing the source left over after the last token
    Tail,
    Done,
}

/// Mutable packing state, owned by one `Fragments` for one pass.
#[derive(Default)]
struct PackerState {
    /// Stack of currently-open brackets
    open_brackets: Vec<Bracket>,
    /// Brackets opened before the cursor and closed again since the last
    /// flush; the next header must reopen them
    closed_brackets: Vec<Bracket>,
    /// Offset of the next unconsumed source character
    cursor: usize,
    token_index: usize,
    /// Closing-tag cost of the open stack (the next footer)
    len_close: usize,
    /// Opening-tag cost of the open stack alone, the irreducible overhead
    /// of the hierarchy
    len_open: usize,
    /// The next header's cost: the closed-but-reopening brackets plus open
    /// brackets with `pos_start < cursor`, whose opening markup already went
    /// out with an earlier fragment
    len_open_before_pos: usize,
}

impl PackerState {
    fn update_lengths(&mut self) {
        self.len_close = self.open_brackets.iter().map(Bracket::close_len).sum();
        self.len_open = self.open_brackets.iter().map(Bracket::open_len).sum();
        self.len_open_before_pos = self.closed_brackets.iter().map(Bracket::open_len).sum::<usize>()
            + self
                .open_brackets
                .iter()
                .filter(|b| b.pos_start < self.cursor)
                .map(|b| b.open_len())
                .sum::<usize>();
    }
}

impl Iterator for Fragments {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.failure.take() {
            return Some(Err(err));
        }

        loop {
            match self.phase {
                Phase::Packing => {
                    if self.state.token_index >= self.tokens.len() {
                        if let Some(open) = self.state.open_brackets.first() {
                            let err = ParseError::UnclosedTag {
                                tag: open.tag.clone(),
                                pos: open.pos_start,
                            };
                            self.phase = Phase::Done;
                            return Some(Err(err.into()));
                        }
                        self.phase = Phase::Tail;
                        continue;
                    }
                    self.state.update_lengths();
                    match self.step() {
                        Ok(Some(fragment)) => return Some(Ok(fragment)),
                        Ok(None) => continue,
                        Err(err) => {
                            self.phase = Phase::Done;
                            return Some(Err(err));
                        }
                    }
                }
                Phase::Tail => {
                    if self.state.cursor >= self.chars.len() {
                        self.phase = Phase::Done;
                        return None;
                    }
                    match self.flush(self.chars.len()) {
                        Ok(fragment) => {
                            // A slice of bare whitespace carries no content.
                            if fragment
                                .trim_matches(|c: char| c == ' ' || c == '\n')
                                .is_empty()
                            {
                                continue;
                            }
                            return Some(Ok(fragment));
                        }
                        Err(err) => {
                            self.phase = Phase::Done;
                            return Some(Err(err));
                        }
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

impl FusedIterator for Fragments {}

impl Fragments {
    /// Decide the current token: accept it into the running fragment
    /// (`Ok(None)`), cut a fragment before it (`Ok(Some)`), or fail.
    fn step(&mut self) -> Result<Option<String>, Error> {
        let token = self.tokens[self.state.token_index].clone();

        // No split can help a token that is too long by itself.
        if let Some(len) = token.char_len() {
            if len > self.max_len {
                let pos = token.pos_start();
                return Err(SplitError::UnsplittableBlock {
                    pos,
                    len,
                    max_len: self.max_len,
                    snippet: self.chars[pos..pos + len].iter().collect(),
                }
                .into());
            }
        }

        match token {
            Token::Bracket(br) if br.is_start => self.open_bracket(br),
            Token::Bracket(br) => self.close_bracket(br),
            Token::Chunk(chunk) => self.opaque_chunk(chunk),
        }
    }

    fn open_bracket(&mut self, br: Bracket) -> Result<Option<String>, Error> {
        let st = &self.state;
        let full =
            br.paired_len() + st.len_open_before_pos + st.len_close + (br.pos_start - st.cursor);
        if full > self.max_len {
            let pure = br.paired_len() + st.len_close + st.len_open;
            if pure > self.max_len {
                return Err(SplitError::HierarchyOverflow {
                    required: pure,
                    max_len: self.max_len,
                }
                .into());
            }
            return self.flush(br.pos_start).map(Some);
        }

        self.state.open_brackets.push(br);
        self.state.token_index += 1;
        Ok(None)
    }

    fn close_bracket(&mut self, br: Bracket) -> Result<Option<String>, Error> {
        let st = &self.state;
        if st.open_brackets.last().map(|b| b.tag.as_str()) != Some(br.tag.as_str()) {
            return Err(ParseError::UnpairedTag {
                tag: br.tag,
                pos: br.pos_start,
            }
            .into());
        }

        let full = st.len_open_before_pos + st.len_close + (br.pos_start - st.cursor);
        if full > self.max_len {
            return self.flush(br.pos_start).map(Some);
        }

        let st = &mut self.state;
        if let Some(opened) = st.open_brackets.pop() {
            // Opened before the last cut: its literal opening markup went
            // out with an earlier fragment, so the next header reopens it.
            if opened.pos_start < st.cursor {
                st.closed_brackets.push(opened);
            }
        }
        st.token_index += 1;
        Ok(None)
    }

    fn opaque_chunk(&mut self, chunk: Chunk) -> Result<Option<String>, Error> {
        let Some(pos_end) = chunk.pos_end else {
            // Unterminated trailing element; the tail pass emits its text
            // verbatim.
            self.state.token_index += 1;
            return Ok(None);
        };

        let st = &self.state;
        let full = (pos_end - st.cursor) + st.len_close + st.len_open_before_pos;
        if full > self.max_len {
            let pure = (pos_end - chunk.pos_start) + st.len_open + st.len_close;
            if pure > self.max_len {
                return Err(SplitError::OversizedElement {
                    pos: chunk.pos_start,
                    required: pure,
                    max_len: self.max_len,
                }
                .into());
            }
            return self.flush(chunk.pos_start).map(Some);
        }

        self.state.token_index += 1;
        Ok(None)
    }

    /// Cut the running fragment at `boundary` (or earlier if the scaffolding
    /// leaves less room), emit it with its header and footer, and advance
    /// the cursor.
    fn flush(&mut self, boundary: usize) -> Result<String, Error> {
        let st = &self.state;
        let cursor = st.cursor;

        let mut reopen: Vec<&Bracket> = st
            .closed_brackets
            .iter()
            .chain(st.open_brackets.iter().filter(|b| b.pos_start < cursor))
            .collect();
        reopen.sort_by_key(|b| b.pos_start);
        let header: String = reopen.iter().map(|b| b.open_tag()).collect();
        let footer: String = st.open_brackets.iter().rev().map(|b| b.close_tag()).collect();

        // Tag markup is ASCII, so byte length equals character length here.
        let end = match self.max_len.checked_sub(header.len() + footer.len()) {
            Some(budget) => boundary.min(cursor + budget),
            None => cursor,
        };
        if end <= cursor {
            return Err(SplitError::BudgetExhausted {
                pos: cursor,
                max_len: self.max_len,
            }
            .into());
        }

        let body: String = self.chars[cursor..end].iter().collect();

        let st = &mut self.state;
        st.closed_brackets.clear();
        st.cursor = end;
        Ok(format!("{header}{body}{footer}"))
    }
}

use super::*;
use crate::DEFAULT_MAX_LEN;

fn collect_fragments(source: &str, max_len: usize) -> Vec<String> {
    split_message(source, max_len)
        .collect::<Result<Vec<_>, _>>()
        .expect("split failed")
}

fn first_error(source: &str, max_len: usize) -> Error {
    split_message(source, max_len)
        .find_map(Result::err)
        .expect("expected a failure")
}

/// Every whitelisted open tag in the fragment has its close in the same
/// fragment, properly nested.
fn is_balanced(fragment: &str) -> bool {
    let Ok(tokens) = tokenizer::tokenize(fragment, &TagSet::default()) else {
        return false;
    };
    let mut stack: Vec<&str> = Vec::new();
    for token in &tokens {
        if let Token::Bracket(b) = token {
            if b.is_start {
                stack.push(&b.tag);
            } else if stack.pop() != Some(b.tag.as_str()) {
                return false;
            }
        }
    }
    stack.is_empty()
}

/// The fragment's literal content with every `<...>` span removed.
fn visible_text(s: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[test]
fn test_single_fragment_when_it_fits() {
    let source = "<p>Hello</p><b>World</b>";
    assert_eq!(
        collect_fragments(source, source.len()),
        vec![source.to_string()]
    );
}

#[test]
fn test_splits_paragraph_re_closing_each_fragment() {
    assert_eq!(
        collect_fragments("<p>123</p>", 8),
        vec!["<p>1</p>", "<p>2</p>", "<p>3</p>"]
    );
}

#[test]
fn test_reopens_nested_hierarchy_across_fragments() {
    let source = "<p>123<span><b>Name:</b> <i>John</i></span> Lorem</p>";
    assert_eq!(
        collect_fragments(source, 32),
        vec![
            "<p>123<span><b>Na</b></span></p>",
            "<p><span><b>me:</b> </span></p>",
            "<p><span><i>John</i></span> </p>",
            "<p>Lorem</p>",
        ]
    );
}

#[test]
fn test_text_before_first_tag() {
    assert_eq!(
        collect_fragments("TEXT<p>123</p>", 8),
        vec!["TEXT", "<p>1</p>", "<p>2</p>", "<p>3</p>"]
    );
}

#[test]
fn test_text_after_last_tag() {
    assert_eq!(
        collect_fragments("<p>123</p>TEXT", 8),
        vec!["<p>1</p>", "<p>2</p>", "<p>3</p>", "TEXT"]
    );
}

#[test]
fn test_plain_text_sliced_by_budget() {
    assert_eq!(
        collect_fragments("Text1Text2", 3),
        vec!["Tex", "t1T", "ext", "2"]
    );
}

#[test]
fn test_empty_source_yields_nothing() {
    assert!(collect_fragments("", 8).is_empty());
}

#[test]
fn test_whitespace_only_tail_suppressed() {
    assert_eq!(collect_fragments("TEXT    ", 4), vec!["TEXT"]);
}

#[test]
fn test_unclosed_tag_fails() {
    assert_eq!(
        first_error("<p>Unpaired tag", DEFAULT_MAX_LEN),
        Error::Parse(ParseError::UnclosedTag {
            tag: "p".to_string(),
            pos: 0,
        })
    );
}

#[test]
fn test_mismatched_close_fails() {
    assert_eq!(
        first_error("<p><b>x</p>", DEFAULT_MAX_LEN),
        Error::Parse(ParseError::UnpairedTag {
            tag: "p".to_string(),
            pos: 7,
        })
    );
}

#[test]
fn test_close_without_open_fails() {
    assert_eq!(
        first_error("</p>", DEFAULT_MAX_LEN),
        Error::Parse(ParseError::UnpairedTag {
            tag: "p".to_string(),
            pos: 0,
        })
    );
}

#[test]
fn test_oversized_opaque_element_fails() {
    assert_eq!(
        first_error("<article>123</article>", 8),
        Error::Split(SplitError::UnsplittableBlock {
            pos: 0,
            len: 22,
            max_len: 8,
            snippet: "<article>123</article>".to_string(),
        })
    );
}

#[test]
fn test_oversized_tag_markup_fails() {
    // The literal `<strong>` alone is longer than the budget.
    assert_eq!(
        first_error("<strong>123</strong>", 5),
        Error::Split(SplitError::UnsplittableBlock {
            pos: 0,
            len: 8,
            max_len: 5,
            snippet: "<strong>".to_string(),
        })
    );
}

#[test]
fn test_deep_hierarchy_fails() {
    assert_eq!(
        first_error("<p><b> Text <i>123</i></b></p>", 8),
        Error::Split(SplitError::HierarchyOverflow {
            required: 16,
            max_len: 8,
        })
    );
}

#[test]
fn test_opaque_element_with_enclosing_tags_fails() {
    // The element fits alone, but never together with its enclosing pair.
    assert_eq!(
        first_error("<p><code>123456</code></p>", 20),
        Error::Split(SplitError::OversizedElement {
            pos: 3,
            required: 26,
            max_len: 20,
        })
    );
}

#[test]
fn test_opaque_element_moved_whole_to_next_fragment() {
    assert_eq!(
        collect_fragments("<p>12345<code>xy</code></p>", 22),
        vec!["<p>12345</p>", "<p><code>xy</code></p>"]
    );
}

#[test]
fn test_scaffolding_consuming_whole_budget_fails() {
    // The first cut still fits (all scaffolding, no room for content); the
    // retry cannot advance and reports the exhausted budget.
    let mut fragments = split_message("<strong>12345678</strong>", 17);
    assert_eq!(fragments.next(), Some(Ok("<strong></strong>".to_string())));
    assert_eq!(
        fragments.next(),
        Some(Err(Error::Split(SplitError::BudgetExhausted {
            pos: 8,
            max_len: 17,
        })))
    );
    assert_eq!(fragments.next(), None);
}

#[test]
fn test_sequence_is_fused_after_error() {
    let mut fragments = split_message("<p>Unpaired", 8);
    assert!(matches!(fragments.next(), Some(Err(Error::Parse(_)))));
    assert!(fragments.next().is_none());
}

#[test]
fn test_custom_tag_set_makes_tag_breakable() {
    let tags = TagSet::new(["em"]);
    let fragments: Vec<String> = split_message_with("<em>1234</em>", 10, &tags)
        .collect::<Result<_, _>>()
        .expect("split failed");
    assert_eq!(
        fragments,
        vec!["<em>1</em>", "<em>2</em>", "<em>3</em>", "<em>4</em>"]
    );

    // Under the default set the same element is opaque and too large.
    assert!(matches!(
        first_error("<em>1234</em>", 10),
        Error::Split(SplitError::UnsplittableBlock { .. })
    ));
}

#[test]
fn test_non_ascii_content_counts_characters() {
    // 4 characters of content, multi-byte in UTF-8.
    assert_eq!(
        collect_fragments("<p>éé😀😀</p>", 8),
        vec!["<p>é</p>", "<p>é</p>", "<p>😀</p>", "<p>😀</p>"]
    );
}

#[test]
fn test_fragments_are_stable_under_resplit() {
    let source = "<p>123<span><b>Name:</b> <i>John</i></span> Lorem</p>";
    for fragment in collect_fragments(source, 32) {
        assert_eq!(collect_fragments(&fragment, 32), vec![fragment.clone()]);
    }
}

mod props {
    use super::*;
    use proptest::prelude::*;

    fn tag_name() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["p", "b", "i", "span", "div"])
    }

    /// Well-formed markup over the default whitelist: nested elements with
    /// short text runs, no attributes, no opaque elements.
    fn markup() -> impl Strategy<Value = String> {
        "[a-z ]{0,12}".prop_recursive(3, 32, 4, |inner| {
            (tag_name(), prop::collection::vec(inner, 0..4)).prop_map(|(tag, children)| {
                format!("<{tag}>{}</{tag}>", children.concat())
            })
        })
    }

    proptest! {
        #[test]
        fn prop_fragments_fit_balance_and_preserve_text(
            source in markup(),
            max_len in 40usize..120,
        ) {
            let mut fragments = Vec::new();
            for item in split_message(&source, max_len) {
                match item {
                    Ok(fragment) => fragments.push(fragment),
                    // Budget legitimately too tight for this nesting shape.
                    Err(Error::Split(_)) => return Ok(()),
                    Err(Error::Parse(err)) => {
                        prop_assert!(false, "parse error on well-formed input: {}", err)
                    }
                }
            }

            for fragment in &fragments {
                prop_assert!(
                    fragment.chars().count() <= max_len,
                    "fragment over budget: {:?}",
                    fragment
                );
                prop_assert!(is_balanced(fragment), "unbalanced fragment: {:?}", fragment);
            }

            let rebuilt: String = fragments.iter().map(|f| visible_text(f)).collect();
            let source_visible = visible_text(&source);
            prop_assert_eq!(
                rebuilt.trim_end_matches(' '),
                source_visible.trim_end_matches(' ')
            );
        }

        #[test]
        fn prop_fitting_input_passes_through(source in markup()) {
            let max_len = source.chars().count().max(1);
            let fragments = split_message(&source, max_len)
                .collect::<Result<Vec<_>, _>>()
                .expect("split failed on fitting input");

            if source.trim_matches(|c: char| c == ' ' || c == '\n').is_empty() {
                prop_assert!(fragments.is_empty());
            } else {
                prop_assert_eq!(fragments, vec![source]);
            }
        }
    }
}

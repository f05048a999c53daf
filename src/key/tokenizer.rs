//! The key tokenizer itself (§4.2, §4.6).
//!
//! The scanner is a two-mode state machine exactly as §4.6 describes:
//! OUTSIDE-BRACKET while reading the parent name, INSIDE-BRACKET while
//! reading one `[...]` span, with `[`/`]` driving the transitions.
//! Bracket content may not itself contain `[` or `]` — a span that
//! does is "unclosed" for our purposes, handled per `strictMode`.

use std::borrow::Cow;

use crate::error::QsError;
use crate::options::ParseOptions;

/// Private-use stand-in for a `%2E` that must decode to a literal `.`
/// without becoming eligible for dot-notation splitting (§4.2 step 1,
/// `decodeDotInKeys: false`, the default). Chosen from the Unicode
/// private-use area so it can't collide with anything a real key
/// contains; restored to `.` in `tokenize` once `rewrite_dots` has
/// already decided which dots to split on.
const DOT_GUARD: char = '\u{E000}';

/// One step in a key's path, consumed by the merger and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Name(String),
    Index(usize),
    Append,
}

/// §4.3 "Prototype-pollution guard": these names are rejected unless
/// `allowPrototypes` is set.
pub(crate) fn is_reserved_name(s: &str) -> bool {
    matches!(s, "__proto__" | "constructor" | "prototype")
}

/// Pre-empt the generic percent-decoder's blanket `%HH` handling for
/// `%2E`/`%2e` runs in a still-encoded key (§4.2 step 1): called
/// before `percent::decode` ever sees the raw key, so that by the
/// time `tokenize` runs, an encoded dot and a literal one are still
/// distinguishable where `decodeDotInKeys` needs them to be.
///
/// `decodeDotInKeys: true` wants an encoded dot to behave exactly like
/// a literal one for splitting purposes, so it's rewritten straight to
/// `.` here — indistinguishable from then on, which is the point.
/// `decodeDotInKeys: false` (the default) wants it to decode to a
/// literal `.` that stays inside its segment, so it's rewritten to
/// `DOT_GUARD` instead; `tokenize` restores it to `.` only after
/// `rewrite_dots` has already run.
pub(crate) fn guard_percent_2e<'a>(raw: &'a str, opts: &ParseOptions) -> Cow<'a, str> {
    if !raw.contains("%2E") && !raw.contains("%2e") {
        return Cow::Borrowed(raw);
    }
    let replacement = if opts.decode_dot_in_keys { "." } else { "\u{E000}" };
    Cow::Owned(raw.replace("%2E", replacement).replace("%2e", replacement))
}

/// A non-negative integer with no leading-zero oddity: `"0"` is
/// canonical, `"00"`/`"01"` are not (§4.2 step 3, §8 boundary case).
fn canonical_index(s: &str) -> Option<usize> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse::<usize>().ok()
}

/// Rewrite top-level dots into bracket form: `a.b.c` -> `a[b][c]`. A
/// dot already inside `[...]` is left untouched (§4.2 step 1).
fn rewrite_dots(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    let mut depth = 0i32;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => {
                depth += 1;
                out.push('[');
                i += 1;
            }
            ']' => {
                depth -= 1;
                out.push(']');
                i += 1;
            }
            '.' if depth == 0 => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                    i += 1;
                }
                out.push('[');
                out.extend(chars[start..i].iter());
                out.push(']');
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Find the next `[...]` span at the start of `rest`. Returns
/// `(inner, remainder)`, or `None` if `rest` doesn't start with `[`,
/// or the span is unclosed, or contains a nested `[`.
fn next_span(rest: &str) -> Option<(&str, &str)> {
    let bytes = rest.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b']' => return Some((&rest[1..i], &rest[i + 1..])),
            b'[' => return None,
            _ => i += 1,
        }
    }
    None
}

fn classify(inner: &str, opts: &ParseOptions) -> Segment {
    if inner.is_empty() {
        return Segment::Append;
    }
    if opts.parse_arrays {
        if let Some(n) = canonical_index(inner) {
            if n <= opts.array_limit {
                return Segment::Index(n);
            }
        }
    }
    Segment::Name(inner.to_string())
}

/// Tokenize a decoded key into its path segments (§4.2).
///
/// `decodeDotInKeys` implies `allowDots` (§6.1) for whether dots split
/// at all; which dots are *eligible* to split is decided earlier, by
/// `guard_percent_2e`, before the key was even percent-decoded — an
/// encoded dot that shouldn't split arrives here as `DOT_GUARD`, not
/// `.`, so `rewrite_dots` naturally leaves it alone. It's restored to
/// a literal `.` immediately after, once that decision is locked in.
pub(crate) fn tokenize(key: &str, opts: &ParseOptions) -> Result<Vec<Segment>, QsError> {
    let rewritten = if opts.effective_allow_dots() {
        rewrite_dots(key)
    } else {
        key.to_string()
    };
    let rewritten = if rewritten.contains(DOT_GUARD) {
        rewritten.replace(DOT_GUARD, ".")
    } else {
        rewritten
    };

    let bracket_pos = rewritten.find('[');
    let (parent, mut rest): (&str, &str) = match bracket_pos {
        Some(p) => (&rewritten[..p], &rewritten[p..]),
        None => (&rewritten[..], ""),
    };

    let mut segments = vec![Segment::Name(parent.to_string())];
    let mut count = 0usize;

    while !rest.is_empty() && count < opts.depth {
        match next_span(rest) {
            Some((inner, remainder)) => {
                segments.push(classify(inner, opts));
                rest = remainder;
                count += 1;
            }
            None => {
                if opts.strict_mode {
                    return Err(QsError::UnclosedBracket);
                }
                segments.push(Segment::Name(rest.to_string()));
                rest = "";
            }
        }
    }

    if !rest.is_empty() {
        if opts.strict_depth {
            return Err(QsError::DepthExceeded);
        }
        segments.push(Segment::Name(rest.to_string()));
    }

    Ok(segments)
}

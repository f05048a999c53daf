//! Top-level `parse` orchestration (§4.4).
//!
//! A single pass: strip prefix, split on the delimiter, detect the
//! charset sentinel, then per pair locate `=`, decode, expand commas,
//! tokenize the key, and merge into the accumulating draft. Finished
//! off by the `parseArrays: false` flattening pass and final
//! compaction (§4.4 steps 5-6).
//!
//! A thin orchestration layer: a public function that composes
//! validated sub-steps from the lower-level modules rather than
//! re-implementing any of their logic here.

use crate::codec::entities::interpret_numeric_entities;
use crate::codec::percent;
use crate::error::{QsError, Result};
use crate::key::tokenizer::tokenize;
use crate::merge::{self, Draft};
use crate::options::{Charset, ParseOptions, Side};
use crate::value::Value;

const UTF8_SENTINEL_VALUE: &str = "%E2%9C%93";
const ISO_SENTINEL_VALUE: &str = "%26%2310003%3B";

/// Parse a wire query string into a `Value` tree (§4.4).
///
/// Returns `Value::Map` on success. In lax mode (the default) this
/// function is infallible on any byte input (§7); errors only surface
/// from limit enforcement, `strictMode`/`strictDepth`, or a
/// user-supplied decoder.
pub fn parse(input: &str, opts: &ParseOptions) -> Result<Value> {
    let stripped = if opts.ignore_query_prefix {
        input.strip_prefix('?').unwrap_or(input)
    } else {
        input
    };

    if stripped.is_empty() {
        return Ok(Value::empty_map());
    }

    let mut parts: Vec<&str> = opts.delimiter.split(stripped);
    if parts.len() > opts.parameter_limit {
        if opts.throw_on_limit_exceeded {
            return Err(QsError::ParameterLimitExceeded);
        }
        parts.truncate(opts.parameter_limit);
    }

    let (charset, parts) = detect_charset_sentinel(&parts, opts);

    let mut root = Draft::empty_map();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        parse_pair(part, charset, opts, &mut root)?;
    }

    if !opts.parse_arrays {
        merge::seqs_to_maps(&mut root);
    }

    check_array_limit(&root, opts)?;

    Ok(merge::finalize(root, opts.allow_sparse))
}

/// §4.4 step 3: the charset sentinel, when enabled, is a reserved
/// leading pair whose *raw* (undecoded) value is one of two literal
/// forms. Consumed and stripped from the pair list when present;
/// otherwise the configured `opts.charset` stands.
fn detect_charset_sentinel<'a>(
    parts: &[&'a str],
    opts: &ParseOptions,
) -> (Charset, Vec<&'a str>) {
    if !opts.charset_sentinel {
        return (opts.charset, parts.to_vec());
    }
    if let Some(first) = parts.first() {
        if let Some((k, v)) = split_at_eq(first) {
            if k == "utf8" {
                if v == UTF8_SENTINEL_VALUE {
                    return (Charset::Utf8, parts[1..].to_vec());
                }
                if v == ISO_SENTINEL_VALUE {
                    return (Charset::Iso8859_1, parts[1..].to_vec());
                }
            }
        }
    }
    (opts.charset, parts.to_vec())
}

/// Locate the first `=` not inside brackets (§4.4 step 4a). Tracks
/// bracket depth across the pair directly — an `=` seen while depth is
/// above zero (e.g. inside `[b=c]`) is part of the key, not the
/// separator.
fn split_at_eq(pair: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    for (i, ch) in pair.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            '=' if depth <= 0 => return Some((&pair[..i], &pair[i + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_pair(pair: &str, charset: Charset, opts: &ParseOptions, root: &mut Draft) -> Result<()> {
    let (raw_key, raw_value) = match split_at_eq(pair) {
        Some((k, v)) => (k, Some(v)),
        None => (pair, None),
    };

    let key = decode_one(raw_key, charset, Side::Key, opts)?;

    let path = tokenize(&key, opts)?;
    if path.is_empty() {
        return Ok(());
    }

    // §4.3 "Empty-array form": `key[]=` with allowEmptyArrays yields an
    // empty Seq rather than Seq(Str("")). Detected by: the leaf segment
    // is Append, raw_value is empty, and the *entire* value segment
    // after decoding would otherwise be a lone empty string.
    if opts.allow_empty_arrays
        && raw_value == Some("")
        && matches!(path.last(), Some(crate::key::tokenizer::Segment::Append))
    {
        let parent = &path[..path.len() - 1];
        merge::merge(root, parent, Draft::Seq(Vec::new()), opts);
        return Ok(());
    }

    match raw_value {
        None => {
            let value = if opts.strict_null_handling {
                Draft::Null
            } else {
                Draft::Str(String::new())
            };
            merge::merge(root, &path, value, opts);
        }
        Some(raw) => {
            let decoded = decode_one(raw, charset, Side::Value, opts)?;
            let decoded = maybe_interpret_entities(decoded, charset, opts);
            if opts.comma && decoded.contains(',') {
                let seq = Draft::Seq(
                    decoded
                        .split(',')
                        .map(|s| Some(Draft::Str(s.to_string())))
                        .collect(),
                );
                merge::merge(root, &path, seq, opts);
            } else {
                merge::merge(root, &path, Draft::Str(decoded), opts);
            }
        }
    }
    Ok(())
}

fn maybe_interpret_entities(s: String, charset: Charset, opts: &ParseOptions) -> String {
    if opts.interpret_numeric_entities && charset == Charset::Iso8859_1 {
        interpret_numeric_entities(&s)
    } else {
        s
    }
}

fn decode_one(raw: &str, charset: Charset, side: Side, opts: &ParseOptions) -> Result<String> {
    // §4.2 step 1: on the key side, an encoded `%2E` must decode to a
    // literal '.' that does or doesn't participate in dot-notation
    // splitting depending on `decodeDotInKeys`, a distinction the
    // tokenizer can no longer make once the generic decoder has
    // collapsed both forms to the same character. Guard it first.
    let raw = if side == Side::Key {
        crate::key::tokenizer::guard_percent_2e(raw, opts)
    } else {
        std::borrow::Cow::Borrowed(raw)
    };
    if let Some(decoder) = &opts.decoder {
        return decoder(&raw, charset, side).map_err(QsError::DecodeError);
    }
    percent::decode(&raw, charset, opts.strict_mode)
}

/// §4.4 failure mode "ArrayLimitExceeded (when throwOnLimitExceeded +
/// duplicate-combine overflow)": a `combine` duplicate can grow a
/// `Seq` past `arrayLimit` without ever going through the tokenizer's
/// own index-vs-name check (that check only applies to bracket
/// indices, not to post-hoc combining). Enforced here, once, over the
/// whole tree, only when `throwOnLimitExceeded` is set.
fn check_array_limit(draft: &Draft, opts: &ParseOptions) -> Result<()> {
    if !opts.throw_on_limit_exceeded {
        return Ok(());
    }
    match draft {
        Draft::Seq(items) => {
            if items.len() > opts.array_limit + 1 {
                return Err(QsError::ArrayLimitExceeded);
            }
            for item in items.iter().flatten() {
                check_array_limit(item, opts)?;
            }
        }
        Draft::Map(entries) => {
            for (_, v) in entries {
                check_array_limit(v, opts)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Duplicates;

    fn p(s: &str) -> Value {
        parse(s, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn empty_string_is_empty_map() {
        assert_eq!(p(""), Value::empty_map());
    }

    #[test]
    fn question_mark_alone_with_ignore_prefix() {
        let opts = ParseOptions::default().with_ignore_query_prefix(true);
        assert_eq!(parse("?", &opts).unwrap(), Value::empty_map());
    }

    #[test]
    fn simple_nested_and_sibling() {
        let v = p("a[b]=c&d=e");
        assert_eq!(v.get("a").unwrap().get("b").unwrap(), &Value::Str("c".into()));
        assert_eq!(v.get("d").unwrap(), &Value::Str("e".into()));
    }

    #[test]
    fn parse_arrays_false_yields_string_keyed_map() {
        let opts = ParseOptions::default().with_parse_arrays(false);
        let v = parse("a[0]=b&a[1]=c", &opts).unwrap();
        assert_eq!(v.get("a").unwrap().get("0").unwrap(), &Value::Str("b".into()));
        assert_eq!(v.get("a").unwrap().get("1").unwrap(), &Value::Str("c".into()));
    }

    #[test]
    fn comma_splits_into_seq() {
        let opts = ParseOptions::default().with_comma(true);
        let v = parse("a=1,2,3", &opts).unwrap();
        assert_eq!(
            v.get("a").unwrap(),
            &Value::Seq(vec![
                Value::Str("1".into()),
                Value::Str("2".into()),
                Value::Str("3".into())
            ])
        );
    }

    #[test]
    fn strict_null_handling_bare_key_is_null() {
        let opts = ParseOptions::default().with_strict_null_handling(true);
        let v = parse("a&b=", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Null);
        assert_eq!(v.get("b").unwrap(), &Value::Str("".into()));
    }

    #[test]
    fn bare_key_without_strict_is_empty_string() {
        let v = p("a");
        assert_eq!(v.get("a").unwrap(), &Value::Str("".into()));
    }

    #[test]
    fn indices_and_append_equivalent_under_defaults() {
        assert_eq!(p("a[0]=x&a[1]=y"), p("a[]=x&a[]=y"));
    }

    #[test]
    fn array_limit_boundary_demotes_to_name() {
        let opts = ParseOptions::default().with_array_limit(20);
        let under = parse("a[20]=x", &opts).unwrap();
        assert!(matches!(under.get("a").unwrap(), Value::Seq(_)));
        let over = parse("a[21]=x", &opts).unwrap();
        assert!(matches!(over.get("a").unwrap(), Value::Map(_)));
    }

    #[test]
    fn strict_depth_errors_past_limit() {
        let opts = ParseOptions::default().with_depth(1).with_strict_depth(true);
        assert!(parse("a[b][c]=1", &opts).is_err());
    }

    #[test]
    fn ignore_query_prefix_strips_leading_question_mark() {
        let opts = ParseOptions::default().with_ignore_query_prefix(true);
        assert_eq!(parse("?a=1", &opts).unwrap(), p("a=1"));
    }

    #[test]
    fn parameter_limit_truncates_by_default() {
        let opts = ParseOptions::default().with_parameter_limit(2);
        let v = parse("a=1&b=2&c=3", &opts).unwrap();
        assert!(v.get("a").is_some());
        assert!(v.get("b").is_some());
        assert!(v.get("c").is_none());
    }

    #[test]
    fn parameter_limit_throws_when_configured() {
        let opts = ParseOptions::default()
            .with_parameter_limit(2)
            .with_throw_on_limit_exceeded(true);
        assert!(parse("a=1&b=2&c=3", &opts).is_err());
    }

    #[test]
    fn charset_sentinel_switches_to_iso8859_1() {
        let opts = ParseOptions::default().with_charset_sentinel(true);
        let v = parse("utf8=%26%2310003%3B&a=%E9", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Str("\u{e9}".into()));
    }

    #[test]
    fn charset_sentinel_keeps_utf8_on_checkmark() {
        let opts = ParseOptions::default().with_charset_sentinel(true);
        let v = parse("utf8=%E2%9C%93&a=b", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Str("b".into()));
    }

    #[test]
    fn allow_empty_arrays_yields_empty_seq() {
        let opts = ParseOptions::default().with_allow_empty_arrays(true);
        let v = parse("a[]=", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Seq(vec![]));
    }

    #[test]
    fn without_allow_empty_arrays_key_bracket_equals_is_string() {
        let v = p("a[]=");
        assert_eq!(v.get("a").unwrap(), &Value::Seq(vec![Value::Str("".into())]));
    }

    #[test]
    fn duplicates_last_overrides_combine_default() {
        let opts = ParseOptions::default().with_duplicates(Duplicates::Last);
        let v = parse("a=1&a=2", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Str("2".into()));
    }

    #[test]
    fn prototype_pollution_guarded_by_default() {
        let v = p("__proto__[x]=1");
        assert_eq!(v, Value::empty_map());
    }

    #[test]
    fn allow_sparse_preserves_hole_as_null() {
        let opts = ParseOptions::default().with_allow_sparse(true);
        let v = parse("a[1]=b", &opts).unwrap();
        assert_eq!(v.get("a").unwrap(), &Value::Seq(vec![Value::Null, Value::Str("b".into())]));
    }

    #[test]
    fn dense_default_compacts_hole() {
        let v = p("a[1]=b");
        assert_eq!(v.get("a").unwrap(), &Value::Seq(vec![Value::Str("b".into())]));
    }

    #[test]
    fn equals_sign_inside_brackets_is_not_the_pair_separator() {
        let v = p("a[b=c]=d");
        assert_eq!(v.get("a").unwrap().get("b=c").unwrap(), &Value::Str("d".into()));
    }

    #[test]
    fn decode_dot_in_keys_false_keeps_encoded_dot_from_splitting() {
        let opts = ParseOptions::default().with_allow_dots(true);
        let v = parse("a%2Eb.c=1", &opts).unwrap();
        // decodeDotInKeys defaults to false: the encoded dot decodes to
        // a literal '.' that stays inside its segment, only the real
        // dot between "b" and "c" splits.
        assert_eq!(v.get("a.b").unwrap().get("c").unwrap(), &Value::Str("1".into()));
    }

    #[test]
    fn decode_dot_in_keys_true_lets_encoded_dot_split_too() {
        let opts = ParseOptions::default().with_decode_dot_in_keys(true);
        let v = parse("a%2Eb.c=1", &opts).unwrap();
        assert_eq!(v.get("a").unwrap().get("b").unwrap().get("c").unwrap(), &Value::Str("1".into()));
    }
}

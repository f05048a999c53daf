//! The stringifier (§4.5): recursive walk from a `Value` tree to an
//! ordered list of `k=v` fragments.
//!
//! A recursive match-per-variant encoder threaded through with an
//! output accumulator, with a filter/select-then-walk shape for the
//! `filter` option: an allow-list reorders and selects root keys,
//! while a function filter is consulted at every prefix.

use crate::error::{QsError, Result};
use crate::options::{ArrayFormat, Charset, Filter, Side, StringifyOptions};
use crate::value::Value;

const UTF8_SENTINEL: &str = "utf8=%E2%9C%93";
const ISO_SENTINEL: &str = "utf8=%26%2310003%3B";

/// Stringify a `Value` tree into a wire query string (§4.5).
///
/// `value` must be a `Value::Map` — any other root shape is
/// `QsError::InvalidTarget` (§7).
pub fn stringify(value: &Value, opts: &StringifyOptions) -> Result<String> {
    if !matches!(value, Value::Map(_)) {
        return Err(QsError::InvalidTarget);
    }

    let mut out = Vec::new();
    if opts.charset_sentinel {
        let sentinel = match opts.charset {
            Charset::Utf8 => UTF8_SENTINEL,
            Charset::Iso8859_1 => ISO_SENTINEL,
        };
        out.push(sentinel.to_string());
    }

    walk("", value.clone(), opts, &mut out, true)?;

    let mut joined = out.join(&opts.delimiter);
    if opts.add_query_prefix {
        joined = format!("?{}", joined);
    }
    Ok(joined)
}

/// Apply the function-shaped `filter` at `prefix`, if configured. The
/// list-shaped filter is handled separately, only at the root, since
/// it is documented as selecting and ordering *top-level* keys. A
/// filter hook that errors short-circuits the whole `stringify` call
/// as `QsError::EncodeError` (§5, §7).
fn apply_func_filter(prefix: &str, value: &Value, opts: &StringifyOptions) -> Result<Option<Value>> {
    match &opts.filter {
        Some(Filter::Func(f)) => f(prefix, value).map_err(QsError::EncodeError),
        _ => Ok(Some(value.clone())),
    }
}

fn sort_entries(mut entries: Vec<(String, Value)>, opts: &StringifyOptions) -> Vec<(String, Value)> {
    if let Some(cmp) = &opts.sort {
        entries.sort_by(|(a, _), (b, _)| cmp(a, b));
    }
    entries
}

/// §4.5 "Filter": allow-list selects *and orders* top-level keys.
/// Keys absent from `value` are silently skipped.
fn select_and_order(entries: &[(String, Value)], keys: &[String]) -> Vec<(String, Value)> {
    keys.iter()
        .filter_map(|k| entries.iter().find(|(ek, _)| ek == k).cloned())
        .collect()
}

/// Walk one node of the tree, emitting fragments into `out`. `prefix`
/// is the already-bracketed/dotted key path built so far (empty at
/// the root). `is_root` gates the list-filter and the root-level
/// unbracketed-key rule, both of which only apply once.
fn walk(prefix: &str, value: Value, opts: &StringifyOptions, out: &mut Vec<String>, is_root: bool) -> Result<()> {
    let value = match apply_func_filter(prefix, &value, opts)? {
        Some(v) => v,
        None => return Ok(()),
    };

    match value {
        Value::Map(mut entries) => {
            if is_root {
                if let Some(Filter::List(keys)) = &opts.filter {
                    entries = select_and_order(&entries, keys);
                }
            }
            for (key, val) in sort_entries(entries, opts) {
                let child_prefix = child_map_prefix(prefix, &key, opts);
                walk(&child_prefix, val, opts, out, false)?;
            }
            Ok(())
        }
        Value::Seq(items) => stringify_seq(prefix, items, opts, out),
        Value::Null => emit_null(prefix, opts, out),
        Value::Str(s) => {
            emit_scalar(prefix, &s, opts, out)?;
            Ok(())
        }
    }
}

/// The child prefix for a `Map` entry (§4.5 "At a Map entry"): bracket
/// notation by default, dot notation when `allowDots` and the parent
/// prefix is non-empty, bare (unbracketed) at the root.
///
/// `encodeDotInKeys` rewrites a literal `.` inside the key *name*
/// itself to `%2E` first — ahead of, and independent from, `encode`,
/// so it survives `encode=false` (§4.5).
fn child_map_prefix(prefix: &str, key: &str, opts: &StringifyOptions) -> String {
    let key = if opts.encode_dot_in_keys {
        key.replace('.', "%2E")
    } else {
        key.to_string()
    };
    if prefix.is_empty() {
        key
    } else if opts.effective_allow_dots() {
        format!("{}.{}", prefix, key)
    } else {
        format!("{}[{}]", prefix, key)
    }
}

fn stringify_seq(prefix: &str, items: Vec<Value>, opts: &StringifyOptions, out: &mut Vec<String>) -> Result<()> {
    if items.is_empty() {
        if opts.allow_empty_arrays {
            let child_prefix = format!("{}[]", prefix);
            emit_scalar(&child_prefix, "", opts, out)?;
        }
        return Ok(());
    }

    match opts.array_format {
        ArrayFormat::Comma => {
            let joined: String = items
                .iter()
                .map(|v| match v {
                    Value::Str(s) => s.as_str(),
                    _ => "",
                })
                .collect::<Vec<_>>()
                .join(",");
            let child_prefix = if opts.comma_round_trip && items.len() == 1 {
                format!("{}[]", prefix)
            } else {
                prefix.to_string()
            };
            emit_scalar(&child_prefix, &joined, opts, out)
        }
        ArrayFormat::Indices => {
            let mut indexed: Vec<(usize, Value)> = items.into_iter().enumerate().collect();
            if opts.sort_array_indices {
                if let Some(cmp) = &opts.sort {
                    indexed.sort_by(|(a, _), (b, _)| cmp(&a.to_string(), &b.to_string()));
                }
            }
            for (i, item) in indexed {
                let child_prefix = format!("{}[{}]", prefix, i);
                walk(&child_prefix, item, opts, out, false)?;
            }
            Ok(())
        }
        ArrayFormat::Brackets => {
            for item in items {
                let child_prefix = format!("{}[]", prefix);
                walk(&child_prefix, item, opts, out, false)?;
            }
            Ok(())
        }
        ArrayFormat::Repeat => {
            for item in items {
                walk(prefix, item, opts, out, false)?;
            }
            Ok(())
        }
    }
}

fn emit_null(prefix: &str, opts: &StringifyOptions, out: &mut Vec<String>) -> Result<()> {
    if opts.skip_nulls {
        return Ok(());
    }
    let key = encode_key(prefix, opts)?;
    if opts.strict_null_handling {
        out.push(key);
    } else {
        out.push(format!("{}=", key));
    }
    Ok(())
}

fn emit_scalar(prefix: &str, value: &str, opts: &StringifyOptions, out: &mut Vec<String>) -> Result<()> {
    let key = encode_key(prefix, opts)?;
    let val = encode_value(value, opts)?;
    out.push(format!("{}={}", key, val));
    Ok(())
}

/// `encodeValuesOnly` keeps keys literal; plain `encode: false` keeps
/// both literal. Otherwise the full key path (brackets included) is
/// percent-encoded, matching the reference codec's default of
/// escaping `[`/`]` in emitted keys.
fn encode_key(key: &str, opts: &StringifyOptions) -> Result<String> {
    if !opts.encode || opts.encode_values_only {
        return Ok(key.to_string());
    }
    match &opts.encoder {
        Some(enc) => enc(key, opts.charset, Side::Key, opts.format).map_err(QsError::EncodeError),
        None => Ok(crate::codec::percent::encode(key, opts.charset, opts.format)),
    }
}

fn encode_value(value: &str, opts: &StringifyOptions) -> Result<String> {
    if !opts.encode {
        return Ok(value.to_string());
    }
    match &opts.encoder {
        Some(enc) => enc(value, opts.charset, Side::Value, opts.format).map_err(QsError::EncodeError),
        None => Ok(crate::codec::percent::encode(value, opts.charset, opts.format)),
    }
}

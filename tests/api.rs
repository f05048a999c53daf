//! Integration tests for the public `parse`/`stringify` API.
//!
//! These exercise the concrete scenarios and boundary cases from §8 of
//! the specification end-to-end, plus the universal properties it
//! names (round-trip, idempotence, limit/depth safety).

use std::sync::Arc;

use pretty_assertions::assert_eq;
use qstring_codec::{parse, stringify, ArrayFormat, Duplicates, Filter, ParseOptions, StringifyOptions, Value};

fn pv(input: &str, opts: &ParseOptions) -> Value {
    parse(input, opts).unwrap()
}

fn sv(value: &Value, opts: &StringifyOptions) -> String {
    stringify(value, opts).unwrap()
}

// ── §8 concrete scenarios ────────────────────────────────────

#[test]
fn scenario_1_nested_and_sibling() {
    let v = pv("a[b]=c&d=e", &ParseOptions::default());
    assert_eq!(v.get("a").unwrap().get("b").unwrap(), &Value::Str("c".into()));
    assert_eq!(v.get("d").unwrap(), &Value::Str("e".into()));
}

#[test]
fn scenario_2_parse_arrays_false() {
    let opts = ParseOptions::default().with_parse_arrays(false);
    let v = pv("a[0]=b&a[1]=c", &opts);
    assert_eq!(v.get("a").unwrap().get("0").unwrap(), &Value::Str("b".into()));
    assert_eq!(v.get("a").unwrap().get("1").unwrap(), &Value::Str("c".into()));
}

#[test]
fn scenario_3_comma_splits() {
    let opts = ParseOptions::default().with_comma(true);
    let v = pv("a=1,2,3", &opts);
    assert_eq!(
        v.get("a").unwrap(),
        &Value::Seq(vec![Value::Str("1".into()), Value::Str("2".into()), Value::Str("3".into())])
    );
}

#[test]
fn scenario_4_strict_null_handling() {
    let opts = ParseOptions::default().with_strict_null_handling(true);
    let v = pv("a&b=", &opts);
    assert_eq!(v.get("a").unwrap(), &Value::Null);
    assert_eq!(v.get("b").unwrap(), &Value::Str("".into()));
}

#[test]
fn scenario_5_indices_strict_null() {
    let value = Value::Map(vec![(
        "a".to_string(),
        Value::Seq(vec![Value::Null, Value::Str("x".into())]),
    )]);
    let opts = StringifyOptions::default()
        .with_array_format(ArrayFormat::Indices)
        .with_strict_null_handling(true)
        .with_encode(false);
    assert_eq!(sv(&value, &opts), "a[0]&a[1]=x");
}

#[test]
fn scenario_6_allow_dots_no_encode() {
    let value = Value::Map(vec![(
        "a".to_string(),
        Value::Map(vec![("b".to_string(), Value::Str("c".into()))]),
    )]);
    let opts = StringifyOptions::default().with_allow_dots(true).with_encode(false);
    assert_eq!(sv(&value, &opts), "a.b=c");
}

// ── §8 boundary cases ────────────────────────────────────────

#[test]
fn boundary_empty_string_is_empty_map() {
    assert_eq!(pv("", &ParseOptions::default()), Value::empty_map());
}

#[test]
fn boundary_question_mark_with_prefix_option() {
    let opts = ParseOptions::default().with_ignore_query_prefix(true);
    assert_eq!(pv("?", &opts), Value::empty_map());
}

#[test]
fn boundary_array_limit_exact_vs_overflow() {
    let opts = ParseOptions::default().with_array_limit(20);
    assert!(matches!(pv("a[20]=x", &opts).get("a").unwrap(), Value::Seq(_)));
    assert!(matches!(pv("a[21]=x", &opts).get("a").unwrap(), Value::Map(_)));
}

#[test]
fn boundary_strict_depth_exceeded() {
    let opts = ParseOptions::default().with_depth(1).with_strict_depth(true);
    assert!(parse("a[b][c]=1", &opts).is_err());
}

// ── §8 universal properties ──────────────────────────────────

#[test]
fn property_round_trip_dense() {
    let value = Value::Map(vec![
        ("a".to_string(), Value::Str("1".to_string())),
        (
            "b".to_string(),
            Value::Map(vec![("c".to_string(), Value::Str("2".to_string()))]),
        ),
        (
            "d".to_string(),
            Value::Seq(vec![Value::Str("x".to_string()), Value::Str("y".to_string())]),
        ),
    ]);
    let wire = sv(&value, &StringifyOptions::default());
    let back = pv(&wire, &ParseOptions::default());
    assert_eq!(back, value);
}

#[test]
fn property_idempotence() {
    let value = Value::Map(vec![(
        "a".to_string(),
        Value::Seq(vec![Value::Str("1".to_string()), Value::Str("2".to_string())]),
    )]);
    let opts = StringifyOptions::default();
    let once = sv(&value, &opts);
    let tree = pv(&once, &ParseOptions::default());
    let twice = sv(&tree, &opts);
    assert_eq!(once, twice);
}

#[test]
fn property_parameter_limit_is_honored() {
    let opts = ParseOptions::default().with_parameter_limit(3);
    let v = parse("a=1&b=2&c=3&d=4&e=5", &opts).unwrap();
    let count = match v {
        Value::Map(entries) => entries.len(),
        _ => 0,
    };
    assert!(count <= 3);
}

#[test]
fn property_array_index_vs_append_equivalent() {
    assert_eq!(
        pv("a[0]=x&a[1]=y", &ParseOptions::default()),
        pv("a[]=x&a[]=y", &ParseOptions::default())
    );
}

// ── Option interplay ──────────────────────────────────────────

#[test]
fn charset_sentinel_round_trips_iso8859_1() {
    let value = Value::Map(vec![("a".to_string(), Value::Str("\u{e9}".to_string()))]);
    let stringify_opts = StringifyOptions::default()
        .with_charset(qstring_codec::Charset::Iso8859_1)
        .with_charset_sentinel(true);
    let wire = sv(&value, &stringify_opts);

    let parse_opts = ParseOptions::default().with_charset_sentinel(true);
    let back = pv(&wire, &parse_opts);
    assert_eq!(back, value);
}

#[test]
fn duplicates_first_vs_last_vs_combine() {
    let combine = pv("a=1&a=2", &ParseOptions::default());
    assert_eq!(
        combine.get("a").unwrap(),
        &Value::Seq(vec![Value::Str("1".into()), Value::Str("2".into())])
    );

    let first = pv("a=1&a=2", &ParseOptions::default().with_duplicates(Duplicates::First));
    assert_eq!(first.get("a").unwrap(), &Value::Str("1".into()));

    let last = pv("a=1&a=2", &ParseOptions::default().with_duplicates(Duplicates::Last));
    assert_eq!(last.get("a").unwrap(), &Value::Str("2".into()));
}

#[test]
fn prototype_pollution_guard_drops_param() {
    let v = pv("__proto__[polluted]=1&safe=2", &ParseOptions::default());
    assert!(v.get("__proto__").is_none());
    assert_eq!(v.get("safe").unwrap(), &Value::Str("2".into()));
}

#[test]
fn allow_prototypes_permits_reserved_name() {
    let opts = ParseOptions::default().with_allow_prototypes(true);
    let v = pv("constructor[x]=1", &opts);
    assert!(v.get("constructor").is_some());
}

#[test]
fn filter_function_hook_transforms_and_omits() {
    let value = Value::Map(vec![
        ("a".to_string(), Value::Str("1".to_string())),
        ("secret".to_string(), Value::Str("shh".to_string())),
    ]);
    let filter: qstring_codec::FilterFn = Arc::new(|prefix, value| {
        if prefix == "secret" {
            Ok(None)
        } else {
            Ok(Some(value.clone()))
        }
    });
    let opts = StringifyOptions::default()
        .with_filter(Filter::Func(filter))
        .with_encode(false);
    assert_eq!(sv(&value, &opts), "a=1");
}

#[test]
fn sort_hook_orders_map_keys() {
    let value = Value::Map(vec![
        ("b".to_string(), Value::Str("2".to_string())),
        ("a".to_string(), Value::Str("1".to_string())),
    ]);
    let cmp: qstring_codec::SortFn = Arc::new(|a, b| a.cmp(b));
    let opts = StringifyOptions::default().with_sort(cmp).with_encode(false);
    assert_eq!(sv(&value, &opts), "a=1&b=2");
}

#[test]
fn invalid_target_errors_on_non_map_root() {
    let err = stringify(&Value::Str("x".into()), &StringifyOptions::default()).unwrap_err();
    assert!(matches!(err, qstring_codec::QsError::InvalidTarget));
}

#[test]
fn decoder_hook_errors_propagate() {
    let decoder: qstring_codec::Decoder = Arc::new(|_, _, _| Err("boom".into()));
    let opts = ParseOptions::default().with_decoder(decoder);
    let err = parse("a=1", &opts).unwrap_err();
    assert!(matches!(err, qstring_codec::QsError::DecodeError(_)));
}

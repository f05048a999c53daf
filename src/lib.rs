//! # qstring_codec — a `qs`-compatible query-string codec
//!
//! Converts between a flat `key=value&…` wire string and a tree of
//! heterogeneous values (scalars, ordered sequences, string-keyed
//! maps), and back, with bit-level compatibility with the
//! widely-deployed JavaScript `qs` codec: every parse rule, every
//! stringify rule, every option, every edge case.
//!
//! ```
//! use qstring_codec::{parse, stringify, ParseOptions, StringifyOptions};
//!
//! let tree = parse("a[b]=c&d=e", &ParseOptions::default()).unwrap();
//! assert_eq!(tree.get("a").unwrap().get("b").unwrap().to_string(), "\"c\"");
//!
//! let wire = stringify(&tree, &StringifyOptions::default().with_encode(false)).unwrap();
//! assert_eq!(wire, "a[b]=c&d=e");
//! ```
//!
//! The crate is purely functional: `parse` and `stringify` share no
//! mutable state and are safe to call concurrently on distinct inputs
//! from any number of threads (§5). Reflective struct↔tree binding,
//! the CLI, and HTTP integration are explicitly out of scope (§1) —
//! this crate's only contract is the `Value` tree and the two
//! functions below.

pub mod codec;
pub mod error;
pub mod key;
pub mod merge;
pub mod options;
pub mod parse;
pub mod stringify;
pub mod value;

pub use error::{QsError, Result};
pub use options::{
    ArrayFormat, Charset, Decoder, Delimiter, Duplicates, Encoder, Filter, FilterFn, Format,
    HookError, ParseOptions, Side, SortFn, StringifyOptions,
};
pub use value::Value;

/// Parse a wire query string into a `Value` tree (§4.4).
#[cfg_attr(feature = "trace", tracing::instrument(skip(opts), fields(len = input.len())))]
pub fn parse(input: &str, opts: &ParseOptions) -> Result<Value> {
    parse::parse(input, opts)
}

/// Stringify a `Value` tree into a wire query string (§4.5).
#[cfg_attr(feature = "trace", tracing::instrument(skip(value, opts)))]
pub fn stringify(value: &Value, opts: &StringifyOptions) -> Result<String> {
    stringify::stringify(value, opts)
}

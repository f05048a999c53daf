//! Immutable option records for `parse` and `stringify` (§6, §9).
//!
//! Both bundles are plain value objects built through a chained
//! `with_*` builder — the same one-method-per-option idiom the
//! `Config::with_max_depth` builder in the query-string deserializer
//! reference file uses — rather than mutable setters, so a built
//! `ParseOptions`/`StringifyOptions` is safely `Clone` and shareable
//! across threads (§9).

use std::cmp::Ordering;
use std::error::Error as StdError;
use std::sync::Arc;

use regex::Regex;

use crate::value::Value;

/// Character set used for percent-decoding/encoding (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Iso8859_1,
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Utf8
    }
}

/// Percent-encoding variant (§4.1, §6.2 `format`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Rfc3986,
    Rfc1738,
}

impl Default for Format {
    fn default() -> Self {
        Format::Rfc3986
    }
}

/// Policy for repeated assignment to the same key path (§4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Duplicates {
    Combine,
    First,
    Last,
}

impl Default for Duplicates {
    fn default() -> Self {
        Duplicates::Combine
    }
}

/// Array emission format for `stringify` (§4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayFormat {
    Indices,
    Brackets,
    Repeat,
    Comma,
}

impl Default for ArrayFormat {
    fn default() -> Self {
        ArrayFormat::Indices
    }
}

/// The `&`-or-regex delimiter used to split/join pairs.
#[derive(Clone)]
pub enum Delimiter {
    Literal(String),
    Pattern(Arc<Regex>),
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Literal("&".to_string())
    }
}

impl Delimiter {
    pub fn literal(s: impl Into<String>) -> Self {
        Delimiter::Literal(s.into())
    }

    pub fn pattern(re: Regex) -> Self {
        Delimiter::Pattern(Arc::new(re))
    }

    pub(crate) fn split<'a>(&self, input: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Literal(s) => input.split(s.as_str()).collect(),
            Delimiter::Pattern(re) => re.split(input).collect(),
        }
    }

    pub(crate) fn as_literal(&self) -> &str {
        match self {
            Delimiter::Literal(s) => s.as_str(),
            Delimiter::Pattern(_) => "&",
        }
    }
}

/// Which side of a `k=v` pair a decoder/encoder hook is being asked
/// about — the built-in decoder/encoder ignore this, but a
/// user-supplied hook may special-case keys vs. values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Key,
    Value,
}

pub type HookError = Box<dyn StdError + Send + Sync>;

/// `(raw, charset, side) -> decoded`.
pub type Decoder = Arc<dyn Fn(&str, Charset, Side) -> Result<String, HookError> + Send + Sync>;

/// `(raw, charset, side, format) -> encoded`.
pub type Encoder =
    Arc<dyn Fn(&str, Charset, Side, Format) -> Result<String, HookError> + Send + Sync>;

/// Comparator over sibling `Map` keys (and, with `sortArrayIndices`,
/// over `Seq` index strings too).
pub type SortFn = Arc<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// `(prefix, value) -> Ok(Some(replacement))` to keep a subtree
/// (possibly transformed), `Ok(None)` to drop it, or `Err` to fail the
/// whole `stringify` call (§4.5 "Filter", §7 `EncodeError`).
pub type FilterFn = Arc<dyn Fn(&str, &Value) -> Result<Option<Value>, HookError> + Send + Sync>;

/// The two shapes `filter` can take — an allow-list (which also fixes
/// emission order at the top level) or a transform function.
#[derive(Clone)]
pub enum Filter {
    List(Vec<String>),
    Func(FilterFn),
}

/// Options controlling `parse` (§6.1).
#[derive(Clone)]
pub struct ParseOptions {
    pub allow_dots: bool,
    pub decode_dot_in_keys: bool,
    pub allow_empty_arrays: bool,
    pub allow_sparse: bool,
    pub array_limit: usize,
    pub parse_arrays: bool,
    pub comma: bool,
    pub delimiter: Delimiter,
    pub depth: usize,
    pub strict_depth: bool,
    pub duplicates: Duplicates,
    pub ignore_query_prefix: bool,
    pub parameter_limit: usize,
    pub throw_on_limit_exceeded: bool,
    pub strict_null_handling: bool,
    pub charset: Charset,
    pub charset_sentinel: bool,
    pub interpret_numeric_entities: bool,
    pub allow_prototypes: bool,
    pub decoder: Option<Decoder>,
    pub strict_mode: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            allow_dots: false,
            decode_dot_in_keys: false,
            allow_empty_arrays: false,
            allow_sparse: false,
            array_limit: 20,
            parse_arrays: true,
            comma: false,
            delimiter: Delimiter::default(),
            depth: 5,
            strict_depth: false,
            duplicates: Duplicates::default(),
            ignore_query_prefix: false,
            parameter_limit: 1000,
            throw_on_limit_exceeded: false,
            strict_null_handling: false,
            charset: Charset::default(),
            charset_sentinel: false,
            interpret_numeric_entities: false,
            allow_prototypes: false,
            decoder: None,
            strict_mode: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `decodeDotInKeys` implies `allowDots` (§6.1).
    pub(crate) fn effective_allow_dots(&self) -> bool {
        self.allow_dots || self.decode_dot_in_keys
    }

    pub fn with_allow_dots(mut self, v: bool) -> Self {
        self.allow_dots = v;
        self
    }

    pub fn with_decode_dot_in_keys(mut self, v: bool) -> Self {
        self.decode_dot_in_keys = v;
        self
    }

    pub fn with_allow_empty_arrays(mut self, v: bool) -> Self {
        self.allow_empty_arrays = v;
        self
    }

    pub fn with_allow_sparse(mut self, v: bool) -> Self {
        self.allow_sparse = v;
        self
    }

    pub fn with_array_limit(mut self, v: usize) -> Self {
        self.array_limit = v;
        self
    }

    pub fn with_parse_arrays(mut self, v: bool) -> Self {
        self.parse_arrays = v;
        self
    }

    pub fn with_comma(mut self, v: bool) -> Self {
        self.comma = v;
        self
    }

    pub fn with_delimiter(mut self, v: Delimiter) -> Self {
        self.delimiter = v;
        self
    }

    pub fn with_depth(mut self, v: usize) -> Self {
        self.depth = v;
        self
    }

    pub fn with_strict_depth(mut self, v: bool) -> Self {
        self.strict_depth = v;
        self
    }

    pub fn with_duplicates(mut self, v: Duplicates) -> Self {
        self.duplicates = v;
        self
    }

    pub fn with_ignore_query_prefix(mut self, v: bool) -> Self {
        self.ignore_query_prefix = v;
        self
    }

    pub fn with_parameter_limit(mut self, v: usize) -> Self {
        self.parameter_limit = v;
        self
    }

    pub fn with_throw_on_limit_exceeded(mut self, v: bool) -> Self {
        self.throw_on_limit_exceeded = v;
        self
    }

    pub fn with_strict_null_handling(mut self, v: bool) -> Self {
        self.strict_null_handling = v;
        self
    }

    pub fn with_charset(mut self, v: Charset) -> Self {
        self.charset = v;
        self
    }

    pub fn with_charset_sentinel(mut self, v: bool) -> Self {
        self.charset_sentinel = v;
        self
    }

    pub fn with_interpret_numeric_entities(mut self, v: bool) -> Self {
        self.interpret_numeric_entities = v;
        self
    }

    pub fn with_allow_prototypes(mut self, v: bool) -> Self {
        self.allow_prototypes = v;
        self
    }

    pub fn with_decoder(mut self, f: Decoder) -> Self {
        self.decoder = Some(f);
        self
    }

    pub fn with_strict_mode(mut self, v: bool) -> Self {
        self.strict_mode = v;
        self
    }
}

/// Options controlling `stringify` (§6.2).
#[derive(Clone)]
pub struct StringifyOptions {
    pub add_query_prefix: bool,
    pub allow_dots: bool,
    pub encode_dot_in_keys: bool,
    pub allow_empty_arrays: bool,
    pub array_format: ArrayFormat,
    pub comma_round_trip: bool,
    pub encode: bool,
    pub encode_values_only: bool,
    pub charset: Charset,
    pub charset_sentinel: bool,
    pub format: Format,
    pub delimiter: String,
    pub skip_nulls: bool,
    pub strict_null_handling: bool,
    pub filter: Option<Filter>,
    pub sort: Option<SortFn>,
    pub sort_array_indices: bool,
    pub encoder: Option<Encoder>,
}

impl Default for StringifyOptions {
    fn default() -> Self {
        StringifyOptions {
            add_query_prefix: false,
            allow_dots: false,
            encode_dot_in_keys: false,
            allow_empty_arrays: false,
            array_format: ArrayFormat::default(),
            comma_round_trip: false,
            encode: true,
            encode_values_only: false,
            charset: Charset::default(),
            charset_sentinel: false,
            format: Format::default(),
            delimiter: "&".to_string(),
            skip_nulls: false,
            strict_null_handling: false,
            filter: None,
            sort: None,
            sort_array_indices: false,
            encoder: None,
        }
    }
}

impl StringifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `encodeDotInKeys` implies `allowDots`, mirroring the parse side.
    pub(crate) fn effective_allow_dots(&self) -> bool {
        self.allow_dots || self.encode_dot_in_keys
    }

    pub fn with_add_query_prefix(mut self, v: bool) -> Self {
        self.add_query_prefix = v;
        self
    }

    pub fn with_allow_dots(mut self, v: bool) -> Self {
        self.allow_dots = v;
        self
    }

    pub fn with_encode_dot_in_keys(mut self, v: bool) -> Self {
        self.encode_dot_in_keys = v;
        self
    }

    pub fn with_allow_empty_arrays(mut self, v: bool) -> Self {
        self.allow_empty_arrays = v;
        self
    }

    pub fn with_array_format(mut self, v: ArrayFormat) -> Self {
        self.array_format = v;
        self
    }

    pub fn with_comma_round_trip(mut self, v: bool) -> Self {
        self.comma_round_trip = v;
        self
    }

    pub fn with_encode(mut self, v: bool) -> Self {
        self.encode = v;
        self
    }

    pub fn with_encode_values_only(mut self, v: bool) -> Self {
        self.encode_values_only = v;
        self
    }

    pub fn with_charset(mut self, v: Charset) -> Self {
        self.charset = v;
        self
    }

    pub fn with_charset_sentinel(mut self, v: bool) -> Self {
        self.charset_sentinel = v;
        self
    }

    pub fn with_format(mut self, v: Format) -> Self {
        self.format = v;
        self
    }

    pub fn with_delimiter(mut self, v: impl Into<String>) -> Self {
        self.delimiter = v.into();
        self
    }

    pub fn with_skip_nulls(mut self, v: bool) -> Self {
        self.skip_nulls = v;
        self
    }

    pub fn with_strict_null_handling(mut self, v: bool) -> Self {
        self.strict_null_handling = v;
        self
    }

    pub fn with_filter(mut self, v: Filter) -> Self {
        self.filter = Some(v);
        self
    }

    pub fn with_sort(mut self, v: SortFn) -> Self {
        self.sort = Some(v);
        self
    }

    pub fn with_sort_array_indices(mut self, v: bool) -> Self {
        self.sort_array_indices = v;
        self
    }

    pub fn with_encoder(mut self, v: Encoder) -> Self {
        self.encoder = Some(v);
        self
    }
}

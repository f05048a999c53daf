//! The query-string codec's value tree (§3.1).
//!
//! `Value` owns its data — strings are `String`, containers hold owned
//! children.  Both the parser and the stringifier operate on `Value` by
//! reference or by consuming it; there is no pointer-graph inheritance,
//! just a flat tagged union.
//!
//! `Map` entries are stored as `Vec<(String, Value)>` rather than a
//! hashmap so that insertion order survives when no `sort` option is
//! configured (§4.5 "Sort").  Duplicate keys never reach a `Map` — the
//! merger (`merge.rs`) resolves them before a tree is ever built.

use std::fmt;

/// A value in the query-string tree (§3.1).
///
/// `Null` is distinct from "missing": a key with no matching entry in a
/// `Map` is simply absent, while a key mapped to `Value::Null` was
/// produced deliberately (bare key under `strictNullHandling`, or an
/// explicit-null sentinel collapsing at the API boundary).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence made explicit — see §3.1 and the `ExplicitNull` sentinel.
    Null,
    /// A Unicode scalar string.
    Str(String),
    /// An ordered sequence. Holes never survive into a public `Value` —
    /// they are removed (dense) or materialized as `Null` (sparse) by
    /// the compaction pass that produces this tree (§3.1 invariant c).
    Seq(Vec<Value>),
    /// A string-keyed, insertion-ordered mapping (§3.1 invariant b: never
    /// contains the key `""` promoted to an index).
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Construct an empty `Map`, the canonical parse result for `""`.
    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a key on a `Map`. Returns `None` for any other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Seq(items) => write!(f, "[{} items]", items.len()),
            Value::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}


//! The tree merger (§4.3): insert one decoded value at one path into
//! the accumulating root.
//!
//! Construction happens over `Draft`, a shadow of `Value` that can
//! represent a *hole* (an index never written) distinctly from an
//! explicit `Null` (a value the input actually assigned, e.g. a bare
//! key under `strictNullHandling`). §3.1's invariant (c) and §9's
//! "Sparse arrays" note both call for exactly this: build with holes,
//! then compact once at the end into the public `Value` tree, where
//! holes are dropped (dense) or materialized as `Null` (sparse) but a
//! real `Null` the input wrote is never mistaken for one.
//!
//! The rest of the shape — lazily committing a node to `Map` or `Seq`
//! on first write, with a dedicated promotion path when a later write
//! disagrees — mirrors the query-string deserializer reference file's
//! `insert_map_value` / `insert_ord_seq_value`.

use crate::key::tokenizer::{is_reserved_name, Segment};
use crate::options::{Duplicates, ParseOptions};
use crate::value::Value;

/// Construction-time shadow of `Value`. `Seq` slots are `Option<Draft>`
/// so a never-written index (`None`) is distinguishable from an index
/// explicitly assigned `Null`.
#[derive(Debug, Clone)]
pub(crate) enum Draft {
    Null,
    Str(String),
    Seq(Vec<Option<Draft>>),
    Map(Vec<(String, Draft)>),
}

impl Draft {
    pub(crate) fn empty_map() -> Self {
        Draft::Map(Vec::new())
    }
}

/// Insert `value` at `path` into `root`, honoring duplicate policy,
/// array/object promotion, sparse indices, and the prototype-pollution
/// guard (§4.3).
///
/// `root` must be a `Draft::Map`. A path whose leading segment names a
/// reserved key (`__proto__`, `constructor`, `prototype`) is dropped
/// silently unless `opts.allow_prototypes` is set — the whole
/// parameter disappears, matching reference behavior.
pub(crate) fn merge(root: &mut Draft, path: &[Segment], value: Draft, opts: &ParseOptions) {
    if !opts.allow_prototypes
        && path
            .iter()
            .any(|s| matches!(s, Segment::Name(n) if is_reserved_name(n)))
    {
        return;
    }
    if path.is_empty() {
        return;
    }
    insert(root, path, value, opts);
}

fn insert(node: &mut Draft, path: &[Segment], value: Draft, opts: &ParseOptions) {
    let (seg, rest) = (&path[0], &path[1..]);

    if rest.is_empty() {
        set_leaf(node, seg, value, opts);
        return;
    }

    let child = match seg {
        Segment::Name(name) => child_of_map(node, name),
        Segment::Index(n) => {
            if is_committed_map(node) {
                child_of_map(node, &n.to_string())
            } else {
                child_of_seq(node, *n)
            }
        }
        Segment::Append => {
            if is_committed_map(node) {
                let key = map_len(node).to_string();
                child_of_map(node, &key)
            } else {
                append_child(node)
            }
        }
    };
    insert(child, rest, value, opts);
}

fn set_leaf(node: &mut Draft, seg: &Segment, value: Draft, opts: &ParseOptions) {
    match seg {
        Segment::Name(name) => set_map_leaf(node, name, value, opts),
        Segment::Index(n) => {
            if is_committed_map(node) {
                set_map_leaf(node, &n.to_string(), value, opts)
            } else {
                set_seq_leaf(node, *n, value, opts)
            }
        }
        Segment::Append => {
            if is_committed_map(node) {
                let key = map_len(node).to_string();
                set_map_leaf(node, &key, value, opts)
            } else {
                push_seq_leaf(node, value)
            }
        }
    }
}

/// A node that has already committed to being a non-empty `Map` never
/// reverts to a `Seq` — a later `Index`/`Append` segment targeting it
/// (e.g. `a[b]=x` followed by `a[0]=y`) adds a stringified-index key
/// instead, matching the reference codec's observed behavior. An
/// empty `Map` is still an untyped placeholder (`child_of_map`'s
/// default) and is free to commit either way.
fn is_committed_map(node: &Draft) -> bool {
    matches!(node, Draft::Map(entries) if !entries.is_empty())
}

fn map_len(node: &Draft) -> usize {
    match node {
        Draft::Map(entries) => entries.len(),
        _ => 0,
    }
}

fn ensure_map(node: &mut Draft) -> &mut Vec<(String, Draft)> {
    if !matches!(node, Draft::Map(_)) {
        *node = demote_to_map(node);
    }
    match node {
        Draft::Map(entries) => entries,
        _ => unreachable!(),
    }
}

fn ensure_seq(node: &mut Draft) -> &mut Vec<Option<Draft>> {
    if !matches!(node, Draft::Seq(_)) {
        *node = Draft::Seq(Vec::new());
    }
    match node {
        Draft::Seq(items) => items,
        _ => unreachable!(),
    }
}

/// §4.3 "Array ↔ Map promotion": a `Seq` node indexed by a `Name` is
/// demoted to a `Map` whose numeric keys are stringified indices.
/// Holes demote to nothing (they were never assigned, so they
/// contribute no entry).
fn demote_to_map(node: &mut Draft) -> Draft {
    match std::mem::replace(node, Draft::Null) {
        Draft::Seq(items) => {
            let entries = items
                .into_iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.map(|v| (i.to_string(), v)))
                .collect();
            Draft::Map(entries)
        }
        Draft::Null => Draft::Map(Vec::new()),
        other => {
            let _ = other;
            Draft::Map(Vec::new())
        }
    }
}

fn child_of_map<'a>(node: &'a mut Draft, name: &str) -> &'a mut Draft {
    let entries = ensure_map(node);
    if let Some(pos) = entries.iter().position(|(k, _)| k == name) {
        &mut entries[pos].1
    } else {
        entries.push((name.to_string(), Draft::Map(Vec::new())));
        let last = entries.len() - 1;
        &mut entries[last].1
    }
}

fn child_of_seq(node: &mut Draft, index: usize) -> &mut Draft {
    let items = ensure_seq(node);
    if index >= items.len() {
        items.resize_with(index + 1, || None);
    }
    if items[index].is_none() {
        items[index] = Some(Draft::Map(Vec::new()));
    }
    items[index].as_mut().unwrap()
}

fn append_child(node: &mut Draft) -> &mut Draft {
    let items = ensure_seq(node);
    items.push(Some(Draft::Map(Vec::new())));
    let last = items.len() - 1;
    items[last].as_mut().unwrap()
}

fn apply_duplicate(existing: &mut Draft, value: Draft, opts: &ParseOptions) {
    match opts.duplicates {
        Duplicates::First => {}
        Duplicates::Last => *existing = value,
        Duplicates::Combine => {
            let prior = std::mem::replace(existing, Draft::Null);
            *existing = combine(prior, value);
        }
    }
}

/// §4.3 "combine promotes existing scalar to Seq and appends".
fn combine(prior: Draft, value: Draft) -> Draft {
    match prior {
        Draft::Seq(mut items) => {
            items.push(Some(value));
            Draft::Seq(items)
        }
        other => Draft::Seq(vec![Some(other), Some(value)]),
    }
}

fn set_map_leaf(node: &mut Draft, name: &str, value: Draft, opts: &ParseOptions) {
    let entries = ensure_map(node);
    if let Some(pos) = entries.iter().position(|(k, _)| k == name) {
        let existing = &mut entries[pos].1;
        apply_duplicate(existing, value, opts);
    } else {
        entries.push((name.to_string(), value));
    }
}

fn set_seq_leaf(node: &mut Draft, index: usize, value: Draft, opts: &ParseOptions) {
    let items = ensure_seq(node);
    if index >= items.len() {
        items.resize_with(index, || None);
        items.push(Some(value));
        return;
    }
    match items[index].take() {
        None => items[index] = Some(value),
        Some(mut existing) => {
            apply_duplicate(&mut existing, value, opts);
            items[index] = Some(existing);
        }
    }
}

fn push_seq_leaf(node: &mut Draft, value: Draft) {
    let items = ensure_seq(node);
    items.push(Some(value));
}

/// §4.4 step 5: retroactively convert every `Seq` in `draft` to a
/// `Map` with string indices, for `parseArrays: false`. Holes
/// contribute no entry (an unwritten index was never really "there").
pub(crate) fn seqs_to_maps(draft: &mut Draft) {
    match draft {
        Draft::Seq(items) => {
            let mut entries = Vec::with_capacity(items.len());
            for (i, slot) in items.drain(..).enumerate() {
                if let Some(mut v) = slot {
                    seqs_to_maps(&mut v);
                    entries.push((i.to_string(), v));
                }
            }
            *draft = Draft::Map(entries);
        }
        Draft::Map(entries) => {
            for (_, v) in entries.iter_mut() {
                seqs_to_maps(v);
            }
        }
        _ => {}
    }
}

/// Final compaction (§4.4 step 6, §3.1 invariant c): convert `Draft`
/// into the public `Value` tree, honoring `allowSparse` — holes are
/// dropped (dense) or materialized as `Value::Null` (sparse). An
/// explicit `Null` the input actually wrote is never touched by this
/// decision; only slots that were *never assigned* are holes.
pub(crate) fn finalize(draft: Draft, allow_sparse: bool) -> Value {
    match draft {
        Draft::Null => Value::Null,
        Draft::Str(s) => Value::Str(s),
        Draft::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, finalize(v, allow_sparse)))
                .collect(),
        ),
        Draft::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for slot in items {
                match slot {
                    Some(v) => out.push(finalize(v, allow_sparse)),
                    None if allow_sparse => out.push(Value::Null),
                    None => {}
                }
            }
            Value::Seq(out)
        }
    }
}

//! Page-local B-tree algorithms.
//!
//! Every function here works on one subtree, identified by its root page and
//! height, and reports structural changes of that root through an
//! [`Outcome`]. Pages are pinned only while they are decoded or written;
//! recursion never holds a pin across a child call.

use tracing::trace;

use crate::common::{Oid, PageId, Result};
use crate::storage::{MarkSet, Storage};

use super::key::{Entry, Key, KeyType};
use super::node::Node;
use super::outcome::Outcome;

pub use super::node::{item_count, locator, reference_at, str_key_oid, Locator, MAX_ITEMS};

/// Create a root page.
///
/// Without an old root the new root is a leaf holding `entry`. Otherwise it
/// is an internal node with `entry.key` as its only key, the page named by
/// `entry.oid` on its left and `old_root` on its right.
pub fn allocate(
    storage: &Storage,
    old_root: Option<PageId>,
    key_type: KeyType,
    entry: &Entry,
) -> Result<PageId> {
    let node = match old_root {
        None => Node::new_leaf(vec![entry.key.clone()], vec![entry.oid.0]),
        Some(old_root) => Node::new_internal(vec![entry.key.clone()], vec![entry.oid.0, old_root.0]),
    };
    let mut page = storage.new_page()?;
    node.write(&mut page, key_type);
    Ok(page.page_id())
}

/// Insert `entry` into the subtree rooted at `root`.
///
/// When `unique` or `overwrite` is set, an equal key yields
/// [`Outcome::Overwrite`] (its identifier replaced) or
/// [`Outcome::Duplicate`] (nothing changed). Otherwise equal keys are
/// allowed and the entry goes after them.
pub fn insert(
    storage: &Storage,
    root: PageId,
    key_type: KeyType,
    entry: &Entry,
    height: u32,
    unique: bool,
    overwrite: bool,
) -> Result<Outcome> {
    let mut node = read_node(storage, root, key_type)?;

    if height <= 1 {
        let pos = node.lower_bound(&entry.key);
        let hit = node.keys.get(pos).is_some_and(|k| *k == entry.key);
        if hit && (unique || overwrite) {
            if !overwrite {
                return Ok(Outcome::Duplicate);
            }
            node.refs[pos] = entry.oid.0;
            write_node(storage, root, &node, key_type)?;
            return Ok(Outcome::Overwrite);
        }
        let pos = node.upper_bound(&entry.key);
        node.keys.insert(pos, entry.key.clone());
        node.refs.insert(pos, entry.oid.0);
        return finish(storage, root, node, key_type, false);
    }

    let pos = node.lower_bound(&entry.key);
    let child = PageId::new(node.refs[pos]);
    match insert(storage, child, key_type, entry, height - 1, unique, overwrite)? {
        Outcome::Overflow(separator) => {
            node.keys.insert(pos, separator.key);
            node.refs.insert(pos, separator.oid.0);
            finish(storage, root, node, key_type, false)
        }
        other => Ok(other),
    }
}

/// Remove `entry` from the subtree rooted at `root`.
///
/// A null `entry.oid` removes the first entry with an equal key; otherwise
/// both key and identifier must match.
pub fn remove(
    storage: &Storage,
    root: PageId,
    key_type: KeyType,
    entry: &Entry,
    height: u32,
) -> Result<Outcome> {
    let mut node = read_node(storage, root, key_type)?;

    if height <= 1 {
        let mut pos = node.lower_bound(&entry.key);
        while pos < node.keys.len() && node.keys[pos] == entry.key {
            if entry.oid.is_null() || node.refs[pos] == entry.oid.0 {
                node.keys.remove(pos);
                node.refs.remove(pos);
                return finish(storage, root, node, key_type, true);
            }
            pos += 1;
        }
        return Ok(Outcome::NotFound);
    }

    let mut pos = node.lower_bound(&entry.key);
    loop {
        let child = PageId::new(node.refs[pos]);
        match remove(storage, child, key_type, entry, height - 1)? {
            Outcome::NotFound => {
                // Equal keys may continue in the next subtree.
                if pos < node.keys.len() && node.keys[pos] == entry.key {
                    pos += 1;
                    continue;
                }
                return Ok(Outcome::NotFound);
            }
            Outcome::Underflow => return rebalance(storage, root, node, pos, key_type),
            Outcome::Overflow(separator) => {
                node.keys.insert(pos, separator.key);
                node.refs.insert(pos, separator.oid.0);
                return finish(storage, root, node, key_type, true);
            }
            other => return Ok(other),
        }
    }
}

/// Collect identifiers of entries with `from <= key <= till` in key order.
/// Open bounds are unbounded.
pub fn find(
    storage: &Storage,
    root: PageId,
    from: Option<&Key>,
    till: Option<&Key>,
    key_type: KeyType,
    height: u32,
    sink: &mut Vec<Oid>,
) -> Result<()> {
    let past = |key: &Key| till.is_some_and(|till| key > till);
    find_in(storage, root, from, &past, key_type, height, sink).map(|_| ())
}

/// Collect identifiers of entries whose string key starts with `prefix`,
/// in key order.
pub fn find_prefix(
    storage: &Storage,
    root: PageId,
    prefix: &str,
    height: u32,
    sink: &mut Vec<Oid>,
) -> Result<()> {
    let from = Key::String(prefix.to_string());
    // Keys sharing the prefix are contiguous from `prefix` onward, so the
    // first key at or after it without the prefix ends the scan.
    let past = |key: &Key| match key {
        Key::String(s) => !s.starts_with(prefix),
        _ => true,
    };
    find_in(storage, root, Some(&from), &past, KeyType::String, height, sink).map(|_| ())
}

/// Returns `false` once a key for which `past` holds was seen.
fn find_in(
    storage: &Storage,
    page_id: PageId,
    from: Option<&Key>,
    past: &dyn Fn(&Key) -> bool,
    key_type: KeyType,
    height: u32,
    sink: &mut Vec<Oid>,
) -> Result<bool> {
    let node = read_node(storage, page_id, key_type)?;
    let start = from.map_or(0, |from| node.lower_bound(from));

    if height <= 1 {
        for pos in start..node.keys.len() {
            if past(&node.keys[pos]) {
                return Ok(false);
            }
            sink.push(Oid(node.refs[pos]));
        }
        return Ok(true);
    }

    for pos in start..node.refs.len() {
        let child = PageId::new(node.refs[pos]);
        if !find_in(storage, child, from, past, key_type, height - 1, sink)? {
            return Ok(false);
        }
        if node.keys.get(pos).is_some_and(|key| past(key)) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Release every page of the subtree. Indexed objects are left alone.
pub fn purge(storage: &Storage, root: PageId, key_type: KeyType, height: u32) -> Result<()> {
    if height > 1 {
        let node = read_node(storage, root, key_type)?;
        for &child in &node.refs {
            purge(storage, PageId::new(child), key_type, height - 1)?;
        }
    }
    storage.free_page(root)
}

/// Append the identifiers of all entries in ascending key order.
pub fn traverse_forward(
    storage: &Storage,
    root: PageId,
    key_type: KeyType,
    height: u32,
    dest: &mut Vec<Oid>,
) -> Result<()> {
    let node = read_node(storage, root, key_type)?;
    if height <= 1 {
        dest.extend(node.refs.iter().map(|&oid| Oid(oid)));
        return Ok(());
    }
    for &child in &node.refs {
        traverse_forward(storage, PageId::new(child), key_type, height - 1, dest)?;
    }
    Ok(())
}

/// Mark the subtree's pages and the objects its leaves refer to.
pub fn mark_page(
    storage: &Storage,
    root: PageId,
    key_type: KeyType,
    height: u32,
    marks: &mut MarkSet,
) -> Result<()> {
    marks.mark_page(root);
    let node = read_node(storage, root, key_type)?;
    if height <= 1 {
        for &oid in &node.refs {
            marks.mark_object(Oid(oid));
        }
        return Ok(());
    }
    for &child in &node.refs {
        mark_page(storage, PageId::new(child), key_type, height - 1, marks)?;
    }
    Ok(())
}

// ============================================================================
// Node I/O and restructuring
// ============================================================================

fn read_node(storage: &Storage, page_id: PageId, key_type: KeyType) -> Result<Node> {
    let page = storage.fetch_page_read(page_id)?;
    Node::read(&page, page_id, key_type)
}

fn write_node(storage: &Storage, page_id: PageId, node: &Node, key_type: KeyType) -> Result<()> {
    let mut page = storage.fetch_page_write(page_id)?;
    node.write(&mut page, key_type);
    Ok(())
}

/// Write back a modified node, splitting it if it no longer fits.
///
/// On a split the lower half moves to a new page, the original page keeps
/// the upper half, and the separator is reported upward.
fn finish(
    storage: &Storage,
    page_id: PageId,
    node: Node,
    key_type: KeyType,
    report_underflow: bool,
) -> Result<Outcome> {
    if node.fits(key_type) {
        let underflow = report_underflow && node.is_underfull(key_type);
        write_node(storage, page_id, &node, key_type)?;
        return Ok(if underflow {
            Outcome::Underflow
        } else {
            Outcome::Done
        });
    }

    let (left, separator, right) = node.split(key_type);
    let left_id = {
        let mut page = storage.new_page()?;
        left.write(&mut page, key_type);
        page.page_id()
    };
    write_node(storage, page_id, &right, key_type)?;
    trace!(%page_id, %left_id, "split page");

    Ok(Outcome::Overflow(Entry::new(separator, Oid::from(left_id))))
}

/// Fix up the underfull child at `pos` of `node` by merging it with a
/// neighbour or, if both do not fit one page, redistributing their entries.
fn rebalance(
    storage: &Storage,
    page_id: PageId,
    mut node: Node,
    pos: usize,
    key_type: KeyType,
) -> Result<Outcome> {
    if node.keys.is_empty() {
        return finish(storage, page_id, node, key_type, true);
    }
    let sep = if pos < node.keys.len() { pos } else { pos - 1 };
    let left_id = PageId::new(node.refs[sep]);
    let right_id = PageId::new(node.refs[sep + 1]);

    let left = read_node(storage, left_id, key_type)?;
    let right = read_node(storage, right_id, key_type)?;

    let mut keys = left.keys;
    if !left.leaf {
        keys.push(node.keys[sep].clone());
    }
    keys.extend(right.keys);
    let mut refs = left.refs;
    refs.extend(right.refs);
    let combined = Node {
        leaf: left.leaf,
        keys,
        refs,
    };

    if combined.fits(key_type) {
        write_node(storage, right_id, &combined, key_type)?;
        storage.free_page(left_id)?;
        node.keys.remove(sep);
        node.refs.remove(sep);
        trace!(%left_id, %right_id, "merged pages");
    } else {
        let (left, separator, right) = combined.split(key_type);
        write_node(storage, left_id, &left, key_type)?;
        write_node(storage, right_id, &right, key_type)?;
        node.keys[sep] = separator;
        trace!(%left_id, %right_id, "redistributed pages");
    }

    finish(storage, page_id, node, key_type, true)
}

use std::borrow::Borrow;
use std::cmp::{max, Ordering};
use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};

use crate::error::MapError;

struct Node<K, V> {
    key: K,
    value: V,
    // -1 for a missing subtree, 0 for a leaf
    height: i32,
    left: Option<usize>,
    right: Option<usize>,
}

impl<K, V> Node<K, V> {
    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn num_children(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }
}

struct NodePool<K, V> {
    nodes: Vec<Node<K, V>>,
    free_list: Vec<usize>,
}

impl<K, V> NodePool<K, V> {
    fn new() -> Self {
        NodePool {
            nodes: Vec::new(),
            free_list: Vec::new(),
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        NodePool {
            nodes: Vec::with_capacity(capacity),
            free_list: Vec::new(),
        }
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        let node = Node {
            key,
            value,
            height: 0,
            left: None,
            right: None,
        };
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(node);
            idx
        }
    }

    fn free(&mut self, idx: usize) {
        self.free_list.push(idx);
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
    }
}

// What a removal descent is looking for: a caller-supplied key, or a specific
// slot (used to delete the in-order successor after its payload was swapped
// into the doomed node).
enum Target<'a, Q: ?Sized> {
    Key(&'a Q),
    Node(usize),
}

/// An ordered map keyed by `K`, balanced as an AVL tree.
///
/// Every operation is O(log n) in the number of stored keys. `insert` does
/// not overwrite: a key that is already present is left untouched and the
/// call reports `false`.
pub struct AvlMap<K, V> {
    pool: NodePool<K, V>,
    root: Option<usize>,
    len: usize,
}

impl<K, V> AvlMap<K, V> {
    pub fn new() -> Self {
        AvlMap {
            pool: NodePool::new(),
            root: None,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        AvlMap {
            pool: NodePool::with_capacity(capacity),
            root: None,
            len: 0,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the root node: 0 for a single entry, -1 for an empty map.
    pub fn height(&self) -> i32 {
        self.height_of(self.root)
    }

    /// Drops every entry and releases the node storage wholesale.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.root = None;
        self.len = 0;
    }

    /// In-order iterator over `(&key, &value)` pairs, ascending by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            pool: &self.pool,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Vec<&K> {
        self.iter().map(|(key, _)| key).collect()
    }

    fn height_of(&self, idx: Option<usize>) -> i32 {
        idx.map_or(-1, |i| self.pool.nodes[i].height)
    }

    fn update_height(&mut self, idx: usize) {
        let lh = self.height_of(self.pool.nodes[idx].left);
        let rh = self.height_of(self.pool.nodes[idx].right);
        self.pool.nodes[idx].height = max(lh, rh) + 1;
    }

    fn balance(&self, idx: usize) -> i32 {
        self.height_of(self.pool.nodes[idx].left) - self.height_of(self.pool.nodes[idx].right)
    }

    // Rotations take a subtree by its root index and return the index of the
    // new root; the caller rebinds its child slot. The demoted node's height
    // is recomputed before the promoted hook's.
    fn rotate_right(&mut self, idx: usize) -> usize {
        let hook = self.pool.nodes[idx].left.expect("rotate_right on missing left child");
        let moved = self.pool.nodes[hook].right;
        self.pool.nodes[hook].right = Some(idx);
        self.pool.nodes[idx].left = moved;
        self.update_height(idx);
        self.update_height(hook);
        hook
    }

    fn rotate_left(&mut self, idx: usize) -> usize {
        let hook = self.pool.nodes[idx].right.expect("rotate_left on missing right child");
        let moved = self.pool.nodes[hook].left;
        self.pool.nodes[hook].left = Some(idx);
        self.pool.nodes[idx].right = moved;
        self.update_height(idx);
        self.update_height(hook);
        hook
    }

    fn rebalance(&mut self, idx: usize) -> usize {
        self.update_height(idx);
        let bf = self.balance(idx);
        if bf > 1 {
            if self.balance(self.pool.nodes[idx].left.unwrap()) < 0 {
                let left = self.pool.nodes[idx].left.unwrap();
                self.pool.nodes[idx].left = Some(self.rotate_left(left));
            }
            return self.rotate_right(idx);
        }
        if bf < -1 {
            if self.balance(self.pool.nodes[idx].right.unwrap()) > 0 {
                let right = self.pool.nodes[idx].right.unwrap();
                self.pool.nodes[idx].right = Some(self.rotate_right(right));
            }
            return self.rotate_left(idx);
        }
        idx
    }
}

impl<K: Ord, V> AvlMap<K, V> {
    /// Inserts `key` with `value` if the key is absent; returns whether the
    /// entry was stored. A present key is not overwritten.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let (root, inserted) = self.insert_at(self.root, key, value);
        self.root = Some(root);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_at(&mut self, idx: Option<usize>, key: K, value: V) -> (usize, bool) {
        let Some(i) = idx else {
            return (self.pool.alloc(key, value), true);
        };
        let inserted = match key.cmp(&self.pool.nodes[i].key) {
            Ordering::Less => {
                let (left, inserted) = self.insert_at(self.pool.nodes[i].left, key, value);
                self.pool.nodes[i].left = Some(left);
                inserted
            }
            Ordering::Greater => {
                let (right, inserted) = self.insert_at(self.pool.nodes[i].right, key, value);
                self.pool.nodes[i].right = Some(right);
                inserted
            }
            Ordering::Equal => false,
        };
        if inserted {
            (self.rebalance(i), true)
        } else {
            (i, false)
        }
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, removed) = self.remove_at(self.root, Target::Key(key));
        self.root = root;
        if removed {
            self.len -= 1;
        }
        removed
    }

    fn remove_at<Q>(&mut self, idx: Option<usize>, target: Target<'_, Q>) -> (Option<usize>, bool)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(i) = idx else {
            return (None, false);
        };
        let ord = match &target {
            Target::Key(key) => (*key).cmp(self.pool.nodes[i].key.borrow()),
            Target::Node(node) => self.pool.nodes[*node].key.cmp(&self.pool.nodes[i].key),
        };
        match ord {
            Ordering::Less => {
                let (left, removed) = self.remove_at(self.pool.nodes[i].left, target);
                self.pool.nodes[i].left = left;
                if !removed {
                    return (Some(i), false);
                }
            }
            Ordering::Greater => {
                let (right, removed) = self.remove_at(self.pool.nodes[i].right, target);
                self.pool.nodes[i].right = right;
                if !removed {
                    return (Some(i), false);
                }
            }
            Ordering::Equal => return (self.remove_node(i), true),
        }
        (Some(self.rebalance(i)), true)
    }

    // Detaches slot `i` from the tree and returns the subtree that replaces
    // it. Leaves and single-child nodes are freed directly; a node with two
    // children swaps payloads with its in-order successor and removes the
    // successor slot instead, which has at most one child.
    fn remove_node(&mut self, i: usize) -> Option<usize> {
        if self.pool.nodes[i].is_leaf() {
            self.pool.free(i);
            return None;
        }
        if self.pool.nodes[i].num_children() == 1 {
            let child = self.pool.nodes[i].left.or(self.pool.nodes[i].right);
            self.pool.free(i);
            return child;
        }

        let right = self.pool.nodes[i].right.unwrap();
        let succ = self.leftmost(right);
        let (a, b) = if i < succ { (i, succ) } else { (succ, i) };
        let (lo, hi) = self.pool.nodes.split_at_mut(b);
        mem::swap(&mut lo[a].key, &mut hi[0].key);
        mem::swap(&mut lo[a].value, &mut hi[0].value);

        let (right, _) = self.remove_at::<K>(self.pool.nodes[i].right, Target::Node(succ));
        self.pool.nodes[i].right = right;
        Some(self.rebalance(i))
    }

    fn leftmost(&self, mut idx: usize) -> usize {
        while let Some(left) = self.pool.nodes[idx].left {
            idx = left;
        }
        idx
    }

    fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while let Some(i) = cur {
            match key.cmp(self.pool.nodes[i].key.borrow()) {
                Ordering::Less => cur = self.pool.nodes[i].left,
                Ordering::Greater => cur = self.pool.nodes[i].right,
                Ordering::Equal => return Some(i),
            }
        }
        None
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|i| &self.pool.nodes[i].value)
    }

    /// Mutable access to the value stored under `key`, or
    /// [`MapError::KeyNotFound`] if the key is absent.
    pub fn value_mut<Q>(&mut self, key: &Q) -> Result<&mut V, MapError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let i = self.find(key).ok_or(MapError::KeyNotFound)?;
        Ok(&mut self.pool.nodes[i].value)
    }

    /// Values for every key in `low..=high`, ascending by key. Bounds are
    /// inclusive on both ends; if `low > high` the result is empty.
    pub fn range<Q>(&self, low: &Q, high: &Q) -> Vec<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut values = Vec::new();
        self.range_into(self.root, low, high, &mut values);
        values
    }

    // In-order walk pruned by the bounds: a node below the window can only
    // have qualifying keys to its right, one above only to its left.
    fn range_into<'a, Q>(&'a self, idx: Option<usize>, low: &Q, high: &Q, values: &mut Vec<&'a V>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(i) = idx else {
            return;
        };
        let node = &self.pool.nodes[i];
        let key = node.key.borrow();
        if low <= key && key <= high {
            self.range_into(node.left, low, high, values);
            values.push(&node.value);
            self.range_into(node.right, low, high, values);
        } else if key < low {
            self.range_into(node.right, low, high, values);
        } else {
            self.range_into(node.left, low, high, values);
        }
    }
}

impl<K, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        AvlMap::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlMap<K, V> {
    // Pre-order clone into a fresh arena, so a copy is fully independent and
    // carries no free-list slots over from the source.
    fn clone(&self) -> Self {
        let mut pool = NodePool::with_capacity(self.len);
        let root = self.clone_subtree(self.root, &mut pool);
        AvlMap {
            pool,
            root,
            len: self.len,
        }
    }
}

impl<K: Clone, V: Clone> AvlMap<K, V> {
    fn clone_subtree(&self, idx: Option<usize>, pool: &mut NodePool<K, V>) -> Option<usize> {
        let i = idx?;
        let src = &self.pool.nodes[i];
        let new = pool.alloc(src.key.clone(), src.value.clone());
        pool.nodes[new].height = src.height;
        pool.nodes[new].left = self.clone_subtree(src.left, pool);
        pool.nodes[new].right = self.clone_subtree(src.right, pool);
        Some(new)
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AvlMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, Q> Index<&Q> for AvlMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K, V, Q> IndexMut<&Q> for AvlMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    fn index_mut(&mut self, key: &Q) -> &mut V {
        self.value_mut(key).expect("key not found")
    }
}

impl<'a, K, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Diagnostic rendering: right subtree first, one `key, value` line per
/// node, four spaces of indentation per level. The tree reads sideways,
/// root at the far left and greater keys above.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render<K: fmt::Display, V: fmt::Display>(
            pool: &NodePool<K, V>,
            idx: Option<usize>,
            depth: usize,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            let Some(i) = idx else {
                return Ok(());
            };
            let node = &pool.nodes[i];
            render(pool, node.right, depth + 1, f)?;
            writeln!(f, "{}{}, {}", "    ".repeat(depth), node.key, node.value)?;
            render(pool, node.left, depth + 1, f)
        }
        render(&self.pool, self.root, 0, f)
    }
}

/// In-order iterator over a map's entries. Created by [`AvlMap::iter`].
pub struct Iter<'a, K, V> {
    pool: &'a NodePool<K, V>,
    stack: Vec<usize>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut idx: Option<usize>) {
        while let Some(i) = idx {
            self.stack.push(i);
            idx = self.pool.nodes[i].left;
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.stack.pop()?;
        let pool = self.pool;
        let node = &pool.nodes[i];
        self.push_left(node.right);
        Some((&node.key, &node.value))
    }
}

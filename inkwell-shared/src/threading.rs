/// Builds reply trees out of flat comment lists
///
/// Comments come out of the database as a flat, chronologically ordered list.
/// [`build_thread`] nests them in a single linear pass:
///
/// - items without a parent are roots
/// - items whose parent is in the list become that parent's replies
/// - items whose parent is not in the list (deleted, pending, rejected) are
///   promoted to roots
///
/// Reply order follows input order. Every input item ends up in exactly one
/// node, even for corrupt input: members of a parent cycle cannot be reached
/// from a root and are promoted to roots themselves.
///
/// Building, sizing and dropping a tree use no recursion, so arbitrarily deep
/// chains are fine. The derived `Serialize`, `Clone` and `PartialEq` impls do
/// recurse once per level; API comment trees are at most two levels deep.
///
/// # Example
///
/// ```
/// use inkwell_shared::threading::{build_thread, ThreadItem};
/// use uuid::Uuid;
///
/// struct Note { id: Uuid, parent: Option<Uuid> }
///
/// impl ThreadItem for Note {
///     fn thread_id(&self) -> Uuid { self.id }
///     fn thread_parent_id(&self) -> Option<Uuid> { self.parent }
/// }
///
/// let root = Uuid::new_v4();
/// let tree = build_thread(vec![
///     Note { id: root, parent: None },
///     Note { id: Uuid::new_v4(), parent: Some(root) },
/// ]);
///
/// assert_eq!(tree.len(), 1);
/// assert_eq!(tree[0].replies.len(), 1);
/// ```

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use uuid::Uuid;

/// Anything that can be placed in a reply tree
pub trait ThreadItem {
    fn thread_id(&self) -> Uuid;
    fn thread_parent_id(&self) -> Option<Uuid>;
}

/// One comment plus its nested replies
///
/// Serializes as the item's own fields with an extra `replies` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub replies: Vec<ThreadNode<T>>,
}

impl<T> ThreadNode<T> {
    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

impl<T> Drop for ThreadNode<T> {
    // Unlinks descendants onto a heap stack so each node drops with no replies
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }
}

/// Total number of nodes in a forest
pub fn thread_size<T>(roots: &[ThreadNode<T>]) -> usize {
    roots.iter().map(ThreadNode::size).sum()
}

/// Nests `items` into reply trees, preserving input order
pub fn build_thread<T: ThreadItem>(items: Vec<T>) -> Vec<ThreadNode<T>> {
    let n = items.len();

    // First occurrence wins if ids repeat
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(n);
    for (i, item) in items.iter().enumerate() {
        index.entry(item.thread_id()).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match item.thread_parent_id().and_then(|p| index.get(&p).copied()) {
            Some(parent) if parent != i => children[parent].push(i),
            _ => roots.push(i),
        }
    }

    let mut walk = Walk {
        children: &children,
        visited: vec![false; n],
        order: Vec::with_capacity(n),
        tree_children: vec![Vec::new(); n],
    };

    let mut tree_roots = Vec::with_capacity(roots.len());
    for root in roots {
        walk.visit(root);
        tree_roots.push(root);
    }

    // Anything still unvisited sits on a parent cycle
    for i in 0..n {
        if !walk.visited[i] {
            walk.visit(i);
            tree_roots.push(i);
        }
    }

    let Walk {
        order,
        tree_children,
        ..
    } = walk;

    // Parents precede children in `order`, so reverse order builds leaves first
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut built: Vec<Option<ThreadNode<T>>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let replies = tree_children[i]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        if let Some(item) = slots[i].take() {
            built[i] = Some(ThreadNode { item, replies });
        }
    }

    tree_roots
        .into_iter()
        .filter_map(|root| built[root].take())
        .collect()
}

struct Walk<'a> {
    children: &'a [Vec<usize>],
    visited: Vec<bool>,
    order: Vec<usize>,
    tree_children: Vec<Vec<usize>>,
}

impl Walk<'_> {
    /// Breadth-first walk from `root`, claiming every unvisited descendant
    fn visit(&mut self, root: usize) {
        self.visited[root] = true;
        let mut queue = VecDeque::from([root]);

        while let Some(node) = queue.pop_front() {
            self.order.push(node);
            for &child in &self.children[node] {
                if !self.visited[child] {
                    self.visited[child] = true;
                    self.tree_children[node].push(child);
                    queue.push_back(child);
                }
            }
        }
    }
}

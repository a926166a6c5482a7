//! In-order traversal.

use std::iter::FusedIterator;

use crate::index::btree::node::Node;

/// Lazy ascending iterator over the keys of a [`BTreeIndex`](crate::BTreeIndex).
///
/// Keeps one `(node, next key position)` frame per level on an explicit
/// stack, so memory use is bounded by the tree height. Created by
/// [`BTreeIndex::iter`](crate::BTreeIndex::iter); call it again to restart.
#[derive(Debug)]
pub struct Iter<'a, K> {
    stack: Vec<(&'a Node<K>, usize)>,
    remaining: usize,
}

impl<'a, K> Iter<'a, K> {
    pub(crate) fn new(root: &'a Node<K>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        iter.push_left_spine(root);
        iter
    }

    /// Push `node` and its leftmost descendants.
    fn push_left_spine(&mut self, mut node: &'a Node<K>) {
        loop {
            self.stack.push((node, 0));
            match node.children.first() {
                Some(child) if !node.is_leaf() => node = child,
                _ => break,
            }
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        loop {
            let (node, pos) = self.stack.last_mut()?;
            let node: &'a Node<K> = *node;
            if *pos < node.keys.len() {
                let key = &node.keys[*pos];
                *pos += 1;
                let next_child = *pos;
                if let Some(child) = node.children.get(next_child) {
                    self.push_left_spine(child);
                }
                self.remaining = self.remaining.saturating_sub(1);
                return Some(key);
            }
            self.stack.pop();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root() {
        let root: Node<i32> = Node::empty_leaf();
        let mut iter = Iter::new(&root, 0);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_interleaves_children_and_keys() {
        let root = Node::internal_with(
            vec![10, 20],
            vec![
                Node::leaf_with(vec![1, 2]),
                Node::leaf_with(vec![11, 12]),
                Node::leaf_with(vec![21, 22]),
            ],
        );

        let keys: Vec<i32> = Iter::new(&root, 8).copied().collect();
        assert_eq!(keys, vec![1, 2, 10, 11, 12, 20, 21, 22]);
    }

    #[test]
    fn test_three_levels() {
        let left = Node::internal_with(
            vec![3],
            vec![Node::leaf_with(vec![1, 2]), Node::leaf_with(vec![4])],
        );
        let right = Node::internal_with(
            vec![9],
            vec![Node::leaf_with(vec![6, 7]), Node::leaf_with(vec![10, 11])],
        );
        let root = Node::internal_with(vec![5], vec![left, right]);

        let keys: Vec<i32> = Iter::new(&root, 10).copied().collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7, 9, 10, 11]);
    }

    #[test]
    fn test_exact_size_and_clone() {
        let root = Node::leaf_with(vec![1, 2, 3]);
        let mut iter = Iter::new(&root, 3);
        assert_eq!(iter.len(), 3);

        iter.next();
        let restarted = iter.clone();
        assert_eq!(iter.len(), 2);
        assert_eq!(restarted.copied().collect::<Vec<_>>(), vec![2, 3]);
    }
}

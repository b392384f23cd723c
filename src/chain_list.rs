use crate::{
    cursor::{next_list_tag, Cursor},
    errors::{ChainListError, Result},
    node::Node,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

/// A singly-linked list with stable cursors, group insertion and group removal.
///
/// Nodes live in an id-keyed arena. The chain starts at `head` and follows
/// each node's `next` link; ids are handed out monotonically and never reused,
/// so a [`Cursor`] to a removed node can always be detected. Each list also
/// carries a tag, shared with its clones, that rejects cursors from other lists.
///
/// Dropping or clearing the list drops its elements front to back.
#[derive(Clone)]
pub struct ChainList<T> {
    nodes: HashMap<usize, Node<T>>,
    tag: usize,
    head: Option<usize>,
    next_id: usize,
    len: usize,
}

/// Iterator over values in chain order.
pub struct Iter<'a, T> {
    list: &'a ChainList<T>,
    cur: Option<usize>,
    remaining: usize,
}

/// Iterator over mutable values in chain order.
pub struct IterMut<'a, T> {
    inner: std::vec::IntoIter<&'a mut T>,
}

/// Iterator over `(Cursor, &T)` in chain order.
pub struct Cursors<'a, T> {
    list: &'a ChainList<T>,
    cur: Option<usize>,
    remaining: usize,
}

/// Owning iterator, front to back.
pub struct IntoIter<T> {
    list: ChainList<T>,
}

impl<T> Default for ChainList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChainList<T> {
    /// Create a new empty list.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            tag: next_list_tag(),
            head: None,
            next_id: 0,
            len: 0,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the list empty?
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert a value at the head of the chain.
    pub fn insert_front(&mut self, value: T) -> Cursor {
        let id = self.link_front(value);
        self.cursor(Some(id))
    }

    /// Insert a value after the last node. Walks the whole chain.
    pub fn insert_back(&mut self, value: T) -> Cursor {
        match self.last_id() {
            Some(last) => {
                let id = self.link_after(last, value);
                self.cursor(Some(id))
            }
            None => self.insert_front(value),
        }
    }

    /// Remove the head node, returning its value.
    pub fn remove_front(&mut self) -> Result<T> {
        match self.pop_head() {
            Some(value) => Ok(value),
            None => {
                warn!("list is empty, cannot remove from the front");
                Err(ChainListError::EmptyList)
            }
        }
    }

    /// Remove the last node, returning its value.
    pub fn remove_back(&mut self) -> Result<T> {
        let Some(mut cur) = self.head else {
            warn!("list is empty, cannot remove from the back");
            return Err(ChainListError::EmptyList);
        };
        let mut prev = None;
        while let Some(next) = self.nodes[&cur].next {
            prev = Some(cur);
            cur = next;
        }
        Ok(self.unlink(prev, cur))
    }

    /// Remove every element front to back, invalidating all cursors.
    pub fn clear(&mut self) {
        while self.pop_head().is_some() {}
        debug_assert!(self.nodes.is_empty());
        self.head = None;
        self.len = 0;
    }

    /// Cursor at the head node, or the end position if the list is empty.
    pub fn begin(&self) -> Cursor {
        self.cursor(self.head)
    }

    /// The end position.
    pub fn end(&self) -> Cursor {
        Cursor::END
    }

    /// Dereference a cursor.
    ///
    /// A cursor resolves in the list that issued it and in clones of that
    /// list. Cursors from any other list are rejected with
    /// [`ForeignCursor`](ChainListError::ForeignCursor).
    pub fn get(&self, cursor: Cursor) -> Result<&T> {
        let id = self.resolve(cursor)?;
        Ok(&self.nodes[&id].value)
    }

    /// Mutably dereference a cursor.
    pub fn get_mut(&mut self, cursor: Cursor) -> Result<&mut T> {
        let id = self.resolve(cursor)?;
        Ok(&mut self.node_mut(id).value)
    }

    /// Move `cursor` to the next node, or to the end position after the last node.
    ///
    /// Advancing the end position is reported as
    /// [`InvalidAdvance`](ChainListError::InvalidAdvance) and leaves the
    /// cursor at the end position. A stale cursor is left untouched.
    pub fn advance(&self, cursor: &mut Cursor) -> Result<()> {
        let Some(id) = cursor.node else {
            warn!("invalid cursor advance, cursor is at the end position");
            return Err(ChainListError::InvalidAdvance);
        };
        if cursor.list != self.tag {
            warn!("invalid cursor advance, cursor belongs to another list");
            return Err(ChainListError::ForeignCursor);
        }
        match self.nodes.get(&id) {
            Some(node) => {
                *cursor = self.cursor(node.next);
                Ok(())
            }
            None => {
                warn!("invalid cursor advance, node {id} was removed");
                Err(ChainListError::StaleCursor)
            }
        }
    }

    /// First element, if any.
    pub fn front(&self) -> Option<&T> {
        self.head.map(|id| &self.nodes[&id].value)
    }

    /// Mutable first element, if any.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        let id = self.head?;
        Some(&mut self.node_mut(id).value)
    }

    /// Last element, if any. Walks the whole chain.
    pub fn back(&self) -> Option<&T> {
        self.last_id().map(|id| &self.nodes[&id].value)
    }

    /// Iterate values in chain order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cur: self.head,
            remaining: self.len,
        }
    }

    /// Iterate mutable values in chain order.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let order = self.chain_ids();
        let mut by_id: HashMap<usize, &mut T> = self
            .nodes
            .iter_mut()
            .map(|(id, node)| (*id, &mut node.value))
            .collect();
        let values: Vec<&mut T> = order.iter().filter_map(|id| by_id.remove(id)).collect();
        IterMut {
            inner: values.into_iter(),
        }
    }

    /// Iterate `(Cursor, &T)` in chain order.
    pub fn cursors(&self) -> Cursors<'_, T> {
        Cursors {
            list: self,
            cur: self.head,
            remaining: self.len,
        }
    }

    fn resolve(&self, cursor: Cursor) -> Result<usize> {
        match cursor.node {
            None => {
                warn!("cannot dereference the end position");
                Err(ChainListError::EndPosition)
            }
            Some(_) if cursor.list != self.tag => {
                warn!("cannot dereference cursor, it belongs to another list");
                Err(ChainListError::ForeignCursor)
            }
            Some(id) if self.nodes.contains_key(&id) => Ok(id),
            Some(id) => {
                warn!("cannot dereference cursor, node {id} was removed");
                Err(ChainListError::StaleCursor)
            }
        }
    }

    fn reserve_nodes(&mut self, additional: usize) -> Result<()> {
        self.nodes.try_reserve(additional).map_err(|_| {
            warn!("failed to allocate memory for {additional} new nodes");
            ChainListError::AllocationFailure
        })
    }

    fn cursor(&self, node: Option<usize>) -> Cursor {
        Cursor::at(self.tag, node)
    }

    fn node_mut(&mut self, id: usize) -> &mut Node<T> {
        self.nodes
            .get_mut(&id)
            .expect("chain links refer to live nodes")
    }

    fn alloc(&mut self, value: T, next: Option<usize>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, value, next));
        self.len += 1;
        id
    }

    fn link_front(&mut self, value: T) -> usize {
        let id = self.alloc(value, self.head);
        self.head = Some(id);
        id
    }

    fn link_after(&mut self, anchor: usize, value: T) -> usize {
        let next = self.nodes[&anchor].next;
        let id = self.alloc(value, next);
        self.node_mut(anchor).next = Some(id);
        id
    }

    /// Detach `id` from the chain. `prev` must be its predecessor, or `None` for the head.
    fn unlink(&mut self, prev: Option<usize>, id: usize) -> T {
        let node = self
            .nodes
            .remove(&id)
            .expect("chain links refer to live nodes");
        match prev {
            Some(p) => {
                debug_assert_eq!(self.nodes[&p].next, Some(id));
                self.node_mut(p).next = node.next;
            }
            None => {
                debug_assert_eq!(self.head, Some(id));
                self.head = node.next;
            }
        }
        self.len -= 1;
        node.value
    }

    fn pop_head(&mut self) -> Option<T> {
        let id = self.head?;
        Some(self.unlink(None, id))
    }

    fn last_id(&self) -> Option<usize> {
        let mut cur = self.head?;
        while let Some(next) = self.nodes[&cur].next {
            cur = next;
        }
        Some(cur)
    }

    fn chain_ids(&self) -> Vec<usize> {
        let mut ids = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(id) = cur {
            let node = &self.nodes[&id];
            debug_assert_eq!(node.id, id);
            ids.push(id);
            cur = node.next;
        }
        ids
    }
}

impl<T: PartialEq> ChainList<T> {
    /// Insert `value` right after the first element equal to `after`.
    pub fn insert_after(&mut self, after: &T, value: T) -> Result<Cursor> {
        let anchor = self.anchor(after)?;
        let id = self.link_after(anchor, value);
        Ok(self.cursor(Some(id)))
    }

    /// Insert `values`, in order and contiguous, right after the first element
    /// equal to `after`.
    ///
    /// Storage for the whole group is reserved before anything is linked, so
    /// the group is inserted entirely or not at all. Returns the cursor of the
    /// last inserted node, or the anchor's cursor when `values` is empty.
    ///
    /// [`AllocationFailure`](ChainListError::AllocationFailure) is only
    /// reported under memory exhaustion, when the arena cannot grow to hold
    /// the group.
    pub fn insert_group_after<I>(&mut self, after: &T, values: I) -> Result<Cursor>
    where
        I: IntoIterator<Item = T>,
    {
        let anchor = self.anchor(after)?;
        let values: Vec<T> = values.into_iter().collect();
        self.reserve_nodes(values.len())?;

        let count = values.len();
        let mut last = anchor;
        for value in values {
            last = self.link_after(last, value);
        }
        debug!("inserted group of {count} values after node {anchor}");
        Ok(self.cursor(Some(last)))
    }

    /// Remove every element equal to any of `values`, returning how many were removed.
    ///
    /// Emptiness is checked once on entry. The order of the remaining
    /// elements is unchanged.
    pub fn remove_group(&mut self, values: &[T]) -> Result<usize> {
        if self.is_empty() {
            warn!("list is empty, cannot remove from an empty list");
            return Err(ChainListError::EmptyList);
        }
        let removed = values.iter().map(|value| self.remove_all(value)).sum();
        debug!("removed {removed} nodes matching {} values", values.len());
        Ok(removed)
    }

    /// Cursor at the first element equal to `value`.
    pub fn search(&self, value: &T) -> Result<Cursor> {
        if self.is_empty() {
            warn!("list is empty, cannot search in an empty list");
            return Err(ChainListError::EmptyList);
        }
        match self.find_id(value) {
            Some(id) => Ok(self.cursor(Some(id))),
            None => {
                warn!("element not found");
                Err(ChainListError::ValueNotFound)
            }
        }
    }

    /// Like [`search`](Self::search), but yields the end position on failure.
    pub fn find(&self, value: &T) -> Cursor {
        self.search(value).unwrap_or(Cursor::END)
    }

    /// Does the list contain `value`?
    pub fn contains(&self, value: &T) -> bool {
        self.find_id(value).is_some()
    }

    fn anchor(&self, after: &T) -> Result<usize> {
        if self.is_empty() {
            warn!("list is empty, cannot insert after specified value");
            return Err(ChainListError::EmptyList);
        }
        self.find_id(after).ok_or_else(|| {
            warn!("node with specified value not found, cannot insert after");
            ChainListError::AnchorNotFound
        })
    }

    fn find_id(&self, value: &T) -> Option<usize> {
        self.cursors()
            .find(|(_, v)| *v == value)
            .and_then(|(cursor, _)| cursor.node)
    }

    fn remove_all(&mut self, value: &T) -> usize {
        let mut removed = 0;
        let mut prev = None;
        let mut cur = self.head;
        while let Some(id) = cur {
            let node = &self.nodes[&id];
            cur = node.next;
            if node.value == *value {
                self.unlink(prev, id);
                removed += 1;
            } else {
                prev = Some(id);
            }
        }
        removed
    }
}

impl<T> Drop for ChainList<T> {
    fn drop(&mut self) {
        while self.pop_head().is_some() {}
    }
}

impl<T: fmt::Debug> fmt::Debug for ChainList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for ChainList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for ChainList<T> {}

impl<T> Extend<T> for ChainList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut last = self.last_id();
        for value in iter {
            last = Some(match last {
                Some(id) => self.link_after(id, value),
                None => self.link_front(value),
            });
        }
    }
}

impl<T> FromIterator<T> for ChainList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = ChainList::new();
        list.extend(iter);
        list
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = &self.list.nodes[&id];
        self.cur = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<'a, T> Iterator for Cursors<'a, T> {
    type Item = (Cursor, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = &self.list.nodes[&id];
        self.cur = node.next;
        self.remaining -= 1;
        Some((self.list.cursor(Some(id)), &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Cursors<'_, T> {}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_head()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for ChainList<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { list: self }
    }
}

impl<'a, T> IntoIterator for &'a ChainList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut ChainList<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn values<T: Clone>(list: &ChainList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn basic_usage() {
        let mut list = ChainList::new();
        list.insert_front(3);
        list.insert_front(2);
        list.insert_front(1);
        list.insert_back(4);
        list.insert_back(5);
        assert_eq!(values(&list), vec![1, 2, 3, 4, 5]);

        list.insert_after(&3, 10).unwrap();
        assert_eq!(values(&list), vec![1, 2, 3, 10, 4, 5]);

        list.insert_group_after(&4, [6, 7, 8]).unwrap();
        assert_eq!(values(&list), vec![1, 2, 3, 10, 4, 6, 7, 8, 5]);

        let found = list.search(&6).unwrap();
        assert_ne!(found, list.end());
        assert_eq!(list.get(found), Ok(&6));

        assert_eq!(list.remove_front(), Ok(1));
        assert_eq!(list.remove_back(), Ok(5));
        assert_eq!(values(&list), vec![2, 3, 10, 4, 6, 7, 8]);

        assert_eq!(list.remove_group(&[10, 8]), Ok(2));
        assert_eq!(values(&list), vec![2, 3, 4, 6, 7]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn insert_front_reverses_call_order() {
        let mut list = ChainList::new();
        for v in 1..=5 {
            list.insert_front(v);
        }
        assert_eq!(values(&list), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn insert_back_keeps_call_order() {
        let mut list = ChainList::new();
        for v in 1..=5 {
            list.insert_back(v);
        }
        assert_eq!(values(&list), vec![1, 2, 3, 4, 5]);
        assert_eq!(list.front(), Some(&1));
        assert_eq!(list.back(), Some(&5));
    }

    #[test]
    fn insert_after_uses_first_match() {
        let mut list: ChainList<_> = [1, 2, 1, 2].into_iter().collect();
        let c = list.insert_after(&2, 9).unwrap();
        assert_eq!(values(&list), vec![1, 2, 9, 1, 2]);
        assert_eq!(list.get(c), Ok(&9));
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn insert_after_last_element() {
        let mut list: ChainList<_> = [1, 2].into_iter().collect();
        list.insert_after(&2, 3).unwrap();
        assert_eq!(values(&list), vec![1, 2, 3]);
        assert_eq!(list.back(), Some(&3));
    }

    #[rstest]
    #[case(vec![], 1, Err(ChainListError::EmptyList))]
    #[case(vec![1, 2], 7, Err(ChainListError::AnchorNotFound))]
    fn insert_after_failures(
        #[case] start: Vec<i32>,
        #[case] anchor: i32,
        #[case] expected: Result<Cursor>,
    ) {
        let mut list: ChainList<_> = start.clone().into_iter().collect();
        assert_eq!(list.insert_after(&anchor, 0), expected);
        assert_eq!(list.insert_group_after(&anchor, [0, 0]), expected);
        assert_eq!(values(&list), start);
    }

    #[test]
    fn group_insert_is_contiguous() {
        let mut list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let last = list.insert_group_after(&1, vec![7, 8, 9]).unwrap();
        assert_eq!(values(&list), vec![1, 7, 8, 9, 2, 3]);
        assert_eq!(list.get(last), Ok(&9));
        assert_eq!(list.len(), 6);
    }

    #[test]
    fn failed_reservation_leaves_list_untouched() {
        let mut list: ChainList<_> = [1, 2].into_iter().collect();
        assert_eq!(
            list.reserve_nodes(usize::MAX),
            Err(ChainListError::AllocationFailure)
        );
        assert_eq!(values(&list), vec![1, 2]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.reserve_nodes(3), Ok(()));
    }

    #[test]
    fn empty_group_returns_anchor() {
        let mut list: ChainList<_> = [1, 2].into_iter().collect();
        let c = list.insert_group_after(&2, Vec::new()).unwrap();
        assert_eq!(list.get(c), Ok(&2));
        assert_eq!(list.len(), 2);
    }

    #[rstest]
    #[case(vec![1, 2, 1, 3, 1], vec![1], 3, vec![2, 3])]
    #[case(vec![1, 2, 3], vec![4], 0, vec![1, 2, 3])]
    #[case(vec![1, 2, 3], vec![3, 3, 1], 2, vec![2])]
    #[case(vec![5, 5, 5], vec![5], 3, vec![])]
    #[case(vec![1, 2, 3], vec![], 0, vec![1, 2, 3])]
    fn remove_group_cases(
        #[case] start: Vec<i32>,
        #[case] remove: Vec<i32>,
        #[case] count: usize,
        #[case] rest: Vec<i32>,
    ) {
        let mut list: ChainList<_> = start.into_iter().collect();
        assert_eq!(list.remove_group(&remove), Ok(count));
        assert_eq!(values(&list), rest);
        assert_eq!(list.len(), rest.len());
    }

    #[test]
    fn removals_on_single_element() {
        let mut list = ChainList::new();
        list.insert_front("a");
        assert_eq!(list.remove_back(), Ok("a"));
        assert!(list.is_empty());

        list.insert_back("b");
        assert_eq!(list.remove_front(), Ok("b"));
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn empty_list_reports_and_changes_nothing() {
        let mut list: ChainList<i32> = ChainList::new();
        assert_eq!(list.remove_front(), Err(ChainListError::EmptyList));
        assert_eq!(list.remove_back(), Err(ChainListError::EmptyList));
        assert_eq!(list.remove_group(&[1]), Err(ChainListError::EmptyList));
        assert_eq!(list.search(&1), Err(ChainListError::EmptyList));
        assert_eq!(list.find(&1), list.end());
        assert_eq!(list.begin(), list.end());
        assert!(list.is_empty());
    }

    #[test]
    fn search_finds_first_occurrence() {
        let list: ChainList<_> = ["x", "y", "x"].into_iter().collect();
        let c = list.search(&"x").unwrap();
        assert_eq!(c, list.begin());
        assert_eq!(list.search(&"z"), Err(ChainListError::ValueNotFound));
        assert!(list.find(&"z").is_end());
        assert!(list.contains(&"y"));
        assert!(!list.contains(&"z"));
    }

    #[test]
    fn cursor_walk() {
        let list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let mut seen = Vec::new();
        let mut c = list.begin();
        while c != list.end() {
            seen.push(*list.get(c).unwrap());
            list.advance(&mut c).unwrap();
        }
        assert_eq!(seen, vec![1, 2, 3]);

        assert_eq!(list.advance(&mut c), Err(ChainListError::InvalidAdvance));
        assert!(c.is_end());
        assert_eq!(list.get(c), Err(ChainListError::EndPosition));
    }

    #[test]
    fn cursor_write_through() {
        let mut list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let c = list.search(&2).unwrap();
        *list.get_mut(c).unwrap() = 20;
        if let Some(front) = list.front_mut() {
            *front = 10;
        }
        assert_eq!(values(&list), vec![10, 20, 3]);
    }

    #[test]
    fn removed_node_invalidates_cursor() {
        let mut list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let mut c = list.search(&2).unwrap();
        list.remove_group(&[2]).unwrap();
        assert_eq!(list.get(c), Err(ChainListError::StaleCursor));
        assert_eq!(list.advance(&mut c), Err(ChainListError::StaleCursor));
        assert_eq!(c.as_raw(), Some(1));

        // ids are not reused
        let fresh = list.insert_front(2);
        assert_ne!(fresh, c);
        assert_eq!(list.get(c), Err(ChainListError::StaleCursor));
    }

    #[test]
    fn cursors_survive_unrelated_mutation() {
        let mut list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let c = list.search(&3).unwrap();
        list.remove_front().unwrap();
        list.insert_after(&2, 9).unwrap();
        assert_eq!(list.get(c), Ok(&3));
    }

    #[test]
    fn foreign_cursor_is_rejected() {
        let a: ChainList<_> = [1, 2].into_iter().collect();
        let b: ChainList<_> = [3, 4].into_iter().collect();
        let mut c = a.begin();
        assert_ne!(c, b.begin());
        assert_eq!(b.get(c), Err(ChainListError::ForeignCursor));
        assert_eq!(b.advance(&mut c), Err(ChainListError::ForeignCursor));
        assert_eq!(a.get(c), Ok(&1));
        assert_eq!(a.end(), b.end());
    }

    #[derive(Debug)]
    struct Tracked(usize, Rc<RefCell<Vec<usize>>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    fn tracked_list(log: &Rc<RefCell<Vec<usize>>>, n: usize) -> ChainList<Tracked> {
        let mut list = ChainList::new();
        for i in 0..n {
            list.insert_back(Tracked(i, log.clone()));
        }
        list
    }

    #[test]
    fn drop_runs_front_to_back() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let list = tracked_list(&log, 16);
        drop(list);
        assert_eq!(*log.borrow(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn clear_runs_front_to_back() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list = tracked_list(&log, 16);
        let c = list.begin();
        list.clear();
        assert_eq!(*log.borrow(), (0..16).collect::<Vec<_>>());
        assert_eq!(list.get(c).map(|t| t.0), Err(ChainListError::StaleCursor));

        // ids keep counting after a clear
        let fresh = list.insert_front(Tracked(99, log.clone()));
        assert_ne!(fresh, c);
    }

    #[test]
    fn iterators() {
        let mut list: ChainList<_> = (1..=4).collect();
        for v in list.iter_mut() {
            *v *= 10;
        }
        assert_eq!(list.iter().len(), 4);
        assert_eq!(values(&list), vec![10, 20, 30, 40]);

        let pairs: Vec<_> = list.cursors().map(|(c, v)| (list.get(c), *v)).collect();
        assert!(pairs.iter().all(|(got, v)| *got == Ok(v)));

        let owned: Vec<_> = list.into_iter().collect();
        assert_eq!(owned, vec![10, 20, 30, 40]);
    }

    #[test]
    fn extend_appends_in_order() {
        let mut list: ChainList<_> = [1].into_iter().collect();
        list.extend([2, 3]);
        list.extend(Vec::new());
        assert_eq!(values(&list), vec![1, 2, 3]);
    }

    #[test]
    fn clone_eq_debug_clear() {
        let mut list: ChainList<_> = [1, 2, 3].into_iter().collect();
        let c = list.search(&2).unwrap();
        let copy = list.clone();
        assert_eq!(copy, list);
        assert_eq!(copy.get(c), Ok(&2));
        assert_eq!(format!("{list:?}"), "[1, 2, 3]");

        list.clear();
        assert!(list.is_empty());
        assert_ne!(copy, list);
        assert_eq!(list.get(c), Err(ChainListError::StaleCursor));
    }
}

// proptest doesn't run under miri with default config
#[cfg(all(not(miri), test))]
mod proptests {
    use std::collections::VecDeque;

    use proptest::prelude::*;
    use proptest_state_machine::{ReferenceStateMachine, StateMachineTest};

    use super::*;

    proptest_state_machine::prop_state_machine! {
        #[test]
        fn chain_list_state_machine_test(sequential 1..200 => ChainList<u8>);
    }

    #[derive(Clone, Debug)]
    pub enum Transition {
        InsertFront(u8),
        InsertBack(u8),
        InsertAfter(u8, u8),
        InsertGroupAfter(u8, Vec<u8>),
        RemoveFront,
        RemoveBack,
        RemoveGroup(Vec<u8>),
    }

    pub struct ChainListStateMachine;

    fn small() -> impl Strategy<Value = u8> {
        0u8..8
    }

    impl ReferenceStateMachine for ChainListStateMachine {
        type State = VecDeque<u8>;
        type Transition = Transition;

        fn init_state() -> BoxedStrategy<Self::State> {
            Just(VecDeque::new()).boxed()
        }

        fn transitions(_state: &Self::State) -> BoxedStrategy<Self::Transition> {
            prop_oneof![
                2 => small().prop_map(Transition::InsertFront),
                2 => small().prop_map(Transition::InsertBack),
                2 => (small(), small()).prop_map(|(a, v)| Transition::InsertAfter(a, v)),
                1 => (small(), prop::collection::vec(small(), 0..4))
                    .prop_map(|(a, vs)| Transition::InsertGroupAfter(a, vs)),
                1 => Just(Transition::RemoveFront),
                1 => Just(Transition::RemoveBack),
                1 => prop::collection::vec(small(), 0..3).prop_map(Transition::RemoveGroup),
            ]
            .boxed()
        }

        fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
            match transition {
                Transition::InsertFront(v) => state.push_front(*v),
                Transition::InsertBack(v) => state.push_back(*v),
                Transition::InsertAfter(a, v) => {
                    if let Some(pos) = state.iter().position(|x| x == a) {
                        state.insert(pos + 1, *v);
                    }
                }
                Transition::InsertGroupAfter(a, vs) => {
                    if let Some(pos) = state.iter().position(|x| x == a) {
                        for (i, v) in vs.iter().enumerate() {
                            state.insert(pos + 1 + i, *v);
                        }
                    }
                }
                Transition::RemoveFront => {
                    state.pop_front();
                }
                Transition::RemoveBack => {
                    state.pop_back();
                }
                Transition::RemoveGroup(vs) => state.retain(|x| !vs.contains(x)),
            }
            state
        }
    }

    impl StateMachineTest for ChainList<u8> {
        type SystemUnderTest = Self;
        type Reference = ChainListStateMachine;

        fn init_test(
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) -> Self::SystemUnderTest {
            ChainList::new()
        }

        fn apply(
            mut state: Self::SystemUnderTest,
            _ref_state: &<Self::Reference as ReferenceStateMachine>::State,
            transition: Transition,
        ) -> Self::SystemUnderTest {
            match transition {
                Transition::InsertFront(v) => {
                    state.insert_front(v);
                }
                Transition::InsertBack(v) => {
                    state.insert_back(v);
                }
                Transition::InsertAfter(a, v) => {
                    let was_present = state.contains(&a);
                    assert_eq!(state.insert_after(&a, v).is_ok(), was_present);
                }
                Transition::InsertGroupAfter(a, vs) => {
                    let was_present = state.contains(&a);
                    assert_eq!(state.insert_group_after(&a, vs).is_ok(), was_present);
                }
                Transition::RemoveFront => {
                    let was_empty = state.is_empty();
                    assert_eq!(state.remove_front().is_err(), was_empty);
                }
                Transition::RemoveBack => {
                    let was_empty = state.is_empty();
                    assert_eq!(state.remove_back().is_err(), was_empty);
                }
                Transition::RemoveGroup(vs) => {
                    let before = state.len();
                    match state.remove_group(&vs) {
                        Ok(removed) => assert_eq!(state.len(), before - removed),
                        Err(e) => {
                            assert_eq!(e, ChainListError::EmptyList);
                            assert_eq!(before, 0);
                        }
                    }
                }
            }
            state
        }

        fn check_invariants(
            state: &Self::SystemUnderTest,
            ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        ) {
            assert_eq!(state.len(), ref_state.len());
            assert_eq!(state.nodes.len(), state.len());
            assert!(state.iter().eq(ref_state.iter()));
            assert_eq!(state.back(), ref_state.back());
        }
    }
}

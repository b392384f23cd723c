use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_LIST_TAG: AtomicUsize = AtomicUsize::new(1);

/// Allocate a tag identifying one list (and its clones) for cursor validation.
pub(crate) fn next_list_tag() -> usize {
    NEXT_LIST_TAG.fetch_add(1, Ordering::Relaxed)
}

/// A position in a [`ChainList`](crate::ChainList): either a node or the end position.
///
/// A cursor does not borrow the list. It is resolved against the list on each
/// access, so a cursor whose node has been removed is reported as
/// [`StaleCursor`](crate::ChainListError::StaleCursor) rather than dangling,
/// and a cursor issued by another list is reported as
/// [`ForeignCursor`](crate::ChainListError::ForeignCursor). Node ids are never
/// reused within a list.
///
/// All end positions compare equal, whichever list produced them.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub(crate) list: usize,
    pub(crate) node: Option<usize>,
}

impl Cursor {
    /// The canonical end position, referring to no node.
    pub const END: Cursor = Cursor {
        list: 0,
        node: None,
    };

    pub(crate) fn at(list: usize, node: Option<usize>) -> Self {
        match node {
            Some(_) => Cursor { list, node },
            None => Cursor::END,
        }
    }

    /// Is this the end position?
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// Returns the raw node identifier for debugging or external maps.
    pub fn as_raw(&self) -> Option<usize> {
        self.node
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        match (self.node, other.node) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b && self.list == other.list,
            _ => false,
        }
    }
}

impl Eq for Cursor {}

impl Hash for Cursor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
        if self.node.is_some() {
            self.list.hash(state);
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::END
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) id: usize,
    pub(crate) next: Option<usize>,
    pub(crate) value: T,
}

impl<T> Node<T> {
    pub(crate) fn new(id: usize, value: T, next: Option<usize>) -> Self {
        Node { id, next, value }
    }
}

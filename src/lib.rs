mod chain_list;
mod cursor;
mod errors;
mod node;
#[cfg(feature = "serde")]
mod serde_support;

pub use chain_list::{ChainList, Cursors, IntoIter, Iter, IterMut};
pub use cursor::Cursor;
pub use errors::{ChainListError, Result};

//! MapKey: the host contract for keys stored in a `LinkedTable`.

use core::hash::Hash;
use std::rc::Rc;

/// A key usable in an ordered table.
///
/// `Hash` and `Eq` must agree. Key types whose language-level equality
/// folds several representations into one (the numeric `-0`/`+0` pair under
/// SameValueZero) return the representative from `canonical`; the table
/// applies it before hashing, comparing or storing a key.
pub trait MapKey: Hash + Eq {
    /// The canonical replacement for `self`, or `None` when `self` is
    /// already canonical.
    #[inline]
    fn canonical(&self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

macro_rules! plain_keys {
    ($($t:ty),* $(,)?) => {
        $(impl MapKey for $t {})*
    };
}

plain_keys!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, (), String,
    Box<str>, Rc<str>, Vec<u8>,
);

impl MapKey for &str {}

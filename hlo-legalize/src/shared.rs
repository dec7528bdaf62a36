use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use std::sync::Arc;
use std::sync::Weak;

/// A convenience type alias for [Arc<RwLock<T>>].
///
/// # Example
///
/// ```
/// use hlo_legalize::shared::Shared;
/// use hlo_legalize::shared::SharedExt;
///
/// let lock: Shared<i32> = Shared::new(42.into());
/// assert_eq!(*lock.rd(), 42);
/// ```
pub type Shared<T> = Arc<RwLock<T>>;

/// Non-owning counterpart of [Shared].
///
/// Used for back-pointers (parent blocks, defining ops) so that the IR tree
/// does not form reference cycles.
pub type WeakShared<T> = Weak<RwLock<T>>;

/// A convenience trait around [RwLock].
///
/// One-liners such as `op.rd().name()` release the guard at the end of the
/// statement, which keeps lock scopes short.
///
/// The IR is only ever touched from one thread, so a lock that is already
/// held means that a guard leaked. Both methods therefore panic instead of
/// blocking forever.
pub trait SharedExt<T: ?Sized> {
    /// Convenience method for reading.
    fn rd(&self) -> RwLockReadGuard<'_, T>;
    /// Convenience method for writing.
    fn wr(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T: ?Sized> SharedExt<T> for Shared<T> {
    fn rd(&self) -> RwLockReadGuard<'_, T> {
        match self.try_read() {
            Some(guard) => guard,
            None => panic!("IR node is already locked for writing"),
        }
    }
    fn wr(&self) -> RwLockWriteGuard<'_, T> {
        match self.try_write() {
            Some(guard) => guard,
            None => panic!("IR node is already locked"),
        }
    }
}

#[test]
fn test_shared() {
    let lock: Shared<i32> = Shared::new(42.into());
    assert_eq!(*lock.rd(), 42);
    *lock.wr() = 43;
    assert_eq!(*lock.rd(), 43);
}

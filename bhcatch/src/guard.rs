// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Scope-exit cleanup, for the cases where a full [`Attempt`][crate::Attempt] is not needed.
//!
//! A [`FinallyGuard`] ties a cleanup closure to the end of the enclosing scope, so the cleanup
//! runs on the normal exit and on the unwinding exit alike.
//!
//! Note that a cleanup which panics while a fault is already unwinding aborts the process; keep
//! guard cleanups infallible, or use [`Attempt::finally`][crate::Attempt::finally] which runs the
//! cleanup outside of the unwind.

/// Runs the given cleanup when the returned guard goes out of scope.
///
/// # Examples
///
/// ```
/// let mut released = false;
/// {
///     let _guard = bhcatch::guard::defer(|| released = true);
///     // work with the resource
/// }
/// assert!(released);
/// ```
pub fn defer<F>(cleanup: F) -> FinallyGuard<F>
where
    F: FnOnce(),
{
    FinallyGuard {
        cleanup: Some(cleanup),
    }
}

/// Guard running its cleanup exactly once when dropped, unless [disarmed][FinallyGuard::disarm].
pub struct FinallyGuard<F>
where
    F: FnOnce(),
{
    cleanup: Option<F>,
}

impl<F> FinallyGuard<F>
where
    F: FnOnce(),
{
    /// Consumes the guard without running the cleanup.
    ///
    /// Use this when the cleanup is only meant for the early exit paths and the happy path takes
    /// over the resource.
    pub fn disarm(mut self) {
        self.cleanup = None;
    }
}

impl<F> Drop for FinallyGuard<F>
where
    F: FnOnce(),
{
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

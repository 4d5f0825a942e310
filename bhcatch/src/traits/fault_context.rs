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

/// Extension trait for providing additional context to faults within [`crate::Result`].
///
/// This trait is implemented for the [`crate::Result`] type, to provide functionality for adding
/// the additional contexts to the [`crate::Fault`].  The faults stay the same, but are enriched
/// with additional explanations of what was being attempted.
pub trait FaultContext<T> {
    /// Additional context is added to the [Err] variant, while the rest remains untouched.
    ///
    /// The context is lazily evaluated.
    fn ctx<C, F>(self, f: F) -> crate::Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> FaultContext<T> for crate::Result<T> {
    fn ctx<C, F>(self, f: F) -> crate::Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|fault| fault.ctx(f()))
    }
}

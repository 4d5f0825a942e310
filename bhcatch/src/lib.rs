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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides structured handling of panics, used whenever our Rust code has to survive
//! a fault raised by code it does not control.
//!
//! A captured panic is wrapped into an opaque [`Fault`] value.  Faults are automatically logged as
//! warnings when captured.  Faults can carry extra context, and are repropagated with the original
//! payload intact.
//!
//! # Details
//!
//! The main entry point is the [`Attempt`] builder, which runs a *try block* with an optional
//! *catch hook* and an optional *finally block*:
//!
//! * The try block is always executed first.
//! * If the try block raises a fault, the catch hook is invoked with the captured [`Fault`] and
//!   decides its [`Disposition`]: whether the fault is repropagated to the caller or suppressed.
//!   Without a catch hook, every fault is repropagated.
//! * The finally block runs exactly once on every exit path, after the catch decision is made and
//!   before control returns, whether the return is normal or a repropagated fault.
//!
//! [`Attempt::run`] reports the non-unwinding exits through [`Outcome`]: the try block's value on
//! success, or the suppressed [`Fault`] if the catch hook discarded it.
//!
//! For the cases where only capturing is needed, the [`catch`] function converts a panicking call
//! into a [`Result`].  The [`guard`] module offers scope-exit cleanup independent of [`Attempt`].
//!
//! Two policies apply to faults raised by the hooks themselves:
//!
//! * A fault raised by the catch hook supersedes the original fault and is repropagated; the
//!   finally block still runs first.
//! * A fault raised by the finally block supersedes whatever outcome was pending and propagates
//!   to the caller.
//!
//! The crate relies on unwinding panics; it is not usable under `panic = "abort"`.
//!
//! # Examples
//!
//! ```
//! use bhcatch::{Attempt, Disposition};
//!
//! let mut attempts = 0;
//! let mut connection_closed = false;
//!
//! let outcome = Attempt::new(|| {
//!     attempts += 1;
//!     if attempts < 2 {
//!         panic!("connection reset");
//!     }
//!     attempts
//! })
//! .catch(|fault| {
//!     // Faults we do not recognize must keep propagating.
//!     if fault.message() == Some("connection reset") {
//!         Disposition::Suppress
//!     } else {
//!         Disposition::Rethrow
//!     }
//! })
//! .finally(|| connection_closed = true)
//! .run();
//!
//! assert!(connection_closed);
//! assert!(outcome.suppressed().is_some());
//! ```

use std::{
    any::Any,
    panic::{AssertUnwindSafe, Location},
};

use crate::traits::loggable::Warnable;

pub mod adapters;
mod display;
pub mod guard;
pub mod traits;

/// A fault captured from a panicking block of code.
///
/// The panic payload is kept unexamined, so that a repropagated fault is indistinguishable from
/// the original panic.  Inspection is offered on a best-effort basis through [`Fault::message`]
/// and [`Fault::downcast_ref`].
///
/// Additional context describing what was being attempted can be attached with [`Fault::ctx`].
pub struct Fault {
    payload: Box<dyn Any + Send>,
    /// The optional context of the fault.
    context: Vec<Box<dyn std::fmt::Display + Send + Sync>>,
}

/// The [`std::result::Result`] wrapper with a captured [`Fault`] as the error value.
pub type Result<T> = std::result::Result<T, Fault>;

impl Fault {
    /// Wraps a raw panic payload.
    ///
    /// The method should stay private; faults enter the system only through [`catch`] or
    /// [`Attempt::run`], which also log them.
    fn new(payload: Box<dyn Any + Send>) -> Self {
        Self {
            payload,
            context: Vec::new(),
        }
    }

    /// Returns the panic message, if the payload is one of the string types produced by the
    /// standard `panic!` macro.
    ///
    /// Payloads raised via [`std::panic::panic_any`] with a non-string type yield [`None`]; use
    /// [`Fault::downcast_ref`] for those.
    pub fn message(&self) -> Option<&str> {
        if let Some(message) = self.payload.downcast_ref::<&'static str>() {
            Some(message)
        } else {
            self.payload.downcast_ref::<String>().map(String::as_str)
        }
    }

    /// Tries downcasting the panic payload to a concrete type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Adds additional context to the fault and returns it.  It should be used to enrich the
    /// fault with further explanations of what was being attempted.
    ///
    /// The method takes ownership of `self` so that the method can be chained.
    ///
    /// Context can be added multiple times and all the contexts will be saved to the fault.
    pub fn ctx<C>(mut self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.context.push(Box::new(context));
        self
    }

    /// Consumes the fault, returning the raw panic payload.
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }

    /// Repropagates the fault to the caller, unwinding with the original panic payload.
    ///
    /// Attached context is dropped; the payload is exactly the one the try block raised.
    pub fn resume(self) -> ! {
        std::panic::resume_unwind(self.payload)
    }
}

// Make the Fault a std::error::Error type, so it composes with Result-based flows.
impl std::error::Error for Fault {}

/// Runs `try_block`, capturing a raised fault into the [`Err`] variant.
///
/// A captured fault is logged as a warning.  The try block is consumed exactly once; state it
/// shares with the caller may be observed mid-update if a fault is raised, which is why the
/// unwind-safety of the block is asserted rather than required.
#[track_caller]
pub fn catch<T, R>(try_block: T) -> Result<R>
where
    T: FnOnce() -> R,
{
    let location = *Location::caller();

    std::panic::catch_unwind(AssertUnwindSafe(try_block))
        .map_err(Fault::new)
        .log_warn(location)
}

/// The catch hook's decision on what happens to a captured [`Fault`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The fault must be repropagated to the caller after the finally block has run.
    Rethrow,
    /// The fault is discarded; the caller observes a normal return.
    Suppress,
}

impl Disposition {
    /// Whether this decision repropagates the fault.
    pub fn is_rethrow(self) -> bool {
        matches!(self, Self::Rethrow)
    }
}

/// The non-unwinding exits of [`Attempt::run`].
///
/// A repropagated fault is not an [`Outcome`]; it leaves [`Attempt::run`] by unwinding.
#[derive(Debug)]
pub enum Outcome<R> {
    /// The try block completed and produced a value.
    Completed(R),
    /// The try block raised a fault and the catch hook suppressed it.
    Suppressed(Fault),
}

impl<R> Outcome<R> {
    /// Returns the try block's value, or [`None`] if a fault was suppressed.
    pub fn value(self) -> Option<R> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Suppressed(_) => None,
        }
    }

    /// Returns the suppressed fault, if any.
    pub fn suppressed(&self) -> Option<&Fault> {
        match self {
            Self::Completed(_) => None,
            Self::Suppressed(fault) => Some(fault),
        }
    }

    /// Converts the outcome into a [`Result`], turning a suppressed fault back into an error
    /// value.
    pub fn into_result(self) -> Result<R> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Suppressed(fault) => Err(fault),
        }
    }
}

/// Builder running a try block with an optional catch hook and an optional finally block.
///
/// Construct it with [`Attempt::new`], optionally attach hooks with [`Attempt::catch`] and
/// [`Attempt::finally`], then execute with [`Attempt::run`].
pub struct Attempt<'a, T> {
    try_block: T,
    catch_hook: Option<Box<dyn FnOnce(&Fault) -> Disposition + 'a>>,
    finally_block: Option<Box<dyn FnOnce() + 'a>>,
    location: Location<'static>,
}

impl<'a, T> Attempt<'a, T> {
    /// Creates an attempt around the given try block, with no catch hook and no finally block.
    ///
    /// Without further configuration, [`Attempt::run`] behaves exactly like calling the block
    /// directly, except that a raised fault is logged as a warning before it propagates.
    #[track_caller]
    pub fn new<R>(try_block: T) -> Self
    where
        T: FnOnce() -> R,
    {
        Self {
            try_block,
            catch_hook: None,
            finally_block: None,
            location: *Location::caller(),
        }
    }

    /// Attaches the catch hook deciding the [`Disposition`] of a captured fault.
    ///
    /// Without a hook every fault is repropagated, so attach one only to suppress faults or to
    /// inspect them before they continue unwinding.
    pub fn catch<C>(mut self, hook: C) -> Self
    where
        C: FnOnce(&Fault) -> Disposition + 'a,
    {
        self.catch_hook = Some(Box::new(hook));
        self
    }

    /// Attaches the finally block.
    ///
    /// The block runs exactly once on every exit path of [`Attempt::run`], after the catch
    /// decision and before control returns to the caller.
    pub fn finally<F>(mut self, cleanup: F) -> Self
    where
        F: FnOnce() + 'a,
    {
        self.finally_block = Some(Box::new(cleanup));
        self
    }

    /// Executes the attempt.
    ///
    /// Runs the try block; on a fault, captures it, logs a warning, and asks the catch hook for
    /// its [`Disposition`] (repropagate when no hook is attached).  The finally block then runs,
    /// and finally the fault unwinds out of this call if it was not suppressed.
    ///
    /// A fault raised by the catch hook itself supersedes the original fault and is repropagated;
    /// a fault raised by the finally block supersedes whatever outcome was pending.
    ///
    /// A repropagated fault unwinds with the raw panic payload only, as with [`Fault::resume`];
    /// context attached to a suppressed [`Fault`] is likewise dropped if the fault is later
    /// resumed manually.
    pub fn run<R>(self) -> Outcome<R>
    where
        T: FnOnce() -> R,
    {
        let Self {
            try_block,
            catch_hook,
            finally_block,
            location,
        } = self;

        let pending = match std::panic::catch_unwind(AssertUnwindSafe(try_block)) {
            Ok(value) => Ok(value),
            Err(payload) => {
                let fault = Fault::new(payload).log_warn(location);

                Err(match catch_hook {
                    Some(hook) => {
                        match std::panic::catch_unwind(AssertUnwindSafe(|| hook(&fault))) {
                            Ok(decision) => (fault, decision),
                            // The hook's own fault supersedes the original one.
                            Err(hook_payload) => (
                                Fault::new(hook_payload).log_warn(location),
                                Disposition::Rethrow,
                            ),
                        }
                    }
                    None => (fault, Disposition::Rethrow),
                })
            }
        };

        // Invoked directly rather than through a drop guard: a panicking cleanup then supersedes
        // the pending outcome instead of aborting the process mid-unwind.
        if let Some(cleanup) = finally_block {
            cleanup();
        }

        match pending {
            Ok(value) => Outcome::Completed(value),
            Err((fault, Disposition::Suppress)) => Outcome::Suppressed(fault),
            Err((fault, Disposition::Rethrow)) => fault.resume(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::AssertUnwindSafe,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn repropagated_message<R>(attempt: Attempt<'_, impl FnOnce() -> R>) -> String {
        let payload = std::panic::catch_unwind(AssertUnwindSafe(|| attempt.run()))
            .err()
            .expect("the fault should have been repropagated");

        Fault::new(payload)
            .message()
            .expect("the panic payload should be a string")
            .to_owned()
    }

    #[test]
    fn test_completed_without_hooks() {
        let outcome = Attempt::new(|| 42).run();

        assert!(matches!(outcome, Outcome::Completed(42)));
    }

    #[test]
    fn test_finally_runs_once_on_success() {
        let cleanups = AtomicUsize::new(0);

        let outcome = Attempt::new(|| "done")
            .finally(|| {
                cleanups.fetch_add(1, Ordering::SeqCst);
            })
            .run();

        assert_eq!(outcome.value(), Some("done"));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fault_repropagates_without_catch_hook() {
        let message = repropagated_message(Attempt::new(|| panic!("boom")));

        assert_eq!(message, "boom");
    }

    #[test]
    fn test_finally_runs_once_before_default_repropagation() {
        let cleanups = AtomicUsize::new(0);

        let attempt = Attempt::new(|| panic!("boom")).finally(|| {
            cleanups.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(repropagated_message(attempt), "boom");
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_suppressed_fault_with_finally() {
        let cleanups = AtomicUsize::new(0);

        let outcome = Attempt::new(|| panic!("boom"))
            .catch(|_| Disposition::Suppress)
            .finally(|| {
                cleanups.fetch_add(1, Ordering::SeqCst);
            })
            .run();

        let fault = outcome
            .suppressed()
            .expect("the fault should have been suppressed");
        assert_eq!(fault.message(), Some("boom"));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rethrow_decision_runs_finally_first() {
        let cleanups = AtomicUsize::new(0);

        let attempt = Attempt::new(|| panic!("boom"))
            .catch(|_| Disposition::Rethrow)
            .finally(|| {
                cleanups.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(repropagated_message(attempt), "boom");
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_catch_hook_sees_the_fault() {
        let observed = std::sync::Mutex::new(None);

        Attempt::new(|| panic!("observed message"))
            .catch(|fault| {
                *observed.lock().unwrap() = fault.message().map(ToOwned::to_owned);
                Disposition::Suppress
            })
            .run();

        assert_eq!(
            observed.lock().unwrap().as_deref(),
            Some("observed message")
        );
    }

    #[test]
    fn test_hook_fault_supersedes_original() {
        let cleanups = AtomicUsize::new(0);

        let attempt = Attempt::new(|| panic!("original"))
            .catch(|_| -> Disposition { panic!("hook fault") })
            .finally(|| {
                cleanups.fetch_add(1, Ordering::SeqCst);
            });

        assert_eq!(repropagated_message(attempt), "hook fault");
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finally_fault_supersedes_suppression() {
        let attempt = Attempt::new(|| panic!("original"))
            .catch(|_| Disposition::Suppress)
            .finally(|| panic!("cleanup fault"));

        assert_eq!(repropagated_message(attempt), "cleanup fault");
    }

    #[test]
    fn test_finally_fault_supersedes_normal_return() {
        let attempt = Attempt::new(|| 42).finally(|| panic!("cleanup fault"));

        assert_eq!(repropagated_message(attempt), "cleanup fault");
    }

    #[test]
    fn test_finally_fault_supersedes_pending_rethrow() {
        let attempt = Attempt::new(|| panic!("original")).finally(|| panic!("cleanup fault"));

        assert_eq!(repropagated_message(attempt), "cleanup fault");
    }

    #[test]
    fn test_catch_captures_value() {
        let result = catch(|| 7);

        assert_eq!(result.ok(), Some(7));
    }

    #[test]
    fn test_catch_captures_fault() {
        let fault = catch(|| -> () { panic!("boom") }).unwrap_err();

        assert_eq!(fault.message(), Some("boom"));
    }

    #[test]
    fn test_catch_captures_formatted_message() {
        let fault = catch(|| -> () { panic!("boom {}", 5) }).unwrap_err();

        assert_eq!(fault.message(), Some("boom 5"));
    }

    #[test]
    fn test_non_string_payload() {
        let fault = catch(|| std::panic::panic_any(7_i32)).unwrap_err();

        assert_eq!(fault.message(), None);
        assert_eq!(fault.downcast_ref::<i32>(), Some(&7));
    }

    #[test]
    fn test_resume_preserves_payload() {
        let fault = catch(|| std::panic::panic_any(7_i32)).unwrap_err();

        let payload = std::panic::catch_unwind(AssertUnwindSafe(|| fault.resume()))
            .err()
            .expect("resume should unwind");

        assert_eq!(payload.downcast_ref::<i32>(), Some(&7));
    }

    #[test]
    fn test_ctx() {
        let fault = catch(|| -> () { panic!("boom") })
            .unwrap_err()
            .ctx("first context")
            .ctx("second context");

        let ctx_vec: Vec<String> = fault.context.iter().map(ToString::to_string).collect();
        assert!(ctx_vec.contains(&String::from("first context")));
        assert!(ctx_vec.contains(&String::from("second context")));
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::Completed(1).into_result().ok(), Some(1));

        let fault = catch(|| -> () { panic!("boom") }).unwrap_err();
        let result = Outcome::<i32>::Suppressed(fault).into_result();
        assert_eq!(result.unwrap_err().message(), Some("boom"));
    }

    #[test]
    fn test_disposition_is_rethrow() {
        assert!(Disposition::Rethrow.is_rethrow());
        assert!(!Disposition::Suppress.is_rethrow());
    }
}

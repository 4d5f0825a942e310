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

//! [`Fault`] adapter for the [axum] web framework.
//!
//! When a handler runs untrusted logic under [`Attempt`][crate::Attempt] or
//! [`catch`][crate::catch], a suppressed [`Fault`] can be returned directly as an
//! [`axum::response::Response`].

pub use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::Fault;

// The panic payload may carry internal details, so the response body never echoes it.  The fault
// has already been logged at the capture site.
impl IntoResponse for Fault {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}

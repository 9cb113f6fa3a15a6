// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod session;
pub mod task;
pub mod user;

pub use session::SessionDoc;
pub use task::Task;
pub use user::{Role, User, UserProfile};

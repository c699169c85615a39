// SPDX-FileCopyrightText: 2026 Hantar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for database operations.

pub mod blasts;
pub mod messages;
pub mod sessions;

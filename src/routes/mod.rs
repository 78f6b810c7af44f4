//! Routing, split by access level.
//!
//! Public routes carry no layer. Everything else sits behind the
//! `authenticate` route layer; admin-only handlers additionally take
//! `AdminUser` as their first argument.

/// Health and the sign-up / sign-in pair.
pub mod public;

/// Users, books and book reviews. Requires a valid access token.
pub mod authenticated;

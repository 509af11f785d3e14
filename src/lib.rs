//! Counter API for a personal site.
//!
//! Two small features share one pattern: resolve an identity, check
//! eligibility against the store, then record the action. Endorsements are
//! deduplicated per authenticated user and skill; shares are quota-limited
//! per anonymous browser session and content slug. All state lives in
//! SQLite, which is also the final arbiter of the uniqueness invariant.
pub mod database;
pub mod identity;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

//! Keeps a local folder of GameBanana mods in sync with the site's catalog.
//!
//! [`sync::SyncSession`] ties the pieces together: it pages through the catalog,
//! fetches file lists for mods that changed since the last run, downloads them and
//! records what was synced in a JSON state file.

pub mod api;
pub mod commands;
pub mod models;
pub mod sync;
pub mod utils;

//! Marvelverse - a catalog of Marvel characters, comics and series
//!
//! Public pages list and describe catalog entries. Signed-in users comment
//! (subject to moderation), keep favorites and manage a small profile.
//! Admins curate the catalog through a JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;

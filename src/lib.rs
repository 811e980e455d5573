//! Core of the posterbox display daemon: pairing over a shared record
//! store, the now-playing sync loop, and the deterministic poster layout
//! engine. The binary wires these against the real cloud store, catalog,
//! and display surface; tests wire them against in-memory fakes.

pub mod cache;
pub mod catalog;
pub mod cloud;
pub mod config;
pub mod pairing;
pub mod poster;
pub mod surface;
pub mod sync;

mod utils;

#[cfg(test)]
pub(crate) mod testutil;

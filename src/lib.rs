//! Library crate for waitup: wait for a host to accept TCP connections, then optionally connect.
pub mod config;
pub mod error;
pub mod handoff;
pub mod output;
pub mod poll;
pub mod probe;
pub mod validate;

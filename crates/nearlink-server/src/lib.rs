//! # nearlink-server
//!
//! HTTP daemon library for nearlink.
//!
//! This library provides the API handlers and state management for
//! `nearlinkd`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;

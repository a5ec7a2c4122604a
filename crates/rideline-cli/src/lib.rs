//! # rideline-cli
//!
//! Command line front end for the rideline core library.
//!
//! This library provides the argument parsing, command handlers and logging
//! setup used by the `rideline` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod cli;
pub mod logging;

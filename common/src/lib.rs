//! # netsweep-common
//!
//! Shared vocabulary of the scanner: the data model the engine produces, the
//! configuration it consumes and the parsing of user supplied targets and ports.
//!
//! Nothing in this crate performs network I/O except the local interface
//! lookup behind the `lan` target keyword.

pub mod config;
pub mod error;
pub mod event;
pub mod network;
pub mod progress;

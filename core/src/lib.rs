//! # netsweep-core
//!
//! The scanning engine. A [`scanner::ScanCoordinator`] expands targets, runs
//! host discovery and port probing through bounded worker pools and reports
//! everything it learns as [`netsweep_common::event::ScanEvent`]s.

pub mod error;
pub mod network;
pub mod pool;
pub mod probe;
pub mod scanner;

pub use scanner::ScanCoordinator;

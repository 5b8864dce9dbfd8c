//! cfbench - benchmark client layer over column-family key/value engines
//!
//! Tables map onto engine namespaces (column families) created on first
//! use; one reference-counted engine session is shared by every client
//! thread; records travel through a length-prefixed binary codec.

pub mod cli;
pub mod client;
pub mod codec;
pub mod engine;
pub mod observability;
pub mod session;
pub mod workload;

//! # jar-shrinker
//!
//! Shrinks a Java archive to the classes reachable from a list of entry
//! classes by following `Class` constant-pool references between class files.
//!
//! ## Architecture
//!
//! - **pool**: Constant-pool decoding of raw class-file bytes
//! - **names**: Binary class names, nested-class chains and on-disk paths
//! - **closure**: Worklist traversal computing the reachable class set
//! - **extract**: Content-addressed extraction of the input jar
//! - **stage**: Copying reachable classes and packing the output jar
//! - **error**: Named failures of extraction, staging and packing
//! - **config**: Workspace and output path resolution
//! - **cli**: Command-line definition

pub mod cli;
pub mod closure;
pub mod config;
pub mod error;
pub mod extract;
pub mod names;
pub mod pool;
pub mod stage;

//! # Savable Testkit
//!
//! Test utilities for Savable.
//!
//! This crate provides:
//! - One throwaway store per engine ([`TestStore`], [`all_engines`])
//! - Property-based generators for rows and filter chains
//! - Cross-engine equivalence checks against an in-memory reference model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use savable_testkit::prelude::*;
//!
//! #[test]
//! fn test_on_every_engine() {
//!     for_each_engine(|store| {
//!         let meta = store.object_meta();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod equivalence;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::equivalence::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use equivalence::*;
pub use fixtures::*;
pub use generators::*;

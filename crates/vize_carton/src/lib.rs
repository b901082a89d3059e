//! Carton - The artist's toolbox for Vize.
//!
//! This crate provides the foundational utilities and data structures shared by
//! the Vize crates, much like a carton (artist's portfolio case) holds all the
//! essential tools and materials an artist needs for their work.
//!
//! # Modules
//!
//! - **Source ranges**: byte offset ranges used by every position mapping
//! - **Stamps**: cheap identity values for identity-keyed caches
//!
//! # Example
//!
//! ```
//! use vize_carton::{SourceRange, Stamp};
//!
//! let range = SourceRange::at(2, 1);
//! assert!(range.contains(2));
//! assert!(!range.contains(3));
//!
//! let a = Stamp::fresh();
//! let b = Stamp::fresh();
//! assert_ne!(a, b);
//! ```

pub mod source_range;
pub mod stamp;

pub use source_range::SourceRange;
pub use stamp::Stamp;

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export bitflags for flag types
pub use bitflags::bitflags;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

/// Insertion outcomes and table errors.
pub mod error;

mod flags;

/// A map facade over the table.
///
/// This module provides a `HashMap` that wraps a map-personality
/// `HashTable` with a standard key-value interface.
pub mod hash_map;

/// A set facade over the table.
///
/// This module provides a `HashSet` that wraps a set-personality `HashTable`
/// with a standard set interface plus in-place set algebra.
pub mod hash_set;

pub mod hash_table;

pub mod hashing;

pub use error::Insertion;
pub use error::TableError;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hashing::KeyHashing;

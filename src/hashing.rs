//! Hashing and equality capabilities consumed by the table.
//!
//! A table is parameterized by a [`KeyHashing`] implementation. Two flavors
//! are provided:
//!
//! - fixed hashing, chosen by type and monomorphized into the table
//!   ([`BuildHashing`], [`IntHashing`], [`StrHashing`]);
//! - per-instance hashing, where every table carries its own pair of function
//!   pointers ([`FnHashing`]).
//!
//! The contract is the usual one: keys that compare equal must hash equal.
//! Hash quality only affects probe length, never correctness.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

/// Hash and equality functions for keys of type `K`.
pub trait KeyHashing<K> {
    /// Hashes `key`.
    fn hash(&self, key: &K) -> u64;

    /// Returns `true` if both keys are equal.
    fn equals(&self, lhs: &K, rhs: &K) -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used by [`DefaultHashing`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used by [`DefaultHashing`].
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}

/// Fixed hashing backed by the default hasher builder.
#[cfg(any(feature = "foldhash", feature = "std"))]
pub type DefaultHashing = BuildHashing<DefaultHashBuilder>;

/// Fixed hashing through a [`BuildHasher`] for keys implementing
/// `Hash + Eq`.
#[derive(Debug, Clone, Default)]
pub struct BuildHashing<S> {
    hash_builder: S,
}

impl<S> BuildHashing<S> {
    /// Wraps a hasher builder.
    pub fn new(hash_builder: S) -> Self {
        Self { hash_builder }
    }

    /// Returns the wrapped hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<K, S> KeyHashing<K> for BuildHashing<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn equals(&self, lhs: &K, rhs: &K) -> bool {
        lhs == rhs
    }
}

/// Per-instance hashing through plain function pointers.
///
/// Two tables of the same type may hash the same key type differently.
pub struct FnHashing<K> {
    hash: fn(&K) -> u64,
    equals: fn(&K, &K) -> bool,
}

impl<K> FnHashing<K> {
    /// Pairs a hash function with an equality function.
    pub fn new(hash: fn(&K) -> u64, equals: fn(&K, &K) -> bool) -> Self {
        Self { hash, equals }
    }
}

impl<K> Clone for FnHashing<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for FnHashing<K> {}

impl<K> Debug for FnHashing<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnHashing")
            .field("hash", &(self.hash as *const ()))
            .field("equals", &(self.equals as *const ()))
            .finish()
    }
}

impl<K> KeyHashing<K> for FnHashing<K> {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equals(&self, lhs: &K, rhs: &K) -> bool {
        (self.equals)(lhs, rhs)
    }
}

/// Identity hashing for primitive integers.
///
/// Cheap and good enough for dense or random integer keys; triangular
/// probing spreads collisions of clustered keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntHashing;

macro_rules! int_hashing {
    ($($t:ty),*) => {
        $(
            impl KeyHashing<$t> for IntHashing {
                #[inline]
                fn hash(&self, key: &$t) -> u64 {
                    int_hash(*key as u64)
                }

                #[inline]
                fn equals(&self, lhs: &$t, rhs: &$t) -> bool {
                    lhs == rhs
                }
            }
        )*
    };
}

int_hashing!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// X31 hashing for string keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrHashing;

impl<K> KeyHashing<K> for StrHashing
where
    K: AsRef<str>,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        str_hash(key.as_ref())
    }

    #[inline]
    fn equals(&self, lhs: &K, rhs: &K) -> bool {
        lhs.as_ref() == rhs.as_ref()
    }
}

/// Hashes an integer by casting it.
#[inline]
pub fn int_hash(key: u64) -> u64 {
    key
}

/// X31 string hash: `h = h * 31 + byte` over the bytes of `key`.
///
/// The empty string hashes to 0.
#[inline]
pub fn str_hash(key: &str) -> u64 {
    let mut bytes = key.bytes();
    let Some(first) = bytes.next() else {
        return 0;
    };
    bytes.fold(first as u64, |h, b| {
        (h << 5).wrapping_sub(h).wrapping_add(b as u64)
    })
}

/// Hashes a pointer by its address.
#[inline]
pub fn ptr_hash<T: ?Sized>(ptr: *const T) -> u64 {
    int_hash(ptr.cast::<()>() as usize as u64)
}

/// Combines two hashes into one, e.g. to hash a pair of keys.
#[inline]
pub fn combine_hash(h1: u64, h2: u64) -> u64 {
    (h1 ^ h2)
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(h1 << 12)
        .wrapping_add(h2 >> 4)
}

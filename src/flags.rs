//! Packed per-bucket state.
//!
//! Each bucket carries two bits, sixteen buckets per `u32` word. Bit 1 marks
//! an empty bucket, bit 0 a tombstone; a live bucket has both bits cleared.
//! Compared to one byte per bucket this saves roughly a byte per entry.

use alloc::vec::Vec;

use crate::error::TableError;

const EMPTY_BIT: u32 = 0b10;
const DELETED_BIT: u32 = 0b01;
const BOTH_BITS: u32 = 0b11;

/// A word with every bucket marked empty.
const ALL_EMPTY: u32 = 0xAAAA_AAAA;

/// State of a single bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketState {
    /// Never used since the last clear or rehash.
    Empty,
    /// Tombstone left behind by a removal.
    Deleted,
    /// Holds an initialized key (and value).
    Live,
}

#[inline(always)]
fn word(index: usize) -> usize {
    index >> 4
}

#[inline(always)]
fn shift(index: usize) -> u32 {
    ((index & 0xF) << 1) as u32
}

#[inline(always)]
fn words_for(buckets: usize) -> usize {
    if buckets == 0 {
        0
    } else if buckets < 16 {
        1
    } else {
        buckets >> 4
    }
}

pub(crate) struct Flags {
    words: Vec<u32>,
}

impl Flags {
    pub(crate) const fn new() -> Self {
        Flags { words: Vec::new() }
    }

    /// Allocates flags for `buckets` buckets, all of them empty.
    pub(crate) fn try_all_empty(buckets: usize) -> Result<Self, TableError> {
        let len = words_for(buckets);
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|_| TableError::AllocationFailed { buckets })?;
        words.resize(len, ALL_EMPTY);
        Ok(Flags { words })
    }

    pub(crate) fn try_clone(&self, buckets: usize) -> Result<Self, TableError> {
        let mut words = Vec::new();
        words
            .try_reserve_exact(self.words.len())
            .map_err(|_| TableError::AllocationFailed { buckets })?;
        words.extend_from_slice(&self.words);
        Ok(Flags { words })
    }

    #[inline(always)]
    fn bits(&self, index: usize) -> u32 {
        (self.words[word(index)] >> shift(index)) & BOTH_BITS
    }

    #[inline(always)]
    pub(crate) fn state(&self, index: usize) -> BucketState {
        match self.bits(index) {
            0 => BucketState::Live,
            DELETED_BIT => BucketState::Deleted,
            _ => BucketState::Empty,
        }
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self, index: usize) -> bool {
        self.bits(index) & EMPTY_BIT != 0
    }

    #[inline(always)]
    pub(crate) fn is_live(&self, index: usize) -> bool {
        self.bits(index) == 0
    }

    #[inline(always)]
    pub(crate) fn set_live(&mut self, index: usize) {
        self.words[word(index)] &= !(BOTH_BITS << shift(index));
    }

    /// Turns a live bucket into a tombstone.
    #[inline(always)]
    pub(crate) fn set_deleted(&mut self, index: usize) {
        debug_assert!(self.is_live(index));
        self.words[word(index)] |= DELETED_BIT << shift(index);
    }

    /// Marks every bucket empty without touching the allocation.
    pub(crate) fn clear(&mut self) {
        self.words.fill(ALL_EMPTY);
    }

    /// Bytes held by the flag words.
    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.words.capacity() * core::mem::size_of::<u32>()
    }
}

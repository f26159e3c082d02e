//! The open-addressing engine shared by [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet).
//!
//! Buckets live in three parallel arrays: packed 2-bit flags, keys and
//! values. Lookups probe triangularly from `hash & (capacity - 1)`, removals
//! leave tombstones, and the table is resized (grown, or compacted in place
//! to drop tombstones) lazily from `put` whenever the number of occupied
//! buckets reaches the load limit.
//!
//! Most users want the typed facades. The table itself exposes the
//! index-based API those facades are built on: every bucket has a stable
//! index until the next resize, and `get`/`put` report that index.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::mem::MaybeUninit;

use crate::error::Insertion;
use crate::error::TableError;
use crate::flags::BucketState;
use crate::flags::Flags;
use crate::hashing::KeyHashing;

/// Maximum ratio of occupied (live or tombstoned) buckets to buckets.
pub const MAX_LOAD: f64 = 0.77;

/// Smallest non-zero bucket count.
pub const MIN_CAPACITY: usize = 4;

/// Number of buckets that may be occupied before `put` resizes.
#[inline(always)]
pub fn upper_bound(capacity: usize) -> usize {
    (capacity as f64 * MAX_LOAD + 0.5) as usize
}

/// Whether a full table should be rehashed at the same size rather than
/// grown. Sparse tables full of tombstones are compacted.
#[inline(always)]
fn prefers_compaction(capacity: usize, count: usize) -> bool {
    capacity > count.saturating_mul(2)
}

fn round_capacity(requested: usize) -> Result<usize, TableError> {
    let capacity = requested
        .checked_next_power_of_two()
        .ok_or(TableError::CapacityOverflow { requested })?;
    Ok(capacity.max(MIN_CAPACITY))
}

/// Smallest bucket count that [`HashTable::resize`] accepts for `entries`
/// live entries: the load limit must stay strictly above the count.
fn capacity_for(entries: usize) -> Result<usize, TableError> {
    let mut capacity = round_capacity(entries)?;
    while upper_bound(capacity) <= entries {
        capacity = capacity
            .checked_mul(2)
            .ok_or(TableError::CapacityOverflow { requested: entries })?;
    }
    Ok(capacity)
}

fn try_uninit_vec<T>(len: usize) -> Result<Vec<MaybeUninit<T>>, TableError> {
    let mut storage = Vec::new();
    storage.try_reserve_exact(len).map_err(|_| {
        log_warn!("allocation of {} buckets failed", len);
        TableError::AllocationFailed { buckets: len }
    })?;
    storage.resize_with(len, MaybeUninit::uninit);
    Ok(storage)
}

/// Whether a table stores values alongside its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personality {
    /// Key to value mapping.
    Map,
    /// Keys only.
    Set,
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub count: usize,
    /// Live plus tombstoned buckets
    pub occupied: usize,
    /// Tombstoned buckets
    pub tombstones: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Occupied buckets allowed before the next resize
    pub max_occupied: usize,
    /// Load factor (occupied / capacity)
    pub load_factor: f64,
    /// Longest probe sequence of any live entry
    pub max_probe: usize,
    /// Mean probe sequence length over live entries
    pub mean_probe: f64,
    /// Bytes allocated for flags, keys and values
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {} live, {} tombstones, {}/{} buckets occupied ({:.2}% load factor)",
            self.count,
            self.tombstones,
            self.occupied,
            self.capacity,
            self.load_factor * 100.0
        );
        println!("Resize at: {} occupied buckets", self.max_occupied);
        println!(
            "Probe length: max {}, mean {:.3}",
            self.max_probe, self.mean_probe
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// An open-addressing hash table with triangular probing and tombstones.
///
/// `HashTable<K, V, H>` stores keys of type `K`, values of type `V` and
/// hashes keys with `H`. Key-only tables are `HashTable<K, (), H>`; their
/// value storage is zero-sized and never allocates.
///
/// The table has a fixed [`Personality`], chosen by the constructor, so an
/// empty map can still be told apart from an empty set.
///
/// ## Performance Characteristics
///
/// - **Memory**: 2 bits per bucket of overhead plus the size of `K` and `V`.
///   The load limit is [`MAX_LOAD`] of the bucket count.
/// - **Resizing**: in place; no second key/value array is allocated.
///
/// ## Example
///
/// ```rust
/// use trihash::Insertion;
/// use trihash::hash_table::HashTable;
/// use trihash::hashing::IntHashing;
///
/// let mut table = HashTable::new_set(IntHashing);
/// let (status, index) = table.put(7u32).unwrap();
/// assert_eq!(status, Insertion::Inserted);
/// assert_eq!(table.get(&7), Some(index));
///
/// let (status, _) = table.put(7).unwrap();
/// assert_eq!(status, Insertion::Present);
///
/// table.delete(index);
/// assert_eq!(table.get(&7), None);
/// ```
pub struct HashTable<K, V, H> {
    flags: Flags,
    keys: Vec<MaybeUninit<K>>,
    values: Vec<MaybeUninit<V>>,

    capacity: usize,
    occupied: usize,
    count: usize,

    personality: Personality,
    hashing: H,
}

impl<K, V, H> Debug for HashTable<K, V, H>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let rows = (0..self.capacity)
            .step_by(16)
            .map(|base| {
                (base..(base + 16).min(self.capacity))
                    .map(|i| match self.flags.state(i) {
                        BucketState::Empty => '.',
                        BucketState::Deleted => 'x',
                        BucketState::Live => '#',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>();

        f.debug_struct("HashTable")
            .field("personality", &self.personality)
            .field("capacity", &self.capacity)
            .field("occupied", &self.occupied)
            .field("count", &self.count)
            .field("flags", &rows)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V, H> Clone for HashTable<K, V, H>
where
    K: Clone,
    V: Clone,
    H: Clone,
{
    fn clone(&self) -> Self {
        self.copy()
            .unwrap_or_else(|err| panic!("cannot clone hash table: {err}"))
    }
}

impl<K, V, H> Drop for HashTable<K, V, H> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<K>() && !core::mem::needs_drop::<V>() {
            return;
        }

        for index in 0..self.capacity {
            if self.flags.is_live(index) {
                // SAFETY: Live buckets hold initialized keys and values, and the
                // storage is never read again after drop.
                unsafe {
                    self.keys[index].assume_init_drop();
                    self.values[index].assume_init_drop();
                }
            }
        }
    }
}

impl<K, V, H> HashTable<K, V, H> {
    /// Creates an empty map. Nothing is allocated until the first insertion.
    pub fn new_map(hashing: H) -> Self {
        Self::empty(Personality::Map, hashing)
    }

    fn empty(personality: Personality, hashing: H) -> Self {
        Self {
            flags: Flags::new(),
            keys: Vec::new(),
            values: Vec::new(),
            capacity: 0,
            occupied: 0,
            count: 0,
            personality,
            hashing,
        }
    }

    fn empty_like(&self) -> Self
    where
        H: Clone,
    {
        Self::empty(self.personality, self.hashing.clone())
    }

    /// Number of buckets: 0, or a power of two no smaller than
    /// [`MIN_CAPACITY`].
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buckets that are live or tombstoned.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Number of occupied buckets allowed before the next `put` resizes.
    pub fn max_occupied(&self) -> usize {
        upper_bound(self.capacity)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the table's personality.
    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// Returns `true` if the table was created as a map.
    pub fn is_map(&self) -> bool {
        self.personality == Personality::Map
    }

    /// Returns the hashing capability of this table.
    pub fn hashing(&self) -> &H {
        &self.hashing
    }

    /// Returns `true` if the bucket at `index` holds a live entry.
    #[inline]
    pub fn exists(&self, index: usize) -> bool {
        index < self.capacity && self.flags.is_live(index)
    }

    /// Returns the key stored in the live bucket at `index`.
    #[inline]
    pub fn key_at(&self, index: usize) -> Option<&K> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: The bucket is live, so its key is initialized.
        Some(unsafe { self.keys[index].assume_init_ref() })
    }

    /// Returns the value stored in the live bucket at `index`.
    #[inline]
    pub fn value_at(&self, index: usize) -> Option<&V> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: The bucket is live, so its value is initialized.
        Some(unsafe { self.values[index].assume_init_ref() })
    }

    /// Returns the value stored in the live bucket at `index`, mutably.
    #[inline]
    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: The bucket is live, so its value is initialized.
        Some(unsafe { self.values[index].assume_init_mut() })
    }

    /// Returns the key and the value stored in the live bucket at `index`,
    /// the value mutably.
    #[inline]
    pub fn entry_at_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: The bucket is live, so both its key and value are initialized.
        unsafe {
            Some((
                self.keys[index].assume_init_ref(),
                self.values[index].assume_init_mut(),
            ))
        }
    }

    /// Returns the first live index at or after `from`, or
    /// [`capacity`](Self::capacity) if there is none.
    pub fn next_index(&self, from: usize) -> usize {
        (from..self.capacity)
            .find(|&index| self.flags.is_live(index))
            .unwrap_or(self.capacity)
    }

    /// Removes the entry at `index`, leaving a tombstone.
    ///
    /// Does nothing if the bucket is not live. Never shrinks the table.
    pub fn delete(&mut self, index: usize) {
        drop(self.take_at(index));
    }

    /// Moves the entry at `index` out of the table, leaving a tombstone.
    fn take_at(&mut self, index: usize) -> Option<(K, V)> {
        if !self.exists(index) {
            return None;
        }

        // SAFETY: The bucket is live. It is marked deleted right after, so the
        // moved-out key and value are never read or dropped again.
        let entry = unsafe {
            (
                self.keys[index].assume_init_read(),
                self.values[index].assume_init_read(),
            )
        };
        self.flags.set_deleted(index);
        self.count -= 1;
        Some(entry)
    }

    /// Removes all entries, keeping the allocated buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::hash_table::HashTable;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut table = HashTable::new_set(IntHashing);
    /// for i in 0..10u64 {
    ///     table.put(i).unwrap();
    /// }
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.occupied(), 0);
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        if self.occupied == 0 {
            return;
        }

        if core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>() {
            for index in 0..self.capacity {
                if self.flags.is_live(index) {
                    // SAFETY: Live buckets hold initialized entries; every flag is
                    // reset to empty below.
                    unsafe {
                        self.keys[index].assume_init_drop();
                        self.values[index].assume_init_drop();
                    }
                }
            }
        }

        self.flags.clear();
        self.count = 0;
        self.occupied = 0;
    }

    /// Moves the contents out, leaving an empty table with the same
    /// personality and hashing behind.
    pub fn take(&mut self) -> Self
    where
        H: Clone,
    {
        let empty = self.empty_like();
        core::mem::replace(self, empty)
    }

    /// Returns an iterator over the live entries in bucket order.
    pub fn iter(&self) -> Iter<'_, K, V, H> {
        Iter {
            table: self,
            index: 0,
            remaining: self.count,
        }
    }

    fn iter_indexed(&self) -> impl Iterator<Item = (usize, (&K, &V))> {
        (0..self.capacity).filter_map(|index| {
            self.key_at(index)
                .zip(self.value_at(index))
                .map(|entry| (index, entry))
        })
    }

    /// Deep copy of the table, tombstones included.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated.
    pub fn copy(&self) -> Result<Self, TableError>
    where
        K: Clone,
        V: Clone,
        H: Clone,
    {
        if self.capacity == 0 {
            return Ok(self.empty_like());
        }

        let flags = self.flags.try_clone(self.capacity)?;
        let mut keys = try_uninit_vec(self.capacity)?;
        let mut values = try_uninit_vec(self.capacity)?;
        for (index, (key, value)) in self.iter_indexed() {
            keys[index].write(key.clone());
            values[index].write(value.clone());
        }

        Ok(Self {
            flags,
            keys,
            values,
            capacity: self.capacity,
            occupied: self.occupied,
            count: self.count,
            personality: self.personality,
            hashing: self.hashing.clone(),
        })
    }

    /// Copies the keys of the table into a new set.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated.
    pub fn copy_as_set(&self) -> Result<HashTable<K, (), H>, TableError>
    where
        K: Clone,
        H: Clone,
    {
        if self.capacity == 0 {
            return Ok(HashTable::new_set(self.hashing.clone()));
        }

        let flags = self.flags.try_clone(self.capacity)?;
        let mut keys = try_uninit_vec(self.capacity)?;
        for (index, (key, _)) in self.iter_indexed() {
            keys[index].write(key.clone());
        }

        Ok(HashTable {
            flags,
            keys,
            values: try_uninit_vec(self.capacity)?,
            capacity: self.capacity,
            occupied: self.occupied,
            count: self.count,
            personality: Personality::Set,
            hashing: self.hashing.clone(),
        })
    }

    /// Returns the first live key, if any.
    pub fn get_any(&self) -> Option<&K> {
        self.key_at(self.next_index(0))
    }

    /// Returns the first live key, or `if_empty` when there is none.
    pub fn get_any_or<'a>(&'a self, if_empty: &'a K) -> &'a K {
        self.get_any().unwrap_or(if_empty)
    }
}

impl<K, V, H> HashTable<K, V, H>
where
    H: KeyHashing<K>,
{
    #[inline(always)]
    fn probe_start(&self, key: &K) -> usize {
        self.hashing.hash(key) as usize & (self.capacity - 1)
    }

    /// Returns the index of the live bucket holding `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::hash_table::HashTable;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut table = HashTable::new_map(IntHashing);
    /// assert_eq!(table.get(&1u8), None);
    ///
    /// table.map_set(1u8, "one").unwrap();
    /// let index = table.get(&1).unwrap();
    /// assert_eq!(table.value_at(index), Some(&"one"));
    /// ```
    pub fn get(&self, key: &K) -> Option<usize> {
        if self.capacity == 0 {
            return None;
        }

        let mask = self.capacity - 1;
        let start = self.probe_start(key);
        let mut index = start;
        let mut step = 0;

        loop {
            match self.flags.state(index) {
                BucketState::Empty => return None,
                BucketState::Live => {
                    // SAFETY: The bucket is live, so its key is initialized.
                    let stored = unsafe { self.keys[index].assume_init_ref() };
                    if self.hashing.equals(stored, key) {
                        return Some(index);
                    }
                }
                BucketState::Deleted => {}
            }

            step += 1;
            index = (index + step) & mask;
            if index == start {
                return None;
            }
        }
    }

    /// Returns `true` if `key` is stored in the table.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Rehashes the table into `requested` buckets, rounded up to a power of
    /// two and at least [`MIN_CAPACITY`].
    ///
    /// Requests that could not hold the current entries below the load limit
    /// are ignored. Requesting the current capacity rehashes in place, which
    /// drops every tombstone.
    ///
    /// Entries are relocated in place: each live entry is moved to its new
    /// probe position, and an entry still waiting at that position is kicked
    /// out and relocated in turn. Only a new flag array is allocated.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated or the request overflows; the
    /// table is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::hash_table::HashTable;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut table = HashTable::new_set(IntHashing);
    /// table.put(1u32).unwrap();
    ///
    /// table.resize(200).unwrap();
    /// assert_eq!(table.capacity(), 256);
    ///
    /// table.resize(100).unwrap();
    /// assert_eq!(table.capacity(), 128);
    /// assert!(table.contains(&1));
    /// ```
    pub fn resize(&mut self, requested: usize) -> Result<(), TableError> {
        let new_capacity = round_capacity(requested)?;
        if self.count >= upper_bound(new_capacity) {
            return Ok(());
        }

        let mut new_flags = Flags::try_all_empty(new_capacity)?;

        let old_capacity = self.capacity;
        if new_capacity > old_capacity {
            let additional = new_capacity - old_capacity;
            let alloc_failed = |_| {
                log_warn!("allocation of {} buckets failed", new_capacity);
                TableError::AllocationFailed {
                    buckets: new_capacity,
                }
            };
            // Reservations only grow spare capacity, so a failure here leaves
            // the table as it was.
            self.keys.try_reserve_exact(additional).map_err(alloc_failed)?;
            self.values
                .try_reserve_exact(additional)
                .map_err(alloc_failed)?;
            self.keys.resize_with(new_capacity, MaybeUninit::uninit);
            self.values.resize_with(new_capacity, MaybeUninit::uninit);
        }

        let new_mask = new_capacity - 1;
        for origin in 0..old_capacity {
            if !self.flags.is_live(origin) {
                continue;
            }

            // SAFETY: The bucket is live. It is marked deleted right after, so
            // the moved-out entry is owned by this loop from now on.
            let (mut key, mut value) = unsafe {
                (
                    self.keys[origin].assume_init_read(),
                    self.values[origin].assume_init_read(),
                )
            };
            self.flags.set_deleted(origin);

            loop {
                let mut index = self.hashing.hash(&key) as usize & new_mask;
                let mut step = 0;
                while !new_flags.is_empty(index) {
                    step += 1;
                    index = (index + step) & new_mask;
                }
                new_flags.set_live(index);

                if index < old_capacity && self.flags.is_live(index) {
                    // SAFETY: The bucket still holds an entry that has not been
                    // relocated yet; swap it out and keep going with it.
                    unsafe {
                        key = core::mem::replace(&mut self.keys[index], MaybeUninit::new(key))
                            .assume_init();
                        value =
                            core::mem::replace(&mut self.values[index], MaybeUninit::new(value))
                                .assume_init();
                    }
                    self.flags.set_deleted(index);
                } else {
                    self.keys[index].write(key);
                    self.values[index].write(value);
                    break;
                }
            }
        }

        if new_capacity < old_capacity {
            // Every entry now lives below `new_capacity`.
            self.keys.truncate(new_capacity);
            self.keys.shrink_to_fit();
            self.values.truncate(new_capacity);
            self.values.shrink_to_fit();
        }

        log_debug!(
            "rehashed {} entries from {} to {} buckets, dropped {} tombstones",
            self.count,
            old_capacity,
            new_capacity,
            self.occupied - self.count
        );

        self.flags = new_flags;
        self.capacity = new_capacity;
        self.occupied = self.count;

        Ok(())
    }

    /// Makes room for `additional` more entries without a resize.
    ///
    /// Tombstones count against the load limit, so a table whose occupied
    /// buckets leave too little headroom is rehashed even when its capacity
    /// would suffice.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated or `len + additional` overflows;
    /// the table is left unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<(), TableError> {
        let overflow = || TableError::CapacityOverflow {
            requested: additional,
        };
        let required = self.count.checked_add(additional).ok_or_else(overflow)?;
        let occupied = self
            .occupied
            .checked_add(additional)
            .ok_or_else(overflow)?;
        if occupied > upper_bound(self.capacity) {
            self.resize(capacity_for(required)?.max(self.capacity))?;
        }
        Ok(())
    }

    /// Shrinks the table to the smallest capacity that holds its entries,
    /// dropping every tombstone. Never grows the table.
    pub fn shrink_to_fit(&mut self) -> Result<(), TableError> {
        if self.capacity == 0 {
            return Ok(());
        }
        // A count sitting exactly on the current load limit keeps the
        // capacity; such a table has no tombstones left to drop.
        self.resize(capacity_for(self.count)?.min(self.capacity))
    }

    /// Places `key` in the table, resizing first if the load limit has been
    /// reached.
    ///
    /// On [`Insertion::Inserted`] the caller must initialize the value at the
    /// returned index before any other access to the table.
    pub(crate) fn put_key(&mut self, key: K) -> Result<(Insertion, usize), TableError> {
        if self.occupied >= upper_bound(self.capacity) {
            if prefers_compaction(self.capacity, self.count) {
                log_debug!(
                    "compacting {} buckets holding {} tombstones",
                    self.capacity,
                    self.occupied - self.count
                );
                self.resize(self.capacity - 1)?;
            } else {
                self.resize(self.capacity + 1)?;
            }
        }

        let mask = self.capacity - 1;
        let start = self.probe_start(&key);
        let mut index = start;
        let mut step = 0;
        let mut tombstone = None;

        let slot = loop {
            match self.flags.state(index) {
                BucketState::Empty => break tombstone.unwrap_or(index),
                BucketState::Deleted => {
                    tombstone.get_or_insert(index);
                }
                BucketState::Live => {
                    // SAFETY: The bucket is live, so its key is initialized.
                    let stored = unsafe { self.keys[index].assume_init_ref() };
                    if self.hashing.equals(stored, &key) {
                        return Ok((Insertion::Present, index));
                    }
                }
            }

            step += 1;
            index = (index + step) & mask;
            if index == start {
                // The load limit keeps at least one bucket empty, so a full
                // cycle always passed over a tombstone.
                match tombstone {
                    Some(tombstone) => break tombstone,
                    None => unreachable!("probe cycle found neither key nor free bucket"),
                }
            }
        };

        if self.flags.is_empty(slot) {
            self.occupied += 1;
        }
        self.keys[slot].write(key);
        self.flags.set_live(slot);
        self.count += 1;

        Ok((Insertion::Inserted, slot))
    }

    /// Returns the value stored for `key`.
    pub fn map_get(&self, key: &K) -> Option<&V> {
        self.get(key).and_then(|index| self.value_at(index))
    }

    /// Returns the value stored for `key`, mutably.
    pub fn map_get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.get(key)?;
        self.value_at_mut(index)
    }

    /// Returns a copy of the value stored for `key`, or `if_missing`.
    pub fn map_get_or(&self, key: &K, if_missing: V) -> V
    where
        V: Clone,
    {
        self.map_get(key).cloned().unwrap_or(if_missing)
    }

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// Returns the previous value if the key was present. The stored key is
    /// left untouched in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::hash_table::HashTable;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut table = HashTable::new_map(IntHashing);
    /// assert_eq!(table.map_set(0u32, 0u32).unwrap(), None);
    /// assert_eq!(table.map_set(0, 1).unwrap(), Some(0));
    /// assert_eq!(table.map_get(&0), Some(&1));
    /// ```
    pub fn map_set(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        let (insertion, index) = self.put_key(key)?;
        Ok(match insertion {
            Insertion::Inserted => {
                self.values[index].write(value);
                None
            }
            // SAFETY: The key was found live, so its value is initialized.
            Insertion::Present => Some(core::mem::replace(
                unsafe { self.values[index].assume_init_mut() },
                value,
            )),
        })
    }

    /// Stores `value` under `key` only if the key is absent.
    ///
    /// Returns the existing value if the key was present; `value` is dropped
    /// in that case.
    pub fn map_add(&mut self, key: K, value: V) -> Result<Option<&V>, TableError> {
        let (insertion, index) = self.put_key(key)?;
        Ok(match insertion {
            Insertion::Inserted => {
                self.values[index].write(value);
                None
            }
            // SAFETY: The key was found live, so its value is initialized.
            Insertion::Present => Some(unsafe { self.values[index].assume_init_ref() }),
        })
    }

    /// Overwrites the value stored for `key` if the key is present, returning
    /// the replaced value.
    pub fn map_replace(&mut self, key: &K, value: V) -> Option<V> {
        let slot = self.map_get_mut(key)?;
        Some(core::mem::replace(slot, value))
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn map_remove(&mut self, key: &K) -> bool {
        self.map_pop(key).is_some()
    }

    /// Removes `key`, returning the stored key and value.
    pub fn map_pop(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.get(key)?;
        self.take_at(index)
    }

    /// Replaces the stored key equal to `key`, returning the replaced key.
    ///
    /// Returns `None` and drops `key` if no equal key is stored.
    pub fn set_replace(&mut self, key: K) -> Option<K> {
        let index = self.get(&key)?;
        // SAFETY: `get` only returns live buckets.
        let stored = unsafe { self.keys[index].assume_init_mut() };
        Some(core::mem::replace(stored, key))
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn set_remove(&mut self, key: &K) -> bool {
        self.set_pop(key).is_some()
    }

    /// Removes `key`, returning the stored key.
    pub fn set_pop(&mut self, key: &K) -> Option<K> {
        let index = self.get(key)?;
        self.take_at(index).map(|(key, _)| key)
    }

    /// Returns `true` if every key of `other` is stored in `self`.
    ///
    /// Stops at the first missing key.
    pub fn is_superset<W, G>(&self, other: &HashTable<K, W, G>) -> bool {
        other.iter().all(|(key, _)| self.contains(key))
    }

    /// Returns `true` if both tables hold the same keys.
    pub fn set_equals<W, G>(&self, other: &HashTable<K, W, G>) -> bool {
        self.count == other.count && self.is_superset(other)
    }

    /// Removes every key that is not stored in `other`.
    pub fn set_intersect<W, G>(&mut self, other: &HashTable<K, W, G>)
    where
        G: KeyHashing<K>,
    {
        // Deleting never moves entries, so walking indices stays valid.
        for index in 0..self.capacity {
            if let Some(key) = self.key_at(index)
                && !other.contains(key)
            {
                self.delete(index);
            }
        }
    }

    /// Order-independent hash of the stored keys: the XOR of their hashes.
    pub fn set_hash(&self) -> u64 {
        self.iter()
            .fold(0, |hash, (key, _)| hash ^ self.hashing.hash(key))
    }

    /// Number of probe steps taken to reach the live bucket at `index`.
    #[cfg(any(test, feature = "stats"))]
    fn probe_length(&self, index: usize) -> usize {
        let mask = self.capacity - 1;
        // SAFETY: Only called for live buckets.
        let key = unsafe { self.keys[index].assume_init_ref() };
        let mut probe = self.probe_start(key);
        let mut step = 0;
        while probe != index {
            step += 1;
            probe = (probe + step) & mask;
        }
        step
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// Entry `n` counts the live entries found after `n` probe steps.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        for index in 0..self.capacity {
            if self.flags.is_live(index) {
                let length = self.probe_length(index);
                if hist.len() <= length {
                    hist.resize(length + 1, 0);
                }
                hist[length] += 1;
            }
        }
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        let total_probe: usize = hist.iter().enumerate().map(|(len, n)| len * n).sum();

        DebugStats {
            count: self.count,
            occupied: self.occupied,
            tombstones: self.occupied - self.count,
            capacity: self.capacity,
            max_occupied: upper_bound(self.capacity),
            load_factor: if self.capacity == 0 {
                0.0
            } else {
                self.occupied as f64 / self.capacity as f64
            },
            max_probe: hist.len() - 1,
            mean_probe: if self.count == 0 {
                0.0
            } else {
                total_probe as f64 / self.count as f64
            },
            total_bytes: self.flags.allocated_bytes()
                + self.keys.capacity() * core::mem::size_of::<K>()
                + self.values.capacity() * core::mem::size_of::<V>(),
        }
    }
}

impl<K, H> HashTable<K, (), H> {
    /// Creates an empty set. Nothing is allocated until the first insertion.
    pub fn new_set(hashing: H) -> Self {
        Self::empty(Personality::Set, hashing)
    }
}

impl<K, H> HashTable<K, (), H>
where
    H: KeyHashing<K>,
{
    /// Inserts `key`, reporting whether it was already present and the index
    /// of its bucket.
    ///
    /// A present key is left untouched and the argument is dropped.
    ///
    /// # Errors
    ///
    /// Fails if a required resize cannot allocate; the table is left
    /// unchanged.
    pub fn put(&mut self, key: K) -> Result<(Insertion, usize), TableError> {
        let (insertion, index) = self.put_key(key)?;
        if insertion == Insertion::Inserted {
            self.values[index].write(());
        }
        Ok((insertion, index))
    }

    /// Inserts `key`.
    pub fn set_insert(&mut self, key: K) -> Result<Insertion, TableError> {
        self.put(key).map(|(insertion, _)| insertion)
    }

    /// Inserts `key`, returning the stored equal key if there already was
    /// one.
    pub fn set_insert_get_existing(&mut self, key: K) -> Result<Option<&K>, TableError> {
        let (insertion, index) = self.put(key)?;
        Ok(match insertion {
            Insertion::Inserted => None,
            Insertion::Present => self.key_at(index),
        })
    }

    /// Inserts every key of `keys`.
    ///
    /// The table is first grown, if needed, to a capacity that holds the
    /// iterator's lower size bound without a further resize. Returns
    /// [`Insertion::Inserted`] if at least one key was new.
    ///
    /// # Errors
    ///
    /// Stops at the first allocation failure. Keys inserted before the
    /// failure stay in the table.
    pub fn set_insert_all<I>(&mut self, keys: I) -> Result<Insertion, TableError>
    where
        I: IntoIterator<Item = K>,
    {
        let keys = keys.into_iter();
        let (lower, _) = keys.size_hint();
        if lower > 0 {
            let wanted = capacity_for(lower)?;
            if wanted > self.capacity {
                self.resize(wanted)?;
            }
        }

        let mut result = Insertion::Present;
        for key in keys {
            if self.set_insert(key)? == Insertion::Inserted {
                result = Insertion::Inserted;
            }
        }
        Ok(result)
    }

    /// Inserts a copy of every key of `other`.
    ///
    /// # Errors
    ///
    /// Stops at the first allocation failure. Keys inserted before the
    /// failure stay in the table.
    pub fn set_union<W, G>(&mut self, other: &HashTable<K, W, G>) -> Result<(), TableError>
    where
        K: Clone,
    {
        for (key, _) in other.iter() {
            self.set_insert(key.clone())?;
        }
        Ok(())
    }
}

impl<'a, K, V, H> IntoIterator for &'a HashTable<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, H> IntoIterator for HashTable<K, V, H> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, H>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}

/// An iterator over the live entries of a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`]. Entries
/// are yielded in bucket order, which is unrelated to insertion order.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, K, V, H> {
    table: &'a HashTable<K, V, H>,
    index: usize,
    remaining: usize,
}

impl<'a, K, V, H> Iterator for Iter<'a, K, V, H> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self.table.next_index(self.index);
        self.index = index + 1;
        let entry = self.table.key_at(index).zip(self.table.value_at(index))?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, H> ExactSizeIterator for Iter<'_, K, V, H> {}

/// An owning iterator over the entries of a [`HashTable`].
pub struct IntoIter<K, V, H> {
    table: HashTable<K, V, H>,
    index: usize,
}

impl<K, V, H> Iterator for IntoIter<K, V, H> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.table.next_index(self.index);
        self.index = index + 1;
        self.table.take_at(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V, H> ExactSizeIterator for IntoIter<K, V, H> {}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::cell::Cell;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::hashing::BuildHashing;
    use crate::hashing::FnHashing;
    use crate::hashing::IntHashing;

    const MAX_VAL: u32 = 100;

    #[derive(Clone)]
    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl Default for HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }
    }

    impl BuildHasher for HashState {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    fn sip_set() -> HashTable<u64, (), BuildHashing<HashState>> {
        HashTable::new_set(BuildHashing::new(HashState::default()))
    }

    fn int32_hash(key: &u32) -> u64 {
        *key as u64
    }

    fn int32_eq(lhs: &u32, rhs: &u32) -> bool {
        lhs == rhs
    }

    /// Hashes every key to the same bucket.
    #[derive(Clone, Copy)]
    struct Colliding;

    impl KeyHashing<u32> for Colliding {
        fn hash(&self, _: &u32) -> u64 {
            0
        }

        fn equals(&self, lhs: &u32, rhs: &u32) -> bool {
            lhs == rhs
        }
    }

    /// Counts drops, to check that no entry is dropped twice or leaked.
    #[derive(Clone)]
    struct Tracked {
        key: u32,
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[derive(Clone, Copy)]
    struct TrackedHashing;

    impl KeyHashing<Tracked> for TrackedHashing {
        fn hash(&self, key: &Tracked) -> u64 {
            key.key as u64
        }

        fn equals(&self, lhs: &Tracked, rhs: &Tracked) -> bool {
            lhs.key == rhs.key
        }
    }

    fn assert_invariants<K, V, H>(table: &HashTable<K, V, H>) {
        let capacity = table.capacity();
        assert!(capacity == 0 || (capacity.is_power_of_two() && capacity >= MIN_CAPACITY));
        assert!(table.len() <= table.occupied());
        assert!(table.occupied() <= capacity);
        assert!(table.occupied() <= upper_bound(capacity));

        let live = (0..capacity).filter(|&i| table.exists(i)).count();
        let tombstones = (0..capacity)
            .filter(|&i| table.flags.state(i) == BucketState::Deleted)
            .count();
        assert_eq!(live, table.len());
        assert_eq!(live + tombstones, table.occupied());
    }

    #[test]
    fn test_upper_bound_rounds_to_nearest() {
        assert_eq!(upper_bound(0), 0);
        assert_eq!(upper_bound(4), 3);
        assert_eq!(upper_bound(8), 6);
        assert_eq!(upper_bound(16), 12);
        assert_eq!(upper_bound(128), 99);
        assert_eq!(upper_bound(256), 197);
    }

    #[test]
    fn test_capacity_for() {
        assert_eq!(capacity_for(0).unwrap(), 4);
        assert_eq!(capacity_for(2).unwrap(), 4);
        assert_eq!(capacity_for(3).unwrap(), 8);
        assert_eq!(capacity_for(6).unwrap(), 16);
        assert_eq!(capacity_for(98).unwrap(), 128);
        assert_eq!(capacity_for(99).unwrap(), 256);

        // Every result is accepted by `resize`.
        for entries in 0..2000 {
            let capacity = capacity_for(entries).unwrap();
            assert!(upper_bound(capacity) > entries, "entries {entries}");
            assert!(capacity == MIN_CAPACITY || upper_bound(capacity / 2) <= entries);
        }
    }

    #[test]
    fn test_empty_table() {
        let set = sip_set();
        assert_eq!(set.get(&0), None);
        assert_eq!(set.len(), 0);
        assert_eq!(set.capacity(), 0);
        assert_eq!(set.get_any(), None);
        assert_eq!(set.iter().count(), 0);
        assert_invariants(&set);
    }

    #[test]
    fn test_insert_find_delete() {
        let mut set = sip_set();

        for i in 0..MAX_VAL as u64 {
            let (status, _) = set.put(i).unwrap();
            assert_eq!(status, Insertion::Inserted);
            assert_invariants(&set);
        }
        assert_eq!(set.len(), MAX_VAL as usize);

        for i in 0..MAX_VAL as u64 {
            let index = set.get(&i).expect("inserted key must be found");
            assert!(set.exists(index));
            assert_eq!(set.key_at(index), Some(&i));
        }
        assert_eq!(set.get(&200), None);

        for i in 0..MAX_VAL as u64 {
            let index = set.get(&i).unwrap();
            set.delete(index);
            assert!(!set.exists(index));
            assert_eq!(set.get(&i), None);
        }
        assert_eq!(set.len(), 0);
        assert_invariants(&set);
    }

    #[test]
    fn test_reinsert_reuses_storage() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..MAX_VAL {
            set.put(i).unwrap();
        }
        let capacity = set.capacity();

        for i in 0..MAX_VAL {
            assert!(set.set_remove(&i));
        }
        assert_eq!(set.len(), 0);
        for i in 0..MAX_VAL {
            assert_eq!(set.get(&i), None);
        }

        for i in 0..MAX_VAL {
            assert_eq!(set.put(i).unwrap().0, Insertion::Inserted);
            assert_invariants(&set);
        }
        assert_eq!(set.len(), MAX_VAL as usize);
        assert!(set.capacity() <= capacity);
    }

    #[test]
    fn test_tombstone_reuse_keeps_occupied() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..5u32 {
            set.put(i).unwrap();
        }
        let occupied = set.occupied();

        let index = set.get(&3).unwrap();
        set.delete(index);
        assert_eq!(set.occupied(), occupied);
        assert_eq!(set.len(), 4);

        let (status, reused) = set.put(3).unwrap();
        assert_eq!(status, Insertion::Inserted);
        assert_eq!(reused, index);
        assert_eq!(set.occupied(), occupied);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_put_prefers_first_tombstone() {
        let mut set = HashTable::new_set(Colliding);
        set.resize(64).unwrap();
        for i in 0..4u32 {
            set.put(i).unwrap();
        }
        // Probe sequence from bucket 0: 0, 1, 3, 6, 10, ...
        assert_eq!(set.get(&0), Some(0));
        assert_eq!(set.get(&1), Some(1));
        assert_eq!(set.get(&2), Some(3));
        assert_eq!(set.get(&3), Some(6));

        set.delete(1);
        set.delete(3);
        let (status, index) = set.put(9).unwrap();
        assert_eq!(status, Insertion::Inserted);
        assert_eq!(index, 1);

        // Present keys behind tombstones are still found.
        assert_eq!(set.put(3).unwrap(), (Insertion::Present, 6));
        assert_invariants(&set);
    }

    #[test]
    fn test_get_misses_after_removing_everything() {
        let mut set = HashTable::new_set(Colliding);
        for i in 0..3u32 {
            set.put(i).unwrap();
        }
        assert_eq!(set.capacity(), 4);
        set.put(3).unwrap();
        for i in 0..4u32 {
            set.set_remove(&i);
        }
        assert_eq!(set.get(&7), None);
        assert_invariants(&set);
    }

    #[test]
    fn test_full_table_compacts_instead_of_growing() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..12u32 {
            set.put(i).unwrap();
        }
        assert_eq!(set.capacity(), 16);

        for i in 0..10u32 {
            set.set_remove(&i);
        }
        for i in 100..110u32 {
            set.put(i).unwrap();
            assert_invariants(&set);
        }
        assert_eq!(set.capacity(), 16);
        assert_eq!(set.len(), 12);
    }

    #[test]
    fn test_resize_grow_and_shrink() {
        let mut set = HashTable::new_set(IntHashing);
        assert_eq!(set.put(0u32).unwrap().0, Insertion::Inserted);
        assert_eq!(set.len(), 1);

        let buckets = set.capacity();
        set.resize(200).unwrap();
        assert!(set.capacity() > buckets);

        let buckets = set.capacity();
        set.resize(100).unwrap();
        assert!(set.capacity() < buckets);
        assert!(set.contains(&0));

        let buckets = set.capacity();
        set.clear();
        assert_eq!(set.capacity(), buckets);
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_resize_too_small_is_ignored() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..50u32 {
            set.put(i).unwrap();
        }
        let capacity = set.capacity();

        set.resize(8).unwrap();
        assert_eq!(set.capacity(), capacity);
        set.resize(0).unwrap();
        assert_eq!(set.capacity(), capacity);
    }

    #[test]
    fn test_resize_overflow_leaves_table_unchanged() {
        let mut set = HashTable::new_set(IntHashing);
        set.put(1u32).unwrap();
        let capacity = set.capacity();

        assert_eq!(
            set.resize(usize::MAX),
            Err(TableError::CapacityOverflow {
                requested: usize::MAX
            })
        );
        assert_eq!(set.capacity(), capacity);
        assert!(set.contains(&1));
    }

    #[test]
    fn test_shrink_to_fit_at_load_limit_counts() {
        for (live, expected) in [(3u32, 8), (6, 16), (12, 32), (99, 256), (2, 4)] {
            let mut set = HashTable::new_set(IntHashing);
            for i in 0..1000u32 {
                set.put(i).unwrap();
            }
            for i in live..1000 {
                set.set_remove(&i);
            }
            assert_eq!(set.capacity(), 2048);

            set.shrink_to_fit().unwrap();
            assert_eq!(set.capacity(), expected, "live {live}");
            assert_eq!(set.occupied(), live as usize);
            assert_invariants(&set);
            for i in 0..live {
                assert!(set.contains(&i));
            }
        }
    }

    #[test]
    fn test_shrink_to_fit_never_grows() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..12u32 {
            set.put(i).unwrap();
        }
        assert_eq!(set.capacity(), 16);
        assert_eq!(set.occupied(), upper_bound(16));

        set.shrink_to_fit().unwrap();
        assert_eq!(set.capacity(), 16);
        assert_eq!(set.occupied(), 12);

        let mut empty = sip_set();
        empty.shrink_to_fit().unwrap();
        assert_eq!(empty.capacity(), 0);
    }

    #[test]
    fn test_reserve_overflow_reports_request() {
        let mut set = HashTable::new_set(IntHashing);
        set.put(1u32).unwrap();
        let capacity = set.capacity();

        assert_eq!(
            set.reserve(usize::MAX),
            Err(TableError::CapacityOverflow {
                requested: usize::MAX
            })
        );
        assert!(set.reserve(usize::MAX - 1).is_err());
        assert_eq!(set.capacity(), capacity);
        assert!(set.contains(&1));
    }

    #[test]
    fn test_reserve_accounts_for_tombstones() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..12u32 {
            set.put(i).unwrap();
        }
        for i in 0..10u32 {
            set.set_remove(&i);
        }
        assert_eq!(set.occupied(), 12);

        set.reserve(5).unwrap();
        assert_eq!(set.occupied(), set.len());
        let capacity = set.capacity();
        let occupied = set.occupied();

        for i in 100..105u32 {
            set.put(i).unwrap();
        }
        assert_eq!(set.capacity(), capacity);
        // No compaction ran: every insertion took a fresh bucket.
        assert_eq!(set.occupied(), occupied + 5);
    }

    /// Identity hashing that counts how often it is asked for a hash.
    #[derive(Clone)]
    struct Counting {
        calls: Rc<Cell<usize>>,
    }

    impl KeyHashing<u32> for Counting {
        fn hash(&self, key: &u32) -> u64 {
            self.calls.set(self.calls.get() + 1);
            *key as u64
        }

        fn equals(&self, lhs: &u32, rhs: &u32) -> bool {
            lhs == rhs
        }
    }

    #[test]
    fn test_insert_all_presizes_without_rehash() {
        let calls = Rc::new(Cell::new(0));
        let mut set = HashTable::new_set(Counting {
            calls: calls.clone(),
        });

        assert_eq!(set.set_insert_all(0..100u32).unwrap(), Insertion::Inserted);
        assert_eq!(set.len(), 100);
        assert_eq!(set.capacity(), 256);
        // One hash per insertion, none for a rehash.
        assert_eq!(calls.get(), 100);

        assert_eq!(set.set_insert_all(0..0u32).unwrap(), Insertion::Present);
        assert_eq!(set.capacity(), 256);
    }

    #[test]
    fn test_kick_out_rehash_with_collisions() {
        let mut set = HashTable::new_set(Colliding);
        for i in 0..40u32 {
            set.put(i).unwrap();
        }
        for i in (0..40u32).step_by(3) {
            set.set_remove(&i);
        }

        set.resize(256).unwrap();
        assert_invariants(&set);
        set.resize(64).unwrap();
        assert_eq!(set.capacity(), 64);
        assert_invariants(&set);
        assert_eq!(set.occupied(), set.len());

        for i in 0..40u32 {
            assert_eq!(set.contains(&i), i % 3 != 0, "key {i}");
        }
    }

    #[test]
    fn test_rehash_drops_each_entry_once() {
        let drops = Rc::new(Cell::new(0));
        let mut map = HashTable::new_map(TrackedHashing);
        for key in 0..200u32 {
            let tracked = Tracked {
                key,
                drops: drops.clone(),
            };
            map.map_set(tracked, key.to_string()).unwrap();
        }
        assert_eq!(drops.get(), 0);

        for key in 0..100u32 {
            let probe = Tracked {
                key,
                drops: drops.clone(),
            };
            assert!(map.map_remove(&probe));
        }
        // 100 probes and 100 removed keys.
        assert_eq!(drops.get(), 200);

        map.resize(16).unwrap();
        map.resize(4096).unwrap();
        map.resize(256).unwrap();
        assert_eq!(drops.get(), 200);

        drop(map);
        assert_eq!(drops.get(), 300);
    }

    #[test]
    fn test_map_operations() {
        let mut map = HashTable::new_map(IntHashing);
        assert!(map.is_map());

        for i in 0..MAX_VAL {
            assert_eq!(map.map_set(i, i).unwrap(), None);
        }

        let set = map.copy_as_set().unwrap();
        assert!(!set.is_map());
        assert!(set.set_equals(&map));

        assert_eq!(map.map_set(0, 1).unwrap(), Some(0));
        assert_eq!(map.map_add(0, 1).unwrap(), Some(&1));

        assert_eq!(map.map_replace(&0, 0), Some(1));
        assert_eq!(map.map_get_or(&0, u32::MAX), 0);
        assert_eq!(map.map_get_or(&MAX_VAL, u32::MAX), u32::MAX);

        assert_eq!(map.map_add(MAX_VAL, MAX_VAL).unwrap(), None);
        assert!(map.map_remove(&MAX_VAL));
        assert!(!map.map_remove(&MAX_VAL));
        assert_eq!(map.map_replace(&MAX_VAL, 1), None);

        for i in 0..MAX_VAL {
            assert_eq!(map.map_pop(&i), Some((i, i)));
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_set_operations() {
        let mut set = HashTable::new_set(IntHashing);
        for i in 0..MAX_VAL {
            assert_eq!(set.set_insert(i).unwrap(), Insertion::Inserted);
        }
        assert_eq!(set.set_insert(0).unwrap(), Insertion::Present);
        assert_eq!(set.len(), MAX_VAL as usize);

        for i in 0..MAX_VAL {
            assert_eq!(set.set_insert_get_existing(i).unwrap(), Some(&i));
        }

        let elements: Vec<u32> = (0..=MAX_VAL).collect();
        assert_eq!(
            set.set_insert_all(elements[..MAX_VAL as usize].iter().copied())
                .unwrap(),
            Insertion::Present
        );
        assert_eq!(
            set.set_insert_all(elements.iter().copied()).unwrap(),
            Insertion::Inserted
        );

        assert!(set.contains(&MAX_VAL));
        assert!(set.set_remove(&MAX_VAL));
        assert!(!set.contains(&MAX_VAL));

        for i in 0..MAX_VAL {
            assert_eq!(set.set_pop(&i), Some(i));
        }
        assert!(set.is_empty());

        let mut other = HashTable::new_set(IntHashing);
        set.set_insert_all(elements[..MAX_VAL as usize].iter().copied())
            .unwrap();
        other
            .set_insert_all(elements[..(MAX_VAL / 2) as usize].iter().copied())
            .unwrap();

        assert!(set.is_superset(&other));
        assert!(!other.is_superset(&set));
        assert!(!set.set_equals(&other));

        other
            .set_insert_all(elements[..MAX_VAL as usize].iter().copied())
            .unwrap();
        assert!(set.set_equals(&other));

        let copy = set.copy().unwrap();
        assert!(set.set_equals(&copy));

        let mut other = HashTable::new_set(IntHashing);
        other.set_insert(MAX_VAL).unwrap();
        other.set_union(&set).unwrap();
        assert!(other.is_superset(&set));
        assert!(!set.is_superset(&other));

        other.set_intersect(&set);
        assert!(other.set_equals(&set));

        let element = *set.get_any_or(&MAX_VAL);
        assert_ne!(element, MAX_VAL);
        assert_eq!(set.set_replace(element), Some(element));

        set.clear();
        assert_eq!(*set.get_any_or(&MAX_VAL), MAX_VAL);
    }

    #[test]
    fn test_per_instance_hashing() {
        let mut map = HashTable::new_map(FnHashing::new(int32_hash, int32_eq));

        for i in 0..MAX_VAL {
            assert_eq!(map.map_set(i, i).unwrap(), None);
        }

        assert_eq!(map.map_set(0, 1).unwrap(), Some(0));
        assert_eq!(map.map_add(0, 1).unwrap(), Some(&1));
        assert_eq!(map.map_replace(&0, 0), Some(1));
        assert_eq!(map.map_get_or(&0, u32::MAX), 0);

        assert_eq!(map.map_add(MAX_VAL, MAX_VAL).unwrap(), None);
        assert!(map.map_remove(&MAX_VAL));

        for i in 0..MAX_VAL {
            assert_eq!(map.map_pop(&i), Some((i, i)));
        }
    }

    #[test]
    fn test_set_hash_is_order_independent() {
        let state = HashState::default();
        let mut forward = HashTable::new_set(BuildHashing::new(state.clone()));
        let mut backward = HashTable::new_set(BuildHashing::new(state));

        for i in 0..64u64 {
            forward.set_insert(i).unwrap();
        }
        for i in (0..64u64).rev() {
            backward.set_insert(i).unwrap();
        }
        assert_eq!(forward.set_hash(), backward.set_hash());

        backward.set_remove(&5);
        assert_ne!(forward.set_hash(), backward.set_hash());
    }

    #[test]
    fn test_empty_personalities_are_distinct() {
        let map: HashTable<u32, u32, _> = HashTable::new_map(IntHashing);
        let set: HashTable<u32, (), _> = HashTable::new_set(IntHashing);
        assert!(map.is_map());
        assert!(!set.is_map());

        let map_copy = map.copy().unwrap();
        assert!(map_copy.is_map());
        assert_eq!(map_copy.capacity(), 0);

        let as_set = map.copy_as_set().unwrap();
        assert!(!as_set.is_map());
    }

    #[test]
    fn test_copy_preserves_pairs_and_tombstones() {
        let mut map = HashTable::new_map(IntHashing);
        for i in 0..30u32 {
            map.map_set(i, i.to_string()).unwrap();
        }
        for i in 0..10u32 {
            map.map_remove(&i);
        }

        let copy = map.copy().unwrap();
        assert_eq!(copy.len(), map.len());
        assert_eq!(copy.occupied(), map.occupied());
        assert_eq!(copy.capacity(), map.capacity());
        for (key, value) in map.iter() {
            assert_eq!(copy.map_get(key), Some(value));
        }
        assert_invariants(&copy);

        let cloned = copy.clone();
        assert_eq!(cloned.len(), 20);
    }

    #[test]
    fn test_take_leaves_empty_table() {
        let mut map = HashTable::new_map(IntHashing);
        map.map_set(1u32, String::from("one")).unwrap();

        let moved = map.take();
        assert_eq!(moved.map_get(&1), Some(&String::from("one")));
        assert!(map.is_empty());
        assert!(map.is_map());
        assert_eq!(map.capacity(), 0);

        map.map_set(2, String::from("two")).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_clear_drops_entries() {
        let drops = Rc::new(Cell::new(0));
        let mut set = HashTable::new_set(TrackedHashing);
        for key in 0..10u32 {
            set.set_insert(Tracked {
                key,
                drops: drops.clone(),
            })
            .unwrap();
        }

        set.clear();
        assert_eq!(drops.get(), 10);
        assert_eq!(set.get_any().map(|t| t.key), None);
        assert_invariants(&set);
    }

    #[test]
    fn test_into_iter_yields_everything_once() {
        let mut map = HashTable::new_map(IntHashing);
        for i in 0..50u32 {
            map.map_set(i, i * 2).unwrap();
        }
        map.map_remove(&7);

        let mut entries: Vec<(u32, u32)> = map.into_iter().collect();
        entries.sort_unstable();
        assert_eq!(entries.len(), 49);
        assert!(entries.iter().all(|&(k, v)| v == k * 2 && k != 7));
    }

    #[test]
    fn test_iter_is_exact_size() {
        let mut set = sip_set();
        for i in 0..20u64 {
            set.put(i).unwrap();
        }
        let iter = set.iter();
        assert_eq!(iter.len(), 20);
        let mut keys: Vec<u64> = set.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_debug_output() {
        let mut set = HashTable::new_set(IntHashing);
        set.put(1u32).unwrap();
        let out = alloc::format!("{:?}", set);
        assert!(out.contains("personality: Set"));
        assert!(out.contains("count: 1"));
    }

    #[test]
    fn test_probe_histogram_and_stats() {
        let mut set = HashTable::new_set(Colliding);
        for i in 0..5u32 {
            set.put(i).unwrap();
        }
        assert_eq!(set.probe_histogram(), vec![1, 1, 1, 1, 1]);

        set.set_remove(&4);
        let stats = set.debug_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(stats.max_probe, 3);
        assert_eq!(stats.capacity, 8);
        assert!((stats.mean_probe - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_workload_keeps_invariants() {
        use rand::Rng;
        use rand::SeedableRng;
        use rand::rngs::SmallRng;

        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut set = sip_set();
        let mut model = alloc::collections::BTreeSet::new();

        for _ in 0..5000 {
            let key = rng.random_range(0..300u64);
            if rng.random_bool(0.6) {
                let (status, _) = set.put(key).unwrap();
                assert_eq!(status == Insertion::Inserted, model.insert(key));
            } else {
                assert_eq!(set.set_remove(&key), model.remove(&key));
            }
            assert!(set.occupied() <= upper_bound(set.capacity()));
        }

        assert_invariants(&set);
        assert_eq!(set.len(), model.len());
        for key in &model {
            assert!(set.contains(key));
        }
    }
}

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::Insertion;
use crate::error::TableError;
use crate::error::infallible;
use crate::hash_table::HashTable;
use crate::hashing::BuildHashing;
use crate::hashing::FnHashing;
use crate::hashing::KeyHashing;

/// A hash set backed by a set-personality [`HashTable`].
///
/// `HashSet<T, H>` stores values of type `T` and uses the [`KeyHashing`]
/// capability `H` to hash and compare them. No value storage is allocated.
///
/// Methods without a `try_` prefix panic if the allocator fails, like the
/// standard collections.
///
/// # Performance Characteristics
///
/// - **Memory**: 2 bits per bucket overhead, plus the size of `T` for every
///   bucket.
#[derive(Clone)]
pub struct HashSet<T, H> {
    table: HashTable<T, (), H>,
}

impl<T, H> PartialEq for HashSet<T, H>
where
    H: KeyHashing<T>,
{
    fn eq(&self, other: &Self) -> bool {
        self.table.set_equals(&other.table)
    }
}

impl<T, H> Eq for HashSet<T, H> where H: KeyHashing<T> {}

impl<T, H> Debug for HashSet<T, H>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, H> HashSet<T, H> {
    /// Creates an empty set using `hashing` for its values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trihash::HashSet;
    /// use trihash::hashing::IntHashing;
    ///
    /// let set: HashSet<u32, _> = HashSet::with_hashing(IntHashing);
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hashing(hashing: H) -> Self {
        Self {
            table: HashTable::new_set(hashing),
        }
    }

    pub(crate) fn from_table(table: HashTable<T, (), H>) -> Self {
        Self { table }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the hashing capability of the set.
    pub fn hashing(&self) -> &H {
        self.table.hashing()
    }

    /// Returns the underlying table.
    pub fn as_table(&self) -> &HashTable<T, (), H> {
        &self.table
    }

    /// Clears the set, removing all values. Keeps the allocated memory for
    /// reuse.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all elements in arbitrary order.
    pub fn iter(&self) -> Iter<'_, T, H> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns some element of the set, or `None` if it is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut set = HashSet::with_hashing(IntHashing);
    /// assert_eq!(set.get_any(), None);
    ///
    /// set.insert(5u8);
    /// assert_eq!(set.get_any(), Some(&5));
    /// ```
    pub fn get_any(&self) -> Option<&T> {
        self.table.get_any()
    }

    /// Returns some element of the set, or `if_empty` if it is empty.
    pub fn get_any_or<'a>(&'a self, if_empty: &'a T) -> &'a T {
        self.table.get_any_or(if_empty)
    }

    /// Deep copy of the set, tombstones included.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, TableError>
    where
        T: Clone,
        H: Clone,
    {
        Ok(Self {
            table: self.table.copy()?,
        })
    }
}

impl<T, H> HashSet<T, H>
where
    H: KeyHashing<T>,
{
    /// Creates an empty set with room for at least `capacity` elements.
    pub fn with_capacity_and_hashing(capacity: usize, hashing: H) -> Self {
        let mut set = Self::with_hashing(hashing);
        set.reserve(capacity);
        set
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.try_reserve(additional));
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated; the set is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TableError> {
        self.table.reserve(additional)
    }

    /// Rehashes the set into at least `buckets` buckets.
    ///
    /// Requests too small to hold the current elements are ignored.
    pub fn resize(&mut self, buckets: usize) {
        infallible(self.try_resize(buckets));
    }

    /// Fallible version of [`resize`](Self::resize).
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated; the set is left unchanged.
    pub fn try_resize(&mut self, buckets: usize) -> Result<(), TableError> {
        self.table.resize(buckets)
    }

    /// Shrinks the capacity of the set as much as possible, dropping
    /// tombstones left by removals.
    pub fn shrink_to_fit(&mut self) {
        infallible(self.table.shrink_to_fit());
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal stored value
    /// is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut set = HashSet::with_hashing(IntHashing);
    /// assert!(set.insert(2u32));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        infallible(self.try_insert(value)).is_inserted()
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Fails if a required resize cannot allocate; the set is left
    /// unchanged.
    pub fn try_insert(&mut self, value: T) -> Result<Insertion, TableError> {
        self.table.set_insert(value)
    }

    /// Adds a value to the set, returning the equal value already stored if
    /// there is one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::StrHashing;
    /// #
    /// let mut set = HashSet::with_hashing(StrHashing);
    /// assert_eq!(set.insert_get_existing("a"), None);
    /// assert_eq!(set.insert_get_existing("a"), Some(&"a"));
    /// ```
    pub fn insert_get_existing(&mut self, value: T) -> Option<&T> {
        infallible(self.table.set_insert_get_existing(value))
    }

    /// Adds every value of `values`, returning `true` if at least one was
    /// new.
    pub fn insert_all<I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        infallible(self.try_insert_all(values)).is_inserted()
    }

    /// Fallible version of [`insert_all`](Self::insert_all).
    ///
    /// # Errors
    ///
    /// Stops at the first allocation failure. Values inserted before the
    /// failure stay in the set.
    pub fn try_insert_all<I>(&mut self, values: I) -> Result<Insertion, TableError>
    where
        I: IntoIterator<Item = T>,
    {
        self.table.set_insert_all(values)
    }

    /// Replaces the stored value equal to `value`, returning the replaced
    /// value.
    ///
    /// Absent values are not inserted.
    pub fn replace(&mut self, value: T) -> Option<T> {
        self.table.set_replace(value)
    }

    /// Returns `true` if the set contains a value.
    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.table
            .get(value)
            .and_then(|index| self.table.key_at(index))
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.table.set_remove(value)
    }

    /// Removes and returns the stored value equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.table.set_pop(value)
    }

    /// Returns `true` if `self` contains every element of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut a = HashSet::with_hashing(IntHashing);
    /// a.insert_all([1u32, 2, 3]);
    ///
    /// let mut b = HashSet::with_hashing(IntHashing);
    /// b.insert_all([1u32, 2]);
    ///
    /// assert!(a.is_superset(&b));
    /// assert!(!b.is_superset(&a));
    /// ```
    pub fn is_superset<G>(&self, other: &HashSet<T, G>) -> bool {
        self.table.is_superset(&other.table)
    }

    /// Returns `true` if `other` contains every element of `self`.
    pub fn is_subset<G>(&self, other: &HashSet<T, G>) -> bool
    where
        G: KeyHashing<T>,
    {
        self.len() <= other.len() && other.table.is_superset(&self.table)
    }

    /// Returns `true` if `self` has no elements in common with `other`.
    pub fn is_disjoint<G>(&self, other: &HashSet<T, G>) -> bool {
        other.iter().all(|value| !self.contains(value))
    }

    /// Adds a copy of every element of `other` to `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut a = HashSet::with_hashing(IntHashing);
    /// a.insert_all([1u32, 2]);
    ///
    /// let mut b = HashSet::with_hashing(IntHashing);
    /// b.insert_all([2u32, 3]);
    ///
    /// a.union_with(&b);
    /// assert_eq!(a.len(), 3);
    /// ```
    pub fn union_with<G>(&mut self, other: &HashSet<T, G>)
    where
        T: Clone,
    {
        infallible(self.table.set_union(&other.table));
    }

    /// Removes every element of `self` that `other` does not contain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut a = HashSet::with_hashing(IntHashing);
    /// a.insert_all([1u32, 2]);
    ///
    /// let mut b = HashSet::with_hashing(IntHashing);
    /// b.insert_all([2u32, 3]);
    ///
    /// a.intersect_with(&b);
    /// assert_eq!(a.get_any(), Some(&2));
    /// assert_eq!(a.len(), 1);
    /// ```
    pub fn intersect_with<G>(&mut self, other: &HashSet<T, G>)
    where
        G: KeyHashing<T>,
    {
        self.table.set_intersect(&other.table);
    }

    /// Order-independent hash of the elements.
    ///
    /// Sets with equal elements and the same hashing have equal set hashes.
    pub fn set_hash(&self) -> u64 {
        self.table.set_hash()
    }

    /// Retains only the elements for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let mut index = self.table.next_index(0);
        while index < self.table.capacity() {
            if let Some(value) = self.table.key_at(index)
                && !keep(value)
            {
                self.table.delete(index);
            }
            index = self.table.next_index(index + 1);
        }
    }
}

impl<T, S> HashSet<T, BuildHashing<S>>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set hashing values with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trihash::HashSet;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut set = HashSet::with_hasher(SimpleHasher);
    /// set.insert("value");
    /// assert!(set.contains(&"value"));
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hashing(BuildHashing::new(hash_builder))
    }

    /// Creates an empty set with room for at least `capacity` elements,
    /// hashing values with the given hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hashing(capacity, BuildHashing::new(hash_builder))
    }
}

impl<T> HashSet<T, FnHashing<T>> {
    /// Creates an empty set that hashes and compares values with the given
    /// functions.
    pub fn with_functions(hash: fn(&T) -> u64, equals: fn(&T, &T) -> bool) -> Self {
        Self::with_hashing(FnHashing::new(hash, equals))
    }
}

impl<T, H> HashSet<T, H>
where
    H: KeyHashing<T> + Default,
{
    /// Creates an empty set using the default hashing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashSet;
    /// # use trihash::hashing::DefaultHashing;
    /// #
    /// let set: HashSet<i32, DefaultHashing> = HashSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hashing(H::default())
    }

    /// Creates an empty set with room for at least `capacity` elements using
    /// the default hashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hashing(capacity, H::default())
    }
}

impl<T, H> Default for HashSet<T, H>
where
    H: KeyHashing<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the elements of a `HashSet`.
pub struct Iter<'a, T, H> {
    inner: crate::hash_table::Iter<'a, T, (), H>,
}

impl<'a, T, H> Iterator for Iter<'a, T, H> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, _)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, H> ExactSizeIterator for Iter<'_, T, H> {}

/// An owning iterator over the elements of a `HashSet`.
pub struct IntoIter<T, H> {
    inner: crate::hash_table::IntoIter<T, (), H>,
}

impl<T, H> Iterator for IntoIter<T, H> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, _)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, H> IntoIterator for HashSet<T, H> {
    type IntoIter = IntoIter<T, H>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, H> IntoIterator for &'a HashSet<T, H> {
    type IntoIter = Iter<'a, T, H>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, H> FromIterator<T> for HashSet<T, H>
where
    H: KeyHashing<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.insert_all(iter);
        set
    }
}

impl<T, H> Extend<T> for HashSet<T, H>
where
    H: KeyHashing<T>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

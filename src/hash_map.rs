use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::TableError;
use crate::error::infallible;
use crate::hash_set::HashSet;
use crate::hash_table::HashTable;
use crate::hashing::BuildHashing;
use crate::hashing::FnHashing;
use crate::hashing::KeyHashing;

/// A hash map backed by a map-personality [`HashTable`].
///
/// `HashMap<K, V, H>` stores key-value pairs and uses the [`KeyHashing`]
/// capability `H` to hash and compare keys. `H` is either fixed by type
/// ([`BuildHashing`], [`IntHashing`](crate::hashing::IntHashing), ...) or a
/// per-instance pair of functions ([`FnHashing`]).
///
/// Methods without a `try_` prefix panic if the allocator fails, like the
/// standard collections.
///
/// # Performance Characteristics
///
/// - **Memory**: 2 bits per bucket overhead, plus the size of `K` and `V`
///   for every bucket.
#[derive(Clone)]
pub struct HashMap<K, V, H> {
    table: HashTable<K, V, H>,
}

impl<K, V, H> Debug for HashMap<K, V, H>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, H> HashMap<K, V, H> {
    /// Creates an empty map using `hashing` for its keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use trihash::HashMap;
    /// use trihash::hashing::IntHashing;
    ///
    /// let map: HashMap<i32, String, _> = HashMap::with_hashing(IntHashing);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hashing(hashing: H) -> Self {
        Self {
            table: HashTable::new_map(hashing),
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of buckets.
    ///
    /// The map holds [`MAX_LOAD`](crate::hash_table::MAX_LOAD) times this
    /// many entries before it resizes.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the hashing capability of the map.
    pub fn hashing(&self) -> &H {
        self.table.hashing()
    }

    /// Returns the underlying table.
    pub fn as_table(&self) -> &HashTable<K, V, H> {
        &self.table
    }

    /// Clears the map, removing all key-value pairs. Keeps the allocated
    /// memory for reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// map.insert(1u8, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// map.insert(1u32, "a");
    /// map.insert(2, "b");
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, vec![(&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, H> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all keys in arbitrary order.
    pub fn keys(&self) -> Keys<'_, K, V, H> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn values(&self) -> Values<'_, K, V, H> {
        Values { inner: self.iter() }
    }

    /// Deep copy of the map, tombstones included.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, TableError>
    where
        K: Clone,
        V: Clone,
        H: Clone,
    {
        Ok(Self {
            table: self.table.copy()?,
        })
    }

    /// Copies the keys of the map into a new set with the same hashing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// map.insert(3u64, "three");
    ///
    /// let keys = map.key_set();
    /// assert!(keys.contains(&3));
    /// assert_eq!(keys.len(), 1);
    /// ```
    pub fn key_set(&self) -> HashSet<K, H>
    where
        K: Clone,
        H: Clone,
    {
        HashSet::from_table(infallible(self.table.copy_as_set()))
    }
}

impl<K, V, H> HashMap<K, V, H>
where
    H: KeyHashing<K>,
{
    /// Creates an empty map with room for at least `capacity` entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let map: HashMap<u32, String, _> = HashMap::with_capacity_and_hashing(100, IntHashing);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hashing(capacity: usize, hashing: H) -> Self {
        let mut map = Self::with_hashing(hashing);
        map.reserve(capacity);
        map
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        infallible(self.try_reserve(additional));
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated; the map is left unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TableError> {
        self.table.reserve(additional)
    }

    /// Rehashes the map into at least `buckets` buckets.
    ///
    /// Requests too small to hold the current entries are ignored.
    pub fn resize(&mut self, buckets: usize) {
        infallible(self.try_resize(buckets));
    }

    /// Fallible version of [`resize`](Self::resize).
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be allocated; the map is left unchanged.
    pub fn try_resize(&mut self, buckets: usize) -> Result<(), TableError> {
        self.table.resize(buckets)
    }

    /// Shrinks the capacity of the map as much as possible, dropping
    /// tombstones left by removals.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_capacity_and_hashing(100, IntHashing);
    /// map.insert(1u16, "one");
    /// map.insert(2, "two");
    ///
    /// map.shrink_to_fit();
    /// assert!(map.capacity() < 100);
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        infallible(self.table.shrink_to_fit());
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    /// If the map did have this key present, the value is updated, and the old
    /// value is returned. The stored key is not replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// assert_eq!(map.insert(37u32, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        infallible(self.try_insert(key, value))
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Fails if a required resize cannot allocate; the map is left
    /// unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        self.table.map_set(key, value)
    }

    /// Inserts a key-value pair only if the key is absent.
    ///
    /// Returns the value already stored for the key, in which case `value`
    /// is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// assert_eq!(map.add(1u8, "a"), None);
    /// assert_eq!(map.add(1, "b"), Some(&"a"));
    /// ```
    pub fn add(&mut self, key: K, value: V) -> Option<&V> {
        infallible(self.try_add(key, value))
    }

    /// Fallible version of [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// Fails if a required resize cannot allocate; the map is left
    /// unchanged.
    pub fn try_add(&mut self, key: K, value: V) -> Result<Option<&V>, TableError> {
        self.table.map_add(key, value)
    }

    /// Overwrites the value of a present key, returning the old value.
    ///
    /// Absent keys are not inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// assert_eq!(map.replace(&1u8, "a"), None);
    /// assert!(map.is_empty());
    ///
    /// map.insert(1, "a");
    /// assert_eq!(map.replace(&1, "b"), Some("a"));
    /// ```
    pub fn replace(&mut self, key: &K, value: V) -> Option<V> {
        self.table.map_replace(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.map_get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.table.map_get_mut(key)
    }

    /// Returns a copy of the value for `key`, or `default` when the key is
    /// absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// map.insert(1u8, 10u32);
    /// assert_eq!(map.get_or(&1, 0), 10);
    /// assert_eq!(map.get_or(&2, 0), 0);
    /// ```
    pub fn get_or(&self, key: &K, default: V) -> V
    where
        V: Clone,
    {
        self.table.map_get_or(key, default)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::IntHashing;
    /// #
    /// let mut map = HashMap::with_hashing(IntHashing);
    /// map.insert(1u32, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.table.map_pop(key)
    }

    /// Retains only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        let mut index = self.table.next_index(0);
        while index < self.table.capacity() {
            if let Some((key, value)) = self.table.entry_at_mut(index)
                && !keep(key, value)
            {
                self.table.delete(index);
            }
            index = self.table.next_index(index + 1);
        }
    }
}

impl<K, V, S> HashMap<K, V, BuildHashing<S>>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map hashing keys with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use trihash::HashMap;
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
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert("key", 1);
    /// assert_eq!(map.get(&"key"), Some(&1));
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hashing(BuildHashing::new(hash_builder))
    }

    /// Creates an empty map with room for at least `capacity` entries,
    /// hashing keys with the given hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_and_hashing(capacity, BuildHashing::new(hash_builder))
    }
}

impl<K, V> HashMap<K, V, FnHashing<K>> {
    /// Creates an empty map that hashes and compares keys with the given
    /// functions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// #
    /// fn hash(key: &String) -> u64 {
    ///     trihash::hashing::str_hash(&key.to_lowercase())
    /// }
    ///
    /// fn equals(lhs: &String, rhs: &String) -> bool {
    ///     lhs.eq_ignore_ascii_case(rhs)
    /// }
    ///
    /// let mut map = HashMap::with_functions(hash, equals);
    /// map.insert("Key".to_string(), 1);
    /// assert_eq!(map.get(&"KEY".to_string()), Some(&1));
    /// ```
    pub fn with_functions(hash: fn(&K) -> u64, equals: fn(&K, &K) -> bool) -> Self {
        Self::with_hashing(FnHashing::new(hash, equals))
    }
}

impl<K, V, H> HashMap<K, V, H>
where
    H: KeyHashing<K> + Default,
{
    /// Creates an empty map using the default hashing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use trihash::HashMap;
    /// # use trihash::hashing::DefaultHashing;
    /// #
    /// let map: HashMap<i32, String, DefaultHashing> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hashing(H::default())
    }

    /// Creates an empty map with room for at least `capacity` entries using
    /// the default hashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hashing(capacity, H::default())
    }
}

impl<K, V, H> Default for HashMap<K, V, H>
where
    H: KeyHashing<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> PartialEq for HashMap<K, V, H>
where
    V: PartialEq,
    H: KeyHashing<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V, H> Eq for HashMap<K, V, H>
where
    V: Eq,
    H: KeyHashing<K>,
{
}

impl<K, V, H> Extend<(K, V)> for HashMap<K, V, H>
where
    H: KeyHashing<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, H> FromIterator<(K, V)> for HashMap<K, V, H>
where
    H: KeyHashing<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, H> IntoIterator for &'a HashMap<K, V, H> {
    type IntoIter = Iter<'a, K, V, H>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, H> IntoIterator for HashMap<K, V, H> {
    type IntoIter = IntoIter<K, V, H>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V, H> {
    inner: crate::hash_table::Iter<'a, K, V, H>,
}

impl<'a, K, V, H> Iterator for Iter<'a, K, V, H> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, H> ExactSizeIterator for Iter<'_, K, V, H> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, H> {
    inner: Iter<'a, K, V, H>,
}

impl<'a, K, V, H> Iterator for Keys<'a, K, V, H> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, H> {
    inner: Iter<'a, K, V, H>,
}

impl<'a, K, V, H> Iterator for Values<'a, K, V, H> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V, H> {
    inner: crate::hash_table::IntoIter<K, V, H>,
}

impl<K, V, H> Iterator for IntoIter<K, V, H> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

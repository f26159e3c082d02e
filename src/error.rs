use thiserror::Error;

/// Outcome of a successful insertion attempt.
///
/// Neither variant is a failure: callers branch on whether the key was
/// already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Insertion {
    /// The key was absent and has been placed in the table.
    Inserted,
    /// The key was already present; the stored key was left untouched.
    Present,
}

impl Insertion {
    /// Returns `true` for [`Insertion::Inserted`].
    pub fn is_inserted(self) -> bool {
        matches!(self, Insertion::Inserted)
    }
}

/// Errors reported by the table.
///
/// A failed resize leaves the table exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The allocator refused to provide storage for the requested bucket
    /// count.
    #[error("failed to allocate storage for {buckets} buckets")]
    AllocationFailed {
        /// Bucket count that was being allocated.
        buckets: usize,
    },
    /// The requested capacity cannot be rounded up to a power of two.
    #[error("requested capacity {requested} overflows the bucket count")]
    CapacityOverflow {
        /// Capacity that was requested.
        requested: usize,
    },
}

/// Unwraps the result of an operation whose infallible facade panics on
/// allocation failure, like the standard collections.
#[track_caller]
pub(crate) fn infallible<T>(result: Result<T, TableError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TableError::AllocationFailed { buckets: 64 };
        assert_eq!(err.to_string(), "failed to allocate storage for 64 buckets");

        let err = TableError::CapacityOverflow {
            requested: usize::MAX,
        };
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    #[should_panic(expected = "failed to allocate storage for 8 buckets")]
    fn test_infallible_panics_with_message() {
        infallible::<()>(Err(TableError::AllocationFailed { buckets: 8 }));
    }

    #[test]
    fn test_insertion_flag() {
        assert!(Insertion::Inserted.is_inserted());
        assert!(!Insertion::Present.is_inserted());
    }
}

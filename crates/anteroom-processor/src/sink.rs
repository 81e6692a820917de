//! Destination for admitted tokens.

use anteroom_state::{AdmissionStore, AllowListEntry, StoreError};

/// A durable allow-list writer.
///
/// `admit_batch` must be all-or-nothing: on `Ok` every entry is durably
/// stored, on `Err` none is. The processor uses the outcome to decide
/// whether the batch's queue messages may be deleted.
pub trait AllowSink: Send + Sync {
    fn admit_batch(&self, entries: &[AllowListEntry]) -> Result<(), StoreError>;
}

impl AllowSink for AdmissionStore {
    fn admit_batch(&self, entries: &[AllowListEntry]) -> Result<(), StoreError> {
        self.put_entries(entries)
    }
}

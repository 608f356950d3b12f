//! Storage seams for bookings and uploaded documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::model::{BookingId, BookingRecord, BookingStatus, NewBooking};

/// Persistence for confirmed dialogue outcomes.
///
/// Implementations must check slot uniqueness and insert atomically:
/// when a non-cancelled booking already exists for the same date and
/// time, `save_booking` returns [`StoreError::SlotTaken`] rather than
/// writing a second booking.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn save_booking(&self, booking: NewBooking) -> Result<BookingId, StoreError>;

    async fn list_bookings(&self) -> Result<Vec<BookingRecord>, StoreError>;
}

/// Records documents a patient uploaded for their knowledge base.
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save_upload(&self, user_id: &str, path: &Path, original_name: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct BookingTable {
    next_id: u64,
    records: Vec<BookingRecord>,
}

/// A process-local booking store.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    table: RwLock<BookingTable>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with existing bookings.
    pub fn with_bookings(records: impl IntoIterator<Item = BookingRecord>) -> Self {
        let records: Vec<BookingRecord> = records.into_iter().collect();
        let next_id = records.iter().map(|record| record.id.0).max().unwrap_or(0);
        Self { table: RwLock::new(BookingTable { next_id, records }) }
    }

    pub async fn get(&self, id: BookingId) -> Option<BookingRecord> {
        self.table.read().await.records.iter().find(|record| record.id == id).cloned()
    }

    /// Moves a booking to `status`. Returns false when the id is unknown.
    pub async fn update_status(&self, id: BookingId, status: BookingStatus) -> bool {
        let mut table = self.table.write().await;
        match table.records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.status = status;
                debug!(booking_id = %id, status = ?status, "Updated booking status");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.records.is_empty()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn save_booking(&self, booking: NewBooking) -> Result<BookingId, StoreError> {
        let mut table = self.table.write().await;
        if table.records.iter().any(|record| record.conflicts_with(booking.date, booking.time)) {
            return Err(StoreError::SlotTaken { date: booking.date, time: booking.time });
        }

        table.next_id += 1;
        let id = BookingId(table.next_id);
        table.records.push(BookingRecord {
            id,
            user_id: booking.user_id,
            date: booking.date,
            time: booking.time,
            reason: booking.reason,
            booking_type: Some(booking.booking_type),
            status: BookingStatus::Pending,
        });
        info!(booking_id = %id, "Saved booking");
        Ok(id)
    }

    async fn list_bookings(&self) -> Result<Vec<BookingRecord>, StoreError> {
        Ok(self.table.read().await.records.clone())
    }
}

/// A document upload as recorded by [`InMemoryUploadStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub user_id: String,
    pub path: PathBuf,
    pub original_name: String,
}

#[derive(Debug, Default)]
pub struct InMemoryUploadStore {
    uploads: RwLock<Vec<UploadRecord>>,
}

impl InMemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn uploads_for(&self, user_id: &str) -> Vec<UploadRecord> {
        self.uploads.read().await.iter().filter(|upload| upload.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl UploadStore for InMemoryUploadStore {
    async fn save_upload(&self, user_id: &str, path: &Path, original_name: &str) -> Result<(), StoreError> {
        self.uploads.write().await.push(UploadRecord {
            user_id: user_id.to_string(),
            path: path.to_path_buf(),
            original_name: original_name.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn booking(user: &str, hour: u32) -> NewBooking {
        NewBooking {
            user_id: user.to_string(),
            date: NaiveDate::from_ymd_opt(2030, 5, 6).unwrap(),
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            reason: "Cleaning (via chatbot)".to_string(),
            booking_type: "Cleaning".to_string(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids_and_pending_status() {
        let store = InMemoryBookingStore::new();
        let first = store.save_booking(booking("a", 9)).await.unwrap();
        let second = store.save_booking(booking("b", 10)).await.unwrap();
        assert!(second > first);

        let record = store.get(first).await.unwrap();
        assert_eq!(record.status, BookingStatus::Pending);
        assert_eq!(record.booking_type.as_deref(), Some("Cleaning"));
    }

    #[tokio::test]
    async fn rejects_second_booking_for_same_slot() {
        let store = InMemoryBookingStore::new();
        store.save_booking(booking("a", 9)).await.unwrap();

        let err = store.save_booking(booking("b", 9)).await.unwrap_err();
        assert!(matches!(err, StoreError::SlotTaken { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn cancelled_booking_frees_its_slot() {
        let store = InMemoryBookingStore::new();
        let id = store.save_booking(booking("a", 9)).await.unwrap();
        assert!(store.update_status(id, BookingStatus::Cancelled).await);

        store.save_booking(booking("b", 9)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn seeded_store_continues_numbering() {
        let existing = BookingRecord {
            id: BookingId(41),
            user_id: "a".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 5, 6).unwrap(),
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            reason: "Check-up".to_string(),
            booking_type: None,
            status: BookingStatus::Confirmed,
        };
        let store = InMemoryBookingStore::with_bookings([existing]);
        assert_eq!(store.save_booking(booking("b", 9)).await.unwrap(), BookingId(42));
    }

    #[tokio::test]
    async fn uploads_are_listed_per_user() {
        let store = InMemoryUploadStore::new();
        store.save_upload("a", Path::new("/tmp/a.txt"), "a.txt").await.unwrap();
        store.save_upload("b", Path::new("/tmp/b.txt"), "b.txt").await.unwrap();

        let uploads = store.uploads_for("a").await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].original_name, "a.txt");
    }
}

//! Store traits — the relational collaborator the allocation pipeline needs.
//!
//! A [`ClassStore`] answers the read queries (eligible students, generated
//! classes with their enrollment counts, the stored sequence counter) and
//! hands out a [`StoreTransaction`] for writes. Every write of a run goes
//! through a single transaction so a plan is applied completely or not at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::eligibility::EligibilityFilter;
use crate::error::StoreError;
use crate::model::{ClassId, NewClass, StudentId};

/// An existing class together with its current enrollment count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEnrollment {
    pub id: ClassId,
    pub name: String,
    /// Number of enrollment rows referencing the class (0 when empty)
    pub enrolled: usize,
}

/// Read access plus transactional writes against the class database.
#[async_trait]
pub trait ClassStore: Send + Sync {
    /// Human-readable backend name (e.g. "sqlite").
    fn name(&self) -> &str;

    /// Students matching the filter who hold no enrollment, in ascending id order.
    async fn eligible_students(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<StudentId>, StoreError>;

    /// Classes whose name starts with `prefix`, oldest first.
    async fn classes_with_prefix(&self, prefix: &str) -> Result<Vec<ClassEnrollment>, StoreError>;

    /// The explicit sequence counter, if one has been recorded.
    async fn stored_sequence(&self) -> Result<Option<u64>, StoreError>;

    /// Open a write transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// A unit of work. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert a class row and return the identity the store assigned.
    async fn create_class(&mut self, class: &NewClass) -> Result<ClassId, StoreError>;

    /// Insert one enrollment row per student.
    async fn enroll(&mut self, class_id: ClassId, students: &[StudentId])
    -> Result<(), StoreError>;

    /// Raise the stored sequence counter to `next` (never lowers it).
    async fn advance_sequence(&mut self, next: u64) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

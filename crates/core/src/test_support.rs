//! Scripted collaborators for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::allocator::{SizeBounds, SizeSource};
use crate::eligibility::EligibilityFilter;
use crate::error::StoreError;
use crate::model::{ClassId, NewClass, StudentId};
use crate::store::{ClassEnrollment, ClassStore, StoreTransaction};

/// Returns the scripted sizes in order, then repeats the last one.
pub struct ScriptedSizes {
    sizes: Vec<usize>,
    cursor: usize,
}

impl ScriptedSizes {
    pub fn new(sizes: &[usize]) -> Self {
        assert!(!sizes.is_empty(), "ScriptedSizes needs at least one size");
        Self {
            sizes: sizes.to_vec(),
            cursor: 0,
        }
    }
}

impl SizeSource for ScriptedSizes {
    fn draw(&mut self, _bounds: SizeBounds) -> usize {
        let size = self.sizes[self.cursor.min(self.sizes.len() - 1)];
        self.cursor += 1;
        size
    }
}

/// A write that reached a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateClass { id: ClassId, name: String },
    Enroll { class_id: ClassId, student: StudentId },
    AdvanceSequence(u64),
}

/// A store answering from fixed data and recording committed writes.
#[derive(Default)]
pub struct ScriptedStore {
    candidates: Vec<StudentId>,
    classes: Vec<ClassEnrollment>,
    sequence: Option<u64>,
    fail_on: Option<StudentId>,
    queries: AtomicUsize,
    committed: Arc<Mutex<Vec<Op>>>,
    rolled_back: Arc<AtomicBool>,
}

impl ScriptedStore {
    pub fn with_candidates(ids: &[i64]) -> Self {
        Self {
            candidates: ids.iter().copied().map(StudentId).collect(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, id: i64, name: &str, enrolled: usize) -> Self {
        self.classes.push(ClassEnrollment {
            id: ClassId(id),
            name: name.into(),
            enrolled,
        });
        self
    }

    pub fn with_sequence(mut self, next: u64) -> Self {
        self.sequence = Some(next);
        self
    }

    /// Make enrolling this student fail inside the transaction.
    pub fn failing_on(mut self, student: i64) -> Self {
        self.fail_on = Some(StudentId(student));
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> Vec<Op> {
        self.committed.lock().unwrap().clone()
    }

    pub fn rolled_back(&self) -> bool {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn eligible_students(
        &self,
        _filter: &EligibilityFilter,
    ) -> Result<Vec<StudentId>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.clone())
    }

    async fn classes_with_prefix(&self, prefix: &str) -> Result<Vec<ClassEnrollment>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .classes
            .iter()
            .filter(|c| c.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn stored_sequence(&self) -> Result<Option<u64>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.sequence)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let next_id = self.classes.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        Ok(Box::new(ScriptedTransaction {
            ops: Vec::new(),
            next_id,
            fail_on: self.fail_on,
            committed: Arc::clone(&self.committed),
            rolled_back: Arc::clone(&self.rolled_back),
        }))
    }
}

struct ScriptedTransaction {
    ops: Vec<Op>,
    next_id: i64,
    fail_on: Option<StudentId>,
    committed: Arc<Mutex<Vec<Op>>>,
    rolled_back: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTransaction for ScriptedTransaction {
    async fn create_class(&mut self, class: &NewClass) -> Result<ClassId, StoreError> {
        let id = ClassId(self.next_id);
        self.next_id += 1;
        self.ops.push(Op::CreateClass {
            id,
            name: class.name.clone(),
        });
        Ok(id)
    }

    async fn enroll(
        &mut self,
        class_id: ClassId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        for &student in students {
            if Some(student) == self.fail_on {
                return Err(StoreError::WriteFailed(format!(
                    "enrollment of student {student} rejected"
                )));
            }
            self.ops.push(Op::Enroll { class_id, student });
        }
        Ok(())
    }

    async fn advance_sequence(&mut self, next: u64) -> Result<(), StoreError> {
        self.ops.push(Op::AdvanceSequence(next));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.committed.lock().unwrap().extend(this.ops);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.rolled_back.store(true, Ordering::SeqCst);
        Ok(())
    }
}

//! In-memory store — useful for testing without a database.
//!
//! Transactions work on a private copy of the state and swap it in on
//! commit, so a failed plan leaves nothing behind.

use async_trait::async_trait;
use classbatch_core::{
    ClassEnrollment, ClassId, ClassStore, EducatorId, EligibilityFilter, NewClass, StoreError,
    StoreTransaction, StudentId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::admission::{AdmissionStore, Measurement, StudentRecord};

#[derive(Debug, Clone)]
struct ClassRow {
    id: ClassId,
    name: String,
    code: String,
}

#[derive(Debug, Clone, Default)]
struct State {
    students: BTreeMap<StudentId, StudentRecord>,
    measurements: BTreeMap<(StudentId, i64), Measurement>,
    classes: Vec<ClassRow>,
    enrollments: BTreeMap<StudentId, ClassId>,
    sequence: Option<u64>,
    last_class_id: i64,
}

impl State {
    fn insert_class(&mut self, name: &str, code: &str) -> Result<ClassId, StoreError> {
        if self.classes.iter().any(|c| c.name == name || c.code == code) {
            return Err(StoreError::WriteFailed(format!(
                "class name or code already exists: {name:?}"
            )));
        }
        self.last_class_id += 1;
        let id = ClassId(self.last_class_id);
        self.classes.push(ClassRow {
            id,
            name: name.to_string(),
            code: code.to_string(),
        });
        Ok(id)
    }

    fn insert_enrollment(&mut self, student: StudentId, class_id: ClassId) -> Result<(), StoreError> {
        if !self.students.contains_key(&student) {
            return Err(StoreError::WriteFailed(format!("unknown student {student}")));
        }
        if !self.classes.iter().any(|c| c.id == class_id) {
            return Err(StoreError::WriteFailed(format!("unknown class {class_id}")));
        }
        if self.enrollments.contains_key(&student) {
            return Err(StoreError::WriteFailed(format!(
                "student {student} is already enrolled"
            )));
        }
        self.enrollments.insert(student, class_id);
        Ok(())
    }

    fn complete_measurements(&self, student: StudentId) -> usize {
        self.measurements
            .range((student, i64::MIN)..=(student, i64::MAX))
            .filter(|(_, m)| m.is_complete())
            .count()
    }
}

/// A class store backed by process memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrollment count per class id.
    pub async fn class_sizes(&self) -> BTreeMap<ClassId, usize> {
        let state = self.state.read().await;
        let mut sizes: BTreeMap<ClassId, usize> =
            state.classes.iter().map(|c| (c.id, 0)).collect();
        for class_id in state.enrollments.values() {
            *sizes.entry(*class_id).or_default() += 1;
        }
        sizes
    }
}

#[async_trait]
impl ClassStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn eligible_students(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<StudentId>, StoreError> {
        let state = self.state.read().await;
        let required = filter.required_measurements as usize;

        Ok(state
            .students
            .values()
            .filter(|s| !filter.require_seed || s.seed)
            .filter(|s| filter.admits_team_member(s.team_member.as_deref()))
            .filter(|s| !state.enrollments.contains_key(&s.id))
            .filter(|s| state.complete_measurements(s.id) >= required)
            .map(|s| s.id)
            .collect())
    }

    async fn classes_with_prefix(&self, prefix: &str) -> Result<Vec<ClassEnrollment>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .classes
            .iter()
            .filter(|c| c.name.starts_with(prefix))
            .map(|c| ClassEnrollment {
                id: c.id,
                name: c.name.clone(),
                enrolled: state.enrollments.values().filter(|id| **id == c.id).count(),
            })
            .collect())
    }

    async fn stored_sequence(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.state.read().await.sequence)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let staged = self.state.read().await.clone();
        Ok(Box::new(InMemoryTransaction {
            staged,
            target: Arc::clone(&self.state),
        }))
    }
}

struct InMemoryTransaction {
    staged: State,
    target: Arc<RwLock<State>>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn create_class(&mut self, class: &NewClass) -> Result<ClassId, StoreError> {
        self.staged.insert_class(&class.name, &class.code)
    }

    async fn enroll(
        &mut self,
        class_id: ClassId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        for &student in students {
            self.staged.insert_enrollment(student, class_id)?;
        }
        Ok(())
    }

    async fn advance_sequence(&mut self, next: u64) -> Result<(), StoreError> {
        let current = self.staged.sequence.unwrap_or(0);
        self.staged.sequence = Some(current.max(next));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        *this.target.write().await = this.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AdmissionStore for InMemoryStore {
    async fn add_student(&self, student: &StudentRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.students.contains_key(&student.id) {
            return Err(StoreError::WriteFailed(format!(
                "student {} already exists",
                student.id
            )));
        }
        state.students.insert(student.id, student.clone());
        Ok(())
    }

    async fn record_measurement(&self, measurement: &Measurement) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&measurement.student_id) {
            return Err(StoreError::WriteFailed(format!(
                "unknown student {}",
                measurement.student_id
            )));
        }
        state.measurements.insert(
            (measurement.student_id, measurement.galaxy_id),
            measurement.clone(),
        );
        Ok(())
    }

    async fn add_class(
        &self,
        name: &str,
        code: &str,
        _educator_id: EducatorId,
    ) -> Result<ClassId, StoreError> {
        self.state.write().await.insert_class(name, code)
    }

    async fn add_enrollment(
        &self,
        student: StudentId,
        class_id: ClassId,
    ) -> Result<(), StoreError> {
        self.state.write().await.insert_enrollment(student, class_id)
    }

    async fn enrollments(&self) -> Result<Vec<(StudentId, ClassId)>, StoreError> {
        let state = self.state.read().await;
        Ok(state.enrollments.iter().map(|(s, c)| (*s, *c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classbatch_core::{
        AllocationRequest, ClassNaming, RandomSizes, commit_plan, run_allocation,
    };

    async fn store_with_students(n: i64) -> InMemoryStore {
        let store = InMemoryStore::new();
        for id in 1..=n {
            store.add_measured_student(id, 5).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn eligibility_applies_every_predicate() {
        let store = store_with_students(3).await;

        // Not in the cohort
        store
            .add_student(&StudentRecord {
                id: StudentId(4),
                seed: false,
                team_member: None,
            })
            .await
            .unwrap();
        // Excluded team member
        store
            .add_student(&StudentRecord {
                id: StudentId(5),
                seed: true,
                team_member: Some("jon".into()),
            })
            .await
            .unwrap();
        // Only four complete galaxies
        store.add_measured_student(6, 4).await.unwrap();
        // Fifth galaxy missing a value
        store.add_measured_student(7, 4).await.unwrap();
        let mut partial = Measurement::complete(StudentId(7), 5);
        partial.velocity_value = None;
        store.record_measurement(&partial).await.unwrap();
        for galaxy in 1..=5 {
            for id in [4, 5] {
                store
                    .record_measurement(&Measurement::complete(StudentId(id), galaxy))
                    .await
                    .unwrap();
            }
        }
        // Already enrolled
        let class_id = store
            .add_class("Astronomy 101", "ASTRO", EducatorId(1))
            .await
            .unwrap();
        store.add_enrollment(StudentId(2), class_id).await.unwrap();

        let filter = EligibilityFilter {
            excluded_team_members: vec!["jon".into()],
            ..EligibilityFilter::default()
        };
        let eligible = store.eligible_students(&filter).await.unwrap();
        assert_eq!(eligible, vec![StudentId(1), StudentId(3)]);

        let relaxed = EligibilityFilter {
            require_seed: false,
            ..EligibilityFilter::default()
        };
        let eligible = store.eligible_students(&relaxed).await.unwrap();
        assert_eq!(
            eligible,
            vec![StudentId(1), StudentId(3), StudentId(4), StudentId(5)]
        );
    }

    #[tokio::test]
    async fn classes_report_zero_counts() {
        let store = store_with_students(1).await;
        let a = store.add_class("Test class 0", "Test class 0", EducatorId(1)).await.unwrap();
        store.add_class("Test class 1", "Test class 1", EducatorId(1)).await.unwrap();
        store.add_class("Solar Eclipse", "ECLIPSE", EducatorId(1)).await.unwrap();
        store.add_enrollment(StudentId(1), a).await.unwrap();

        let classes = store.classes_with_prefix("Test class ").await.unwrap();
        let counts: Vec<(&str, usize)> =
            classes.iter().map(|c| (c.name.as_str(), c.enrolled)).collect();
        assert_eq!(counts, vec![("Test class 0", 1), ("Test class 1", 0)]);
    }

    #[tokio::test]
    async fn double_enrollment_rejected() {
        let store = store_with_students(1).await;
        let a = store.add_class("A", "A", EducatorId(1)).await.unwrap();
        let b = store.add_class("B", "B", EducatorId(1)).await.unwrap();
        store.add_enrollment(StudentId(1), a).await.unwrap();
        assert!(store.add_enrollment(StudentId(1), b).await.is_err());
    }

    #[tokio::test]
    async fn duplicate_class_code_rejected() {
        let store = InMemoryStore::new();
        store.add_class("A", "CODE", EducatorId(1)).await.unwrap();
        assert!(store.add_class("B", "CODE", EducatorId(1)).await.is_err());
    }

    #[tokio::test]
    async fn failed_transaction_leaves_state_untouched() {
        let store = store_with_students(3).await;
        let existing = store.add_class("Other", "OTHER", EducatorId(1)).await.unwrap();
        store.add_enrollment(StudentId(3), existing).await.unwrap();

        let naming = ClassNaming::default();
        let plan = classbatch_core::AllocationPlan {
            groups: vec![classbatch_core::PlanGroup::New {
                class: naming.new_class(0, EducatorId(1), 3),
                // Student 3 is already enrolled, so the second insert fails.
                students: vec![StudentId(1), StudentId(3)],
            }],
            next_sequence: 1,
        };
        assert!(commit_plan(&store, &plan).await.is_err());

        assert_eq!(store.enrollments().await.unwrap(), vec![(StudentId(3), existing)]);
        assert!(store.classes_with_prefix("Test class ").await.unwrap().is_empty());
        assert_eq!(store.stored_sequence().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sequence_counter_never_moves_backwards() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.advance_sequence(7).await.unwrap();
        tx.advance_sequence(3).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.stored_sequence().await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn class_sizes_include_empty_classes() {
        let store = store_with_students(2).await;
        let a = store.add_class("A", "A", EducatorId(1)).await.unwrap();
        let b = store.add_class("B", "B", EducatorId(1)).await.unwrap();
        store.add_enrollment(StudentId(1), a).await.unwrap();
        let sizes = store.class_sizes().await;
        assert_eq!(sizes.get(&a), Some(&1));
        assert_eq!(sizes.get(&b), Some(&0));
    }

    #[tokio::test]
    async fn repeated_runs_only_grow_classes_and_drain_candidates() {
        let store = InMemoryStore::new();
        store.add_measured_student(100, 5).await.unwrap();
        let seeded = store
            .add_class("Test class 0", "Test class 0", EducatorId(1))
            .await
            .unwrap();
        store.add_enrollment(StudentId(100), seeded).await.unwrap();

        let request = AllocationRequest {
            min_size: 3,
            max_size: 5,
            educator_id: EducatorId(1),
            naming: ClassNaming::default(),
            eligibility: EligibilityFilter::default(),
            dry_run: false,
        };

        let mut next_id = 1;
        for (round, batch) in [9i64, 1, 13, 2].into_iter().enumerate() {
            for id in next_id..next_id + batch {
                store.add_measured_student(id, 5).await.unwrap();
            }
            next_id += batch;

            let before = store.class_sizes().await;
            let mut sizes = RandomSizes::seeded(round as u64);
            run_allocation(&store, &request, &mut sizes).await.unwrap();
            let after = store.class_sizes().await;

            for (class, size) in &before {
                let now = after[class];
                assert!(now >= *size, "class {class} shrank in round {round}");
                if now > *size {
                    assert!(now <= 5, "class {class} overfilled in round {round}");
                }
            }
            assert!(store.eligible_students(&request.eligibility).await.unwrap().is_empty());
        }

        let enrolled = store.enrollments().await.unwrap();
        assert_eq!(enrolled.len(), (next_id - 1) as usize + 1);
        assert_eq!(store.class_sizes().await.values().sum::<usize>(), enrolled.len());
    }
}

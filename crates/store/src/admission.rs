//! Admission records — the upstream data the allocator reads.
//!
//! Students, their galaxy measurements, and hand-made classes are created by
//! the platform's admission flows. [`AdmissionStore`] exposes just enough of
//! that surface to load fixtures and to inspect enrollments after a run.

use async_trait::async_trait;
use classbatch_core::{ClassId, EducatorId, StoreError, StudentId};

/// A student row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: StudentId,
    /// Cohort flag
    pub seed: bool,
    /// Team-member tag for staff test accounts
    pub team_member: Option<String>,
}

impl StudentRecord {
    pub fn seed(id: i64) -> Self {
        Self {
            id: StudentId(id),
            seed: true,
            team_member: None,
        }
    }
}

/// One galaxy measurement. A measurement is complete when all five values are set.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub student_id: StudentId,
    pub galaxy_id: i64,
    pub rest_wave_value: Option<f64>,
    pub obs_wave_value: Option<f64>,
    pub est_dist_value: Option<f64>,
    pub velocity_value: Option<f64>,
    pub ang_size_value: Option<f64>,
}

impl Measurement {
    /// A fully populated measurement with plausible values.
    pub fn complete(student_id: StudentId, galaxy_id: i64) -> Self {
        Self {
            student_id,
            galaxy_id,
            rest_wave_value: Some(6563.0),
            obs_wave_value: Some(6690.0),
            est_dist_value: Some(250.0),
            velocity_value: Some(5800.0),
            ang_size_value: Some(38.0),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.rest_wave_value.is_some()
            && self.obs_wave_value.is_some()
            && self.est_dist_value.is_some()
            && self.velocity_value.is_some()
            && self.ang_size_value.is_some()
    }
}

/// Fixture and inspection access shared by the concrete stores.
#[async_trait]
pub trait AdmissionStore: Send + Sync {
    async fn add_student(&self, student: &StudentRecord) -> Result<(), StoreError>;

    async fn record_measurement(&self, measurement: &Measurement) -> Result<(), StoreError>;

    /// Insert a class outside the allocator (e.g. by an educator).
    async fn add_class(
        &self,
        name: &str,
        code: &str,
        educator_id: EducatorId,
    ) -> Result<ClassId, StoreError>;

    async fn add_enrollment(&self, student: StudentId, class_id: ClassId)
    -> Result<(), StoreError>;

    /// Every enrollment, ordered by student id.
    async fn enrollments(&self) -> Result<Vec<(StudentId, ClassId)>, StoreError>;

    /// Convenience: a seed student with `galaxies` complete measurements.
    async fn add_measured_student(&self, id: i64, galaxies: i64) -> Result<(), StoreError> {
        let student = StudentRecord::seed(id);
        self.add_student(&student).await?;
        for galaxy_id in 1..=galaxies {
            self.record_measurement(&Measurement::complete(student.id, galaxy_id))
                .await?;
        }
        Ok(())
    }
}

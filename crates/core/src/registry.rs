//! Class registry reader.
//!
//! Generated classes are named `"{prefix}{n}"` (default prefix `"Test class "`)
//! with the same string used as join code. The reader scans those names to
//! find the next free sequence number and reports which generated classes are
//! still below the minimum size and can absorb more students.
//!
//! The store also keeps an explicit counter that every commit advances. Name
//! scanning remains the fallback for databases created before the counter
//! existed; the larger of the two wins.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{ClassId, EducatorId, NewClass};
use crate::store::{ClassEnrollment, ClassStore};

pub const DEFAULT_CLASS_PREFIX: &str = "Test class ";

/// Naming convention for generated classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNaming {
    prefix: String,
}

impl ClassNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name_for(&self, sequence: u64) -> String {
        format!("{}{sequence}", self.prefix)
    }

    /// Build the descriptor for the generated class with this sequence number.
    pub fn new_class(&self, sequence: u64, educator_id: EducatorId, expected_size: usize) -> NewClass {
        let name = self.name_for(sequence);
        NewClass {
            sequence,
            code: name.clone(),
            name,
            educator_id,
            expected_size,
        }
    }

    /// The sequence number after `sequence`, or an error when the `u64`
    /// space is used up.
    pub fn successor(&self, sequence: u64) -> Result<u64> {
        sequence.checked_add(1).ok_or_else(|| Error::NamingConvention {
            name: self.name_for(sequence),
            reason: "no sequence number left after this class".into(),
        })
    }

    /// Extract the sequence number from a class name.
    ///
    /// Returns `Ok(None)` for names outside the convention. A name that has
    /// the prefix but no non-negative integer after it is an error.
    pub fn parse(&self, name: &str) -> Result<Option<u64>> {
        let Some(suffix) = name.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::NamingConvention {
                name: name.to_string(),
                reason: format!("suffix {suffix:?} is not a non-negative integer"),
            });
        }

        suffix
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::NamingConvention {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for ClassNaming {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_PREFIX)
    }
}

/// A generated class found in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedClass {
    pub id: ClassId,
    pub name: String,
    pub sequence: u64,
    pub enrolled: usize,
}

/// A generated class below the minimum size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReusableClass {
    pub id: ClassId,
    pub name: String,
    pub sequence: u64,
    pub enrolled: usize,
}

/// Registry state read before planning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Sequence number the next generated class takes
    pub next_sequence: u64,

    /// All generated classes, in sequence order
    pub classes: Vec<GeneratedClass>,

    /// Generated classes with fewer than `min_size` students, oldest first
    pub reusable: Vec<ReusableClass>,
}

impl RegistrySnapshot {
    /// Derive the snapshot from raw class rows and the stored counter.
    pub fn from_rows(
        rows: Vec<ClassEnrollment>,
        stored_sequence: Option<u64>,
        naming: &ClassNaming,
        min_size: usize,
    ) -> Result<Self> {
        let mut classes = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(sequence) = naming.parse(&row.name)? {
                classes.push(GeneratedClass {
                    id: row.id,
                    name: row.name,
                    sequence,
                    enrolled: row.enrolled,
                });
            }
        }
        classes.sort_by_key(|c| (c.sequence, c.id));

        let scanned_next = match classes.last() {
            Some(last) => naming.successor(last.sequence)?,
            None => 0,
        };
        let next_sequence = scanned_next.max(stored_sequence.unwrap_or(0));

        let reusable = classes
            .iter()
            .filter(|c| c.enrolled < min_size)
            .map(|c| ReusableClass {
                id: c.id,
                name: c.name.clone(),
                sequence: c.sequence,
                enrolled: c.enrolled,
            })
            .collect();

        Ok(Self {
            next_sequence,
            classes,
            reusable,
        })
    }
}

/// Read the registry state from the store.
pub async fn read_registry(
    store: &dyn ClassStore,
    naming: &ClassNaming,
    min_size: usize,
) -> Result<RegistrySnapshot> {
    let rows = store.classes_with_prefix(naming.prefix()).await?;
    let stored = store.stored_sequence().await?;
    debug!(rows = rows.len(), ?stored, "Read generated class rows");

    let snapshot = RegistrySnapshot::from_rows(rows, stored, naming, min_size)?;
    info!(
        "{} generated classes, {} reusable, next sequence {}",
        snapshot.classes.len(),
        snapshot.reusable.len(),
        snapshot.next_sequence
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedStore;

    fn row(id: i64, name: &str, enrolled: usize) -> ClassEnrollment {
        ClassEnrollment {
            id: ClassId(id),
            name: name.into(),
            enrolled,
        }
    }

    #[test]
    fn parse_accepts_convention_names() {
        let naming = ClassNaming::default();
        assert_eq!(naming.parse("Test class 0").unwrap(), Some(0));
        assert_eq!(naming.parse("Test class 17").unwrap(), Some(17));
        assert_eq!(naming.parse("Astronomy 101").unwrap(), None);
        assert_eq!(naming.parse("Test classroom").unwrap(), None);
    }

    #[test]
    fn parse_rejects_bad_suffix() {
        let naming = ClassNaming::default();
        for name in ["Test class seven", "Test class ", "Test class -1", "Test class 3b"] {
            let err = naming.parse(name).unwrap_err();
            assert!(matches!(err, Error::NamingConvention { .. }), "{name}");
        }
    }

    #[test]
    fn parse_rejects_overflowing_suffix() {
        let naming = ClassNaming::default();
        assert!(naming.parse("Test class 99999999999999999999999").is_err());
    }

    #[test]
    fn largest_suffix_parses_but_has_no_successor() {
        let naming = ClassNaming::default();
        let name = format!("Test class {}", u64::MAX);
        assert_eq!(naming.parse(&name).unwrap(), Some(u64::MAX));

        let err = RegistrySnapshot::from_rows(vec![row(1, &name, 30)], None, &naming, 3)
            .unwrap_err();
        assert!(matches!(err, Error::NamingConvention { .. }));
        assert!(err.to_string().contains(&name));
        assert_eq!(naming.successor(u64::MAX - 1).unwrap(), u64::MAX);
    }

    #[test]
    fn new_class_uses_name_as_code() {
        let class = ClassNaming::default().new_class(4, EducatorId(9), 25);
        assert_eq!(class.name, "Test class 4");
        assert_eq!(class.code, class.name);
        assert_eq!(class.sequence, 4);
        assert_eq!(class.expected_size, 25);
    }

    #[test]
    fn empty_registry_starts_at_zero() {
        let snapshot =
            RegistrySnapshot::from_rows(vec![], None, &ClassNaming::default(), 3).unwrap();
        assert_eq!(snapshot.next_sequence, 0);
        assert!(snapshot.reusable.is_empty());
    }

    #[test]
    fn next_sequence_is_one_past_the_maximum() {
        let rows = vec![
            row(1, "Test class 0", 5),
            row(2, "Test class 4", 5),
            row(3, "Test class 2", 5),
            row(4, "Intro Astronomy", 1),
        ];
        let snapshot =
            RegistrySnapshot::from_rows(rows, None, &ClassNaming::default(), 3).unwrap();
        assert_eq!(snapshot.next_sequence, 5);
        assert_eq!(snapshot.classes.len(), 3);
    }

    #[test]
    fn stored_counter_wins_when_ahead_of_names() {
        let rows = vec![row(1, "Test class 1", 5)];
        let snapshot =
            RegistrySnapshot::from_rows(rows.clone(), Some(9), &ClassNaming::default(), 3).unwrap();
        assert_eq!(snapshot.next_sequence, 9);

        let snapshot =
            RegistrySnapshot::from_rows(rows, Some(1), &ClassNaming::default(), 3).unwrap();
        assert_eq!(snapshot.next_sequence, 2);
    }

    #[test]
    fn reusable_classes_are_below_minimum_in_sequence_order() {
        let rows = vec![
            row(10, "Test class 3", 0),
            row(11, "Test class 1", 2),
            row(12, "Test class 2", 3),
            row(13, "Test class 0", 5),
        ];
        let snapshot =
            RegistrySnapshot::from_rows(rows, None, &ClassNaming::default(), 3).unwrap();
        let reusable: Vec<(u64, usize)> =
            snapshot.reusable.iter().map(|c| (c.sequence, c.enrolled)).collect();
        assert_eq!(reusable, vec![(1, 2), (3, 0)]);
    }

    #[test]
    fn malformed_generated_name_is_fatal() {
        let rows = vec![row(1, "Test class 0", 2), row(2, "Test class final", 2)];
        let err = RegistrySnapshot::from_rows(rows, None, &ClassNaming::default(), 3).unwrap_err();
        assert!(err.to_string().contains("Test class final"));
    }

    #[test]
    fn custom_prefix() {
        let naming = ClassNaming::new("Cohort-");
        assert_eq!(naming.name_for(12), "Cohort-12");
        assert_eq!(naming.parse("Cohort-12").unwrap(), Some(12));
        assert_eq!(naming.parse("Test class 1").unwrap(), None);
    }

    #[tokio::test]
    async fn read_registry_combines_rows_and_counter() {
        let store = ScriptedStore::default()
            .with_class(1, "Test class 0", 1)
            .with_class(2, "Test class 1", 4)
            .with_sequence(3);
        let snapshot = read_registry(&store, &ClassNaming::default(), 2)
            .await
            .unwrap();
        assert_eq!(snapshot.next_sequence, 3);
        assert_eq!(snapshot.reusable.len(), 1);
        assert_eq!(snapshot.reusable[0].id, ClassId(1));
    }
}

//! TE family partitioning
//!
//! Groups filtered TE rows by their family label (field 4) in one pass and
//! drops families with too few members to give reliable p-values.

use crate::formats::bed::IntervalRecord;
use std::collections::{BTreeMap, HashMap};

/// Minimum number of rows a family needs to be tested
pub const MIN_FAMILY_SIZE: usize = 100;

/// Replace characters that are unsafe in file names
///
/// Distinct families may map to the same identifier (`DNA/hAT` and
/// `DNA_hAT`); see [`FamilyPartition::families`].
pub fn sanitize_family_name(name: &str) -> String {
    name.replace([':', '/'], "_")
}

/// One TE family ready for testing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeFamily {
    /// Family label as it appears in the TE file
    pub name: String,
    /// File-system safe identifier, used in the report
    pub identifier: String,
    /// Position in alphabetical processing order
    pub ordinal: usize,
    /// Member rows in (chromosome, start) order
    pub records: Vec<IntervalRecord>,
}

/// Outcome of partitioning
#[derive(Debug, Clone, Default)]
pub struct FamilyPartition {
    /// Families meeting the size threshold, keyed by name
    pub retained: BTreeMap<String, Vec<IntervalRecord>>,
    /// Families below the threshold with their member counts
    pub below_threshold: BTreeMap<String, usize>,
    /// Rows without a family field
    pub missing_family: usize,
}

impl FamilyPartition {
    /// Retained families in ascending name order
    ///
    /// Warns when two families share a sanitised identifier; both are still
    /// processed, and the ordinal keeps their working files apart.
    pub fn families(self) -> Vec<TeFamily> {
        let mut seen: HashMap<String, String> = HashMap::new();

        self.retained
            .into_iter()
            .enumerate()
            .map(|(ordinal, (name, records))| {
                let identifier = sanitize_family_name(&name);
                if let Some(previous) = seen.insert(identifier.clone(), name.clone()) {
                    log::warn!(
                        "Families '{}' and '{}' share the identifier '{}'",
                        previous,
                        name,
                        identifier
                    );
                }
                TeFamily {
                    name,
                    identifier,
                    ordinal,
                    records,
                }
            })
            .collect()
    }
}

/// Group rows by family, keeping families with at least `min_size` rows
///
/// Row order inside a family follows the input order.
pub fn partition_by_family(records: Vec<IntervalRecord>, min_size: usize) -> FamilyPartition {
    let mut groups: BTreeMap<String, Vec<IntervalRecord>> = BTreeMap::new();
    let mut missing_family = 0;

    for record in records {
        match record.family() {
            Some(family) => {
                let family = family.to_string();
                groups.entry(family).or_default().push(record);
            }
            None => missing_family += 1,
        }
    }

    if missing_family > 0 {
        log::warn!("{} TE rows have no family field and were dropped", missing_family);
    }

    let mut partition = FamilyPartition {
        missing_family,
        ..Default::default()
    };

    for (name, members) in groups {
        if members.len() >= min_size {
            partition.retained.insert(name, members);
        } else {
            log::warn!(
                "Skipping family '{}': {} records (minimum {})",
                name,
                members.len(),
                min_size
            );
            partition.below_threshold.insert(name, members.len());
        }
    }

    partition
}

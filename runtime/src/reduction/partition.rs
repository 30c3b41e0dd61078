//! Stable grouping of records by region.

use crate::model::{FacilityRecord, GroupKey};
use std::collections::HashMap;

/// Records bucketed by `GroupKey`.
///
/// Groups appear in the order their first record was seen, and records keep
/// their merge order within a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitions {
    groups: Vec<(GroupKey, Vec<FacilityRecord>)>,
}

impl Partitions {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&[FacilityRecord]> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[FacilityRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn groups(&self) -> &[(GroupKey, Vec<FacilityRecord>)] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<(GroupKey, Vec<FacilityRecord>)> {
        self.groups
    }
}

/// Bucket records by `group_key`. No filtering or reordering.
pub fn partition(records: impl IntoIterator<Item = FacilityRecord>) -> Partitions {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Vec<FacilityRecord>)> = Vec::new();

    for record in records {
        let slot = match index.get(&record.group_key) {
            Some(&slot) => slot,
            None => {
                index.insert(record.group_key.clone(), groups.len());
                groups.push((record.group_key.clone(), Vec::new()));
                groups.len() - 1
            }
        };
        groups[slot].1.push(record);
    }

    Partitions { groups }
}

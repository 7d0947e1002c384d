//! Identifier partitioner: one deduplicated work list per carrier family.

use std::collections::{HashMap, HashSet};

use crate::records::ShipmentRecord;

/// Unique tracking ids for one family, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkList {
    pub family: String,
    pub tracking_ids: Vec<String>,
}

/// Group fetchable records by family, in the order of `families`.
///
/// Families with no identifiers produce no work list.
pub fn partition(records: &[ShipmentRecord], families: &[String]) -> Vec<WorkList> {
    let mut by_family: HashMap<&str, (Vec<String>, HashSet<&str>)> = HashMap::new();

    for record in records {
        let (Some(family), Some(id)) = (record.family.as_deref(), record.tracking_id.as_deref())
        else {
            continue;
        };
        let (ids, seen) = by_family.entry(family).or_default();
        if seen.insert(id) {
            ids.push(id.to_string());
        }
    }

    families
        .iter()
        .filter_map(|family| {
            let (ids, _) = by_family.remove(family.as_str())?;
            Some(WorkList {
                family: family.clone(),
                tracking_ids: ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, family: Option<&str>, id: Option<&str>) -> ShipmentRecord {
        ShipmentRecord {
            row,
            source_index: row,
            family: family.map(str::to_string),
            tracking_id: id.map(str::to_string),
            status_text: None,
            status_timestamp: None,
        }
    }

    fn families() -> Vec<String> {
        vec!["bluedart".into(), "delhivery".into()]
    }

    #[test]
    fn deduplicates_in_first_seen_order() {
        let records = vec![
            record(0, Some("bluedart"), Some("B2")),
            record(1, Some("bluedart"), Some("B1")),
            record(2, Some("bluedart"), Some("B2")),
            record(3, Some("delhivery"), Some("D1")),
        ];

        let lists = partition(&records, &families());
        assert_eq!(
            lists,
            vec![
                WorkList {
                    family: "bluedart".into(),
                    tracking_ids: vec!["B2".into(), "B1".into()],
                },
                WorkList {
                    family: "delhivery".into(),
                    tracking_ids: vec!["D1".into()],
                },
            ]
        );
    }

    #[test]
    fn same_id_in_two_families_is_two_items() {
        let records = vec![
            record(0, Some("delhivery"), Some("X1")),
            record(1, Some("bluedart"), Some("X1")),
        ];

        let lists = partition(&records, &families());
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].family, "bluedart");
        assert_eq!(lists[1].family, "delhivery");
    }

    #[test]
    fn unfetchable_records_are_excluded() {
        let records = vec![
            record(0, None, Some("E1")),
            record(1, Some("bluedart"), None),
        ];
        assert!(partition(&records, &families()).is_empty());
    }
}

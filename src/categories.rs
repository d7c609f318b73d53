//! Category breakdown derived from the materials collection.

use crate::materials::Material;
use serde::{Deserialize, Serialize};

/// Count and share of one category within the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    /// Category name.
    pub name: String,
    /// Number of materials in the category.
    pub count: usize,
    /// Share of the collection, in percent.
    pub percentage: f64,
}

/// Group `materials` by category, in first-encountered order.
///
/// Percentages sum to 100 for a non-empty collection. An empty
/// collection yields an empty vector rather than dividing by zero.
pub fn aggregate(materials: &[Material]) -> Vec<CategoryAggregate> {
    if materials.is_empty() {
        return Vec::new();
    }

    let mut aggregates: Vec<CategoryAggregate> = Vec::new();
    for material in materials {
        match aggregates.iter_mut().find(|c| c.name == material.category) {
            Some(entry) => entry.count += 1,
            None => aggregates.push(CategoryAggregate {
                name: material.category.clone(),
                count: 1,
                percentage: 0.0,
            }),
        }
    }

    let total = materials.len() as f64;
    for entry in &mut aggregates {
        entry.percentage = (entry.count as f64 / total) * 100.0;
    }

    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::Material;
    use chrono::Utc;

    fn material(category: &str) -> Material {
        Material {
            id: "m".to_string(),
            title: "t".to_string(),
            course_code: "CSC101".to_string(),
            level: "100".to_string(),
            category: category.to_string(),
            description: String::new(),
            downloads: 0,
            url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_collection_yields_empty_set() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_counts_and_percentages() {
        let materials = vec![
            material("Notes"),
            material("Notes"),
            material("Past Questions"),
        ];

        let aggregates = aggregate(&materials);
        assert_eq!(aggregates.len(), 2);

        assert_eq!(aggregates[0].name, "Notes");
        assert_eq!(aggregates[0].count, 2);
        assert!((aggregates[0].percentage - 66.67).abs() < 0.01);

        assert_eq!(aggregates[1].name, "Past Questions");
        assert_eq!(aggregates[1].count, 1);
        assert!((aggregates[1].percentage - 33.33).abs() < 0.01);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let materials = vec![
            material("A"),
            material("B"),
            material("B"),
            material("C"),
            material("C"),
            material("C"),
            material("D"),
        ];

        let sum: f64 = aggregate(&materials).iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }
}

//! Canonical grouping identities for report totals.

use crate::types::{CategoryId, SubcategoryId, TagId};

/// The identity totals are bucketed by: (category, optional subcategory,
/// normalized tag set).
///
/// Tag ids are sorted ascending and deduplicated on construction, so two
/// sessions with the same classification map to the same key regardless of
/// original tag order or accidental duplication. Structural `Eq`/`Hash` makes
/// the key directly usable in a map without any string encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub tag_ids: Vec<TagId>,
}

impl GroupKey {
    /// Builds a key, normalizing the tag set.
    #[must_use]
    pub fn new(
        category_id: CategoryId,
        subcategory_id: Option<SubcategoryId>,
        tag_ids: &[TagId],
    ) -> Self {
        let mut tag_ids = tag_ids.to_vec();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        Self {
            category_id,
            subcategory_id,
            tag_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(ids: &[i64]) -> Vec<TagId> {
        ids.iter().copied().map(TagId::new).collect()
    }

    #[test]
    fn key_is_invariant_under_tag_order() {
        let a = GroupKey::new(CategoryId::new(1), None, &tags(&[2, 1]));
        let b = GroupKey::new(CategoryId::new(1), None, &tags(&[1, 2]));
        assert_eq!(a, b);
    }

    #[test]
    fn key_deduplicates_tags() {
        let a = GroupKey::new(CategoryId::new(1), None, &tags(&[2, 1, 2]));
        let b = GroupKey::new(CategoryId::new(1), None, &tags(&[1, 2]));
        assert_eq!(a, b);
        assert_eq!(a.tag_ids, tags(&[1, 2]));
    }

    #[test]
    fn key_distinguishes_subcategory_presence() {
        let with = GroupKey::new(CategoryId::new(1), Some(SubcategoryId::new(5)), &[]);
        let without = GroupKey::new(CategoryId::new(1), None, &[]);
        assert_ne!(with, without);
    }

    #[test]
    fn key_distinguishes_different_tag_sets() {
        let a = GroupKey::new(CategoryId::new(1), None, &tags(&[1]));
        let b = GroupKey::new(CategoryId::new(1), None, &tags(&[1, 2]));
        assert_ne!(a, b);
    }
}

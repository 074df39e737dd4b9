//! Statistical tests used by the comparator.
//!
//! One-way ANOVA for the omnibus step, Tukey's HSD for the pairwise follow-up, and the
//! studentized range distribution both of them lean on.

use std::collections::BTreeMap;

mod anova;
mod studentized;
mod tukey;

pub use anova::{one_way_anova, AnovaResult};
pub use studentized::{ptukey, qtukey};
pub use tukey::{tukey_hsd, TukeyHsd};

/// Values grouped by label, groups sorted by label.
pub(crate) fn group_by_label<'a>(values: &[f64], labels: &[&'a str]) -> Vec<(&'a str, Vec<f64>)> {
    let mut groups: BTreeMap<&'a str, Vec<f64>> = BTreeMap::new();
    for (v, l) in values.iter().zip(labels) {
        groups.entry(*l).or_default().push(*v);
    }
    groups.into_iter().collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_sorted_by_label() {
        let g = group_by_label(&[1.0, 2.0, 3.0], &["b", "a", "b"]);
        assert_eq!(g, vec![("a", vec![2.0]), ("b", vec![1.0, 3.0])]);
    }
}

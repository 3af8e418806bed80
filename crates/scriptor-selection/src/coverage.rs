use std::fmt;

use serde::Serialize;

use crate::{
    options::FeatureOpt,
    selector::Selector,
    stats::{Stats, sum_of_stats},
};

/// How many distinct values of one feature the selection covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureCoverage {
    pub feature: String,
    /// Distinct values in the input batch.
    pub batch_values: usize,
    /// Distinct values in the selection.
    pub selected_values: usize,
    /// Distinct batch values that also occur in the selection.
    pub covered_values: usize,
}

impl FeatureCoverage {
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.batch_values == 0 {
            return 0.0;
        }
        #[expect(clippy::cast_precision_loss)]
        let ratio = self.covered_values as f64 / self.batch_values as f64;
        ratio
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub features: Vec<FeatureCoverage>,
}

impl CoverageReport {
    /// Compares `selected` against `batch`, feature by feature in priority order.
    #[must_use]
    pub fn new(features: &[FeatureOpt], batch: &Stats, selected: &Stats) -> Self {
        let features = features
            .iter()
            .map(|opt| {
                let batch_m = batch.get(&opt.name);
                let selected_m = selected.get(&opt.name);
                let covered_values = batch_m
                    .into_iter()
                    .flat_map(|m| m.keys())
                    .filter(|value| selected_m.is_some_and(|m| m.contains_key(*value)))
                    .count();
                FeatureCoverage {
                    feature: opt.name.clone(),
                    batch_values: batch_m.map_or(0, |m| m.len()),
                    selected_values: selected_m.map_or(0, |m| m.len()),
                    covered_values,
                }
            })
            .collect();
        Self { features }
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.features {
            writeln!(
                f,
                "{}\t{}/{}\t{:.1}%",
                c.feature,
                c.covered_values,
                c.batch_values,
                c.ratio() * 100.0
            )?;
        }
        Ok(())
    }
}

impl Selector {
    /// Coverage of the input batch by this run's selection.
    ///
    /// Accumulated scripts are not counted.
    #[must_use]
    pub fn coverage(&self) -> CoverageReport {
        let features = self.scorer().features();
        let selected = sum_of_stats(features, self.selection());
        CoverageReport::new(features, self.input_batch_stats(), &selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        options::{Mode, SelectorOptions},
        testing::{candidate, features},
    };

    #[test]
    fn test_report_counts_distinct_values() {
        let batch = sum_of_stats(
            &features(),
            &[
                candidate(1, "w", &["x", "y"], &["p"]),
                candidate(2, "w", &["y", "z", "w"], &[]),
            ],
        );
        let selected = sum_of_stats(&features(), &[candidate(2, "w", &["y", "z", "w"], &[])]);
        let report = CoverageReport::new(&features(), &batch, &selected);
        assert_eq!(
            report.features,
            vec![
                FeatureCoverage {
                    feature: "a".to_owned(),
                    batch_values: 4,
                    selected_values: 3,
                    covered_values: 3,
                },
                FeatureCoverage {
                    feature: "b".to_owned(),
                    batch_values: 1,
                    selected_values: 0,
                    covered_values: 0,
                },
            ]
        );
        assert!((report.features[0].ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.to_string(), "a\t3/4\t75.0%\nb\t0/1\t0.0%\n");
    }

    #[test]
    fn test_selector_coverage_grows() {
        let mut options = SelectorOptions::new(Mode::Exhaustive, 2, "batch", "script");
        options.feature_opts = features();
        options.seed = Some(1);
        let mut s = Selector::new(options).unwrap();
        s.load_corpus(vec![
            candidate(1, "w", &["x"], &[]),
            candidate(2, "w", &["y"], &[]),
            candidate(3, "w", &["z"], &[]),
        ]);
        assert_eq!(s.coverage().features[0].covered_values, 0);
        s.run(|_, _| {}).unwrap();
        assert_eq!(s.coverage().features[0].covered_values, 2);
        assert_eq!(s.coverage().features[0].batch_values, 3);
    }
}

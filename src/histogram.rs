//! Frequency distribution of per-run scalar outcomes
//!
//! `bins` equal-width bins over `[lower, upper]`. Every bin is half-open
//! except the last, which also counts values equal to `upper`. Values outside
//! the range are left out of the counts.

use serde::Serialize;

use crate::error::{Error, Result};

pub const DEFAULT_BINS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` bin edges, ascending
    pub edges: Vec<f64>,
    /// Count per bin
    pub counts: Vec<usize>,
    /// Finite values that fell outside the range
    pub outside: usize,
}

impl Histogram {
    /// Bin `values` over an explicit `range`, or over the data range when
    /// `range` is `None`.
    ///
    /// Without a range, identical values are binned over `[v - 0.5, v + 0.5]`
    /// and an empty input over `[0, 1]`. Non-finite values are ignored.
    pub fn from_values(values: &[f64], bins: usize, range: Option<(f64, f64)>) -> Result<Self> {
        if bins == 0 {
            return Err(Error::invalid("histogram needs at least one bin"));
        }

        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (lower, upper) = match range {
            Some((lower, upper)) => {
                if !lower.is_finite() || !upper.is_finite() || upper <= lower {
                    return Err(Error::invalid(format!(
                        "histogram range must be finite with max > min, got [{lower}, {upper}]"
                    )));
                }
                (lower, upper)
            }
            None => data_range(&finite),
        };

        let width = (upper - lower) / bins as f64;
        let mut edges: Vec<f64> = (0..=bins).map(|i| lower + width * i as f64).collect();
        edges[bins] = upper;

        let mut counts = vec![0; bins];
        let mut outside = 0;
        for &value in &finite {
            if value < lower || value > upper {
                outside += 1;
                continue;
            }
            counts[bin_index(&edges, value, lower, width)] += 1;
        }

        Ok(Self {
            edges,
            counts,
            outside,
        })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn lower(&self) -> f64 {
        self.edges[0]
    }

    pub fn upper(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Total binned count
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(lower edge, upper edge, count)` for each bin
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(edge, &count)| (edge[0], edge[1], count))
    }

    /// Index of the most populated bin (first one on ties)
    pub fn mode_bin(&self) -> Option<usize> {
        let max = *self.counts.iter().max()?;
        if max == 0 {
            return None;
        }
        self.counts.iter().position(|&c| c == max)
    }
}

/// Bin holding `value`, consistent with the stored edges: `edges[i] <= value < edges[i + 1]`,
/// except in the last bin, which is closed.
fn bin_index(edges: &[f64], value: f64, lower: f64, width: f64) -> usize {
    let bins = edges.len() - 1;
    let mut idx = (((value - lower) / width) as usize).min(bins - 1);
    // The division can round across an edge in either direction.
    if idx > 0 && value < edges[idx] {
        idx -= 1;
    } else if idx < bins - 1 && value >= edges[idx + 1] {
        idx += 1;
    }
    idx
}

fn data_range(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_range_covers_min_and_max() {
        let values = [1.0, 2.0, 2.5, 3.0];
        let hist = Histogram::from_values(&values, 4, None).unwrap();
        assert_eq!(hist.edges, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
        // max lands in the closed last bin
        assert_eq!(hist.counts, vec![1, 0, 1, 2]);
        assert_eq!(hist.total(), 4);
        assert_eq!(hist.outside, 0);
    }

    #[test]
    fn explicit_range_drops_outliers() {
        let values = [-1.0, 0.1, 0.5, 0.9, 1.0, 1.5];
        let hist = Histogram::from_values(&values, 2, Some((0.0, 1.0))).unwrap();
        assert_eq!(hist.counts, vec![1, 3]);
        assert_eq!(hist.outside, 2);
        assert_eq!(hist.lower(), 0.0);
        assert_eq!(hist.upper(), 1.0);
    }

    #[test]
    fn identical_values_get_a_unit_window() {
        let hist = Histogram::from_values(&[2.0, 2.0, 2.0], 50, None).unwrap();
        assert_eq!(hist.lower(), 1.5);
        assert_eq!(hist.upper(), 2.5);
        assert_eq!(hist.total(), 3);
        assert_eq!(hist.bins(), 50);
        assert_eq!(hist.mode_bin(), Some(25));
    }

    #[test]
    fn empty_input_is_an_empty_histogram() {
        let hist = Histogram::from_values(&[], DEFAULT_BINS, None).unwrap();
        assert_eq!(hist.total(), 0);
        assert_eq!(hist.bins(), DEFAULT_BINS);
        assert_eq!(hist.mode_bin(), None);
    }

    #[test]
    fn rejects_degenerate_configuration() {
        assert!(Histogram::from_values(&[1.0], 0, None).is_err());
        assert!(Histogram::from_values(&[1.0], 10, Some((1.0, 1.0))).is_err());
        assert!(Histogram::from_values(&[1.0], 10, Some((2.0, 1.0))).is_err());
    }

    #[test]
    fn values_on_an_edge_open_the_bin_above() {
        let hist = Histogram::from_values(&[], 50, Some((1.6, 1.9))).unwrap();
        for (i, &edge) in hist.edges.iter().enumerate() {
            let single = Histogram::from_values(&[edge], 50, Some((1.6, 1.9))).unwrap();
            let expected = i.min(49);
            assert_eq!(single.counts[expected], 1, "edge {i} = {edge} misbinned");
            assert_eq!(single.total(), 1);
        }
    }

    #[test]
    fn rows_pair_edges_with_counts() {
        let hist = Histogram::from_values(&[0.0, 1.0], 2, None).unwrap();
        let rows: Vec<_> = hist.rows().collect();
        assert_eq!(rows, vec![(0.0, 0.5, 1), (0.5, 1.0, 1)]);
    }
}

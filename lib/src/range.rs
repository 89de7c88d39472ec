use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range of counts where lower bound is inclusive, upper bound is exclusive or unbounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange(usize, Option<usize>);

impl CountRange {
    pub fn new(from: usize, to: Option<usize>) -> Self {
        if let Some(to) = to {
            assert!(from < to, "ranges must go from low to high");
        }
        CountRange(from, to)
    }

    /// `from` or more.
    pub const fn at_least(from: usize) -> Self {
        CountRange(from, None)
    }

    pub fn contains(&self, val: usize) -> bool {
        match self.1 {
            Some(end) => val >= self.0 && val < end,
            None => val >= self.0,
        }
    }

    pub fn start(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CountRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.1 {
            Some(end) if end == self.0 + 1 => write!(f, "{}", self.0),
            // the end is exclusive, but people read "3 - 9" as inclusive
            Some(end) => write!(f, "{} - {}", self.0, end - 1),
            None => write!(f, "{}+", self.0),
        }
    }
}

/// An ordered list of (possibly overlapping) count ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountBands {
    ranges: Vec<CountRange>,
}

impl CountBands {
    pub fn new(ranges: Vec<CountRange>) -> Self {
        Self { ranges }
    }

    /// The bands used when reporting how often patients come back for exams.
    pub fn exam_visits() -> Self {
        Self::new(vec![
            CountRange::new(1, Some(2)),
            CountRange::new(2, Some(3)),
            CountRange::new(3, Some(10)),
            CountRange::at_least(10),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountRange> + '_ {
        self.ranges.iter()
    }

    pub fn bucket_values(self, values: impl Iterator<Item = usize>) -> BandCounts {
        let mut buckets = vec![0usize; self.ranges.len()];
        for value in values {
            for (idx, band) in self.ranges.iter().enumerate() {
                if band.contains(value) {
                    buckets[idx] += 1;
                }
            }
        }
        BandCounts {
            bands: self,
            counts: buckets,
        }
    }
}

/// Count bands with values bucketed, and bucket sizes recorded.
#[derive(Debug, Clone)]
pub struct BandCounts {
    bands: CountBands,
    counts: Vec<usize>,
}

impl BandCounts {
    pub fn iter(&self) -> impl Iterator<Item = (&CountRange, usize)> {
        self.bands.iter().zip_eq(self.counts.iter().copied())
    }

    pub fn term_table(&self, label: &'static str) -> term_data_table::Table<'static> {
        use term_data_table::{Cell, Row, Table};
        let total: usize = self.counts.iter().sum();
        let mut table = Table::new().with_row(
            Row::new()
                .with_cell(Cell::from(label))
                .with_cell(Cell::from("Patients"))
                .with_cell(Cell::from("Percentage")),
        );
        for (range, count) in self.iter() {
            let pct = if total == 0 {
                0.
            } else {
                count as f64 / total as f64 * 100.
            };
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(range.to_string()))
                    .with_cell(Cell::from(crate::thousands(count)))
                    .with_cell(Cell::from(format!("{:.1}%", pct))),
            );
        }
        table
    }
}

//! Cross tabulation: how many patients pass an exam threshold *and* appear in every selected
//! dataset.
use crate::{Datasets, ExamCounts, ExamThreshold, PatientId, Selector};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// Shown instead of dataset labels when only the exam threshold applies.
pub const NO_DATASET: &str = "no additional dataset";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `All` exams with no datasets would just be the exam population, which the overview
    /// already shows. Ask for something more specific.
    #[error("select at least one dataset or a more specific exam threshold")]
    UnderSpecified,
    #[error(
        "unknown dataset \"{0}\" (expected one of plasma, plasma-2019, buffy-coat, \
         buffy-coat-2019, wgs, clinical)"
    )]
    UnknownSelector(String),
    #[error("unknown exam threshold \"{0}\" (expected one of all, 3, 10)")]
    UnknownThreshold(String),
}

/// A cross tabulation request.
///
/// Datasets form a set: selecting one twice is the same as selecting it once, and the order
/// they were selected in doesn't matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub threshold: ExamThreshold,
    pub datasets: BTreeSet<Selector>,
}

impl Query {
    pub fn new(threshold: ExamThreshold) -> Self {
        Query {
            threshold,
            datasets: BTreeSet::new(),
        }
    }

    pub fn with_dataset(mut self, selector: Selector) -> Self {
        self.datasets.insert(selector);
        self
    }

    /// Build a query from the short names used on the command line.
    pub fn parse<S: AsRef<str>>(
        threshold: &str,
        datasets: impl IntoIterator<Item = S>,
    ) -> Result<Self, QueryError> {
        let threshold = threshold.parse::<ExamThreshold>()?;
        let datasets = datasets
            .into_iter()
            .map(|name| name.as_ref().parse::<Selector>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Query {
            threshold,
            datasets,
        })
    }

    /// Refuse queries that don't narrow anything down.
    pub fn check(&self) -> Result<(), QueryError> {
        if self.threshold == ExamThreshold::All && self.datasets.is_empty() {
            return Err(QueryError::UnderSpecified);
        }
        Ok(())
    }

    /// e.g. "3+ exams + Plasma samples, WGS phenotype"
    pub fn description(&self) -> String {
        let datasets = if self.datasets.is_empty() {
            NO_DATASET.to_owned()
        } else {
            self.datasets.iter().map(|s| s.label()).join(", ")
        };
        format!("{} exams + {}", self.threshold.label(), datasets)
    }

    /// Run the query against loaded data.
    ///
    /// Nothing is mutated, so this can be called any number of times on the same data.
    pub fn run(
        &self,
        data: &Datasets,
        exam_counts: &ExamCounts,
    ) -> Result<QueryResult, QueryError> {
        self.check()?;
        let mut ids = base_population(data, exam_counts, self.threshold);
        for selector in &self.datasets {
            ids.retain(|id| data.contains(*selector, id));
        }
        Ok(QueryResult {
            condition: self.description(),
            count: ids.len(),
        })
    }
}

/// Everyone in the exam data that passes the threshold.
pub fn base_population<'a>(
    data: &'a Datasets,
    exam_counts: &'a ExamCounts,
    threshold: ExamThreshold,
) -> BTreeSet<&'a PatientId> {
    match threshold.range() {
        None => data.exams.patient_ids().collect(),
        Some(range) => exam_counts.patients_in(range).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// What was asked for, in words.
    pub condition: String,
    /// Number of patients meeting every condition.
    pub count: usize,
}

impl QueryResult {
    pub fn term_table(&self) -> term_data_table::Table<'static> {
        use term_data_table::{Cell, Row, Table};
        Table::new()
            .with_row(
                Row::new()
                    .with_cell(Cell::from("Condition"))
                    .with_cell(Cell::from("Patients")),
            )
            .with_row(
                Row::new()
                    .with_cell(Cell::from(self.condition.clone()))
                    .with_cell(Cell::from(crate::thousands(self.count))),
            )
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} patients",
            self.condition,
            crate::thousands(self.count)
        )
    }
}

#[cfg(test)]
mod test {
    use super::{Query, QueryError, NO_DATASET};
    use crate::{Dataset, Datasets, ExamCounts, ExamThreshold, Selector};
    use itertools::Itertools;
    use std::io;

    fn table<R: crate::PatientRecord>(input: &str) -> Dataset<R> {
        Dataset::from_reader(io::Cursor::new(input)).unwrap()
    }

    fn exams_for(visits: &[(&str, usize)]) -> String {
        let mut rows = String::from("id_patientarchive,id_patient,year\n");
        for (patient, count) in visits {
            for visit in 0..*count {
                rows.push_str(&format!("{},{}-{},2018\n", patient, patient, visit));
            }
        }
        rows
    }

    /// A: 3 visits, B: 1, C: 10, E: 12
    fn fixture() -> (Datasets, ExamCounts) {
        let data = Datasets::from_parts(
            table(&exams_for(&[("A", 3), ("B", 1), ("C", 10), ("E", 12)])),
            table("id_patientarchive,year\nA,2018\nC,2020\nC,2021\nE,\n"),
            table("id_patientarchive,year\nB,2019\nC,2015\nE,2022\n"),
            table("id_patientarchive\nA\nD\nE\n"),
            table("id_patientarchive\nA\nB\nE\n"),
        );
        let counts = ExamCounts::from_exams(&data.exams);
        (data, counts)
    }

    fn count(query: &Query) -> usize {
        let (data, counts) = fixture();
        query.run(&data, &counts).unwrap().count
    }

    #[test]
    fn threshold_with_plasma() {
        let query = Query::new(ExamThreshold::AtLeast3).with_dataset(Selector::Plasma);
        assert_eq!(count(&query), 3);
        let query = Query::new(ExamThreshold::AtLeast10).with_dataset(Selector::PlasmaRecent);
        assert_eq!(count(&query), 1);
    }

    #[test]
    fn genomic_and_clinical_without_threshold() {
        let query = Query::new(ExamThreshold::All)
            .with_dataset(Selector::Genomic)
            .with_dataset(Selector::Clinical);
        // D has no exam record, so only A and E remain
        assert_eq!(count(&query), 2);
    }

    #[test]
    fn under_specified() {
        let (data, counts) = fixture();
        let query = Query::new(ExamThreshold::All);
        assert_eq!(query.run(&data, &counts), Err(QueryError::UnderSpecified));
        assert!(Query::new(ExamThreshold::All)
            .with_dataset(Selector::Clinical)
            .check()
            .is_ok());
    }

    #[test]
    fn empty_selection_is_base_population() {
        let (data, counts) = fixture();
        assert_eq!(
            Query::new(ExamThreshold::AtLeast3).run(&data, &counts).unwrap().count,
            3
        );
        assert_eq!(
            Query::new(ExamThreshold::AtLeast10).run(&data, &counts).unwrap().count,
            2
        );
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let (data, counts) = fixture();
        for threshold in ExamThreshold::ALL {
            let mut results = Vec::new();
            for perm in Selector::ALL.iter().permutations(3) {
                let names = perm.iter().map(|s| s.code()).collect::<Vec<_>>();
                let forward = Query::parse(threshold.code(), &names).unwrap();
                let backward = Query::parse(threshold.code(), names.iter().rev()).unwrap();
                let doubled = Query::parse(threshold.code(), names.iter().chain(&names)).unwrap();
                let expected = forward.run(&data, &counts).unwrap();
                assert_eq!(backward.run(&data, &counts).unwrap(), expected);
                assert_eq!(doubled.run(&data, &counts).unwrap(), expected);
                results.push(expected.count);
            }
            assert!(!results.is_empty());
        }
    }

    #[test]
    fn description() {
        let query = Query::parse("3", ["wgs", "plasma"]).unwrap();
        assert_eq!(query.description(), "3+ exams + Plasma samples, WGS phenotype");
        let query = Query::new(ExamThreshold::AtLeast10);
        assert_eq!(query.description(), format!("10+ exams + {}", NO_DATASET));
    }

    #[test]
    fn unknown_selector_fails_loudly() {
        assert_eq!(
            Query::parse("all", ["plasma", "urine"]),
            Err(QueryError::UnknownSelector("urine".into()))
        );
    }

    #[test]
    fn repeatable() {
        let (data, counts) = fixture();
        let query = Query::parse("3", ["clinical"]).unwrap();
        let first = query.run(&data, &counts).unwrap();
        for _ in 0..3 {
            assert_eq!(query.run(&data, &counts).unwrap(), first);
        }
        assert_eq!(first.count, 2);
    }
}

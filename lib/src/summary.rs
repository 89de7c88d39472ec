//! Patient counts for each data category, for the overview.
use crate::{util, Category, Datasets, ExamCounts};
use serde::Serialize;

/// Width of the widest bar in the overview table.
const BAR_WIDTH: usize = 40;

/// Distinct patient counts, in `Category::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    rows: Vec<(Category, usize)>,
}

impl Summary {
    pub fn compute(data: &Datasets, exam_counts: &ExamCounts) -> Self {
        let rows = Category::ALL
            .iter()
            .map(|&category| {
                let count = match category {
                    Category::Exams(threshold) => match threshold.range() {
                        Some(range) => exam_counts.count_in(range),
                        None => data.exams.distinct_patients(),
                    },
                    Category::Dataset(selector) => data.distinct_patients(selector),
                };
                (category, count)
            })
            .collect();
        Summary { rows }
    }

    pub fn get(&self, category: Category) -> Option<usize> {
        self.rows
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// To display in the console/terminal. The bars stand in for a chart.
    pub fn term_table(&self) -> term_data_table::Table<'static> {
        use term_data_table::{Cell, Row, Table};
        let max = self.iter().map(|(_, count)| count).max().unwrap_or(0);
        self.iter().fold(
            Table::new().with_row(
                Row::new()
                    .with_cell(Cell::from("Category"))
                    .with_cell(Cell::from("Patients"))
                    .with_cell(Cell::from("")),
            ),
            |tbl, (category, count)| {
                tbl.with_row(
                    Row::new()
                        .with_cell(Cell::from(category.label()))
                        .with_cell(Cell::from(util::thousands(count)))
                        .with_cell(Cell::from(util::bar(count, max, BAR_WIDTH))),
                )
            },
        )
    }
}

#[cfg(test)]
mod test {
    use super::Summary;
    use crate::{
        crosstab::base_population, Category, Dataset, Datasets, ExamCounts, ExamThreshold,
        Selector,
    };
    use std::{collections::BTreeSet, io};

    fn table<R: crate::PatientRecord>(input: &str) -> Dataset<R> {
        Dataset::from_reader(io::Cursor::new(input)).unwrap()
    }

    fn fixture() -> Datasets {
        let mut exams = String::from("id_patientarchive,id_patient,year\n");
        for (patient, visits) in [("A", 3), ("B", 1), ("C", 10), ("D", 4)] {
            for visit in 0..visits {
                // every visit recorded twice
                exams.push_str(&format!("{p},{p}{v},2018\n{p},{p}{v},2018\n", p = patient, v = visit));
            }
        }
        Datasets::from_parts(
            table(&exams),
            table("id_patientarchive,year\nA,2018\nA,2020\nC,2019\nX,2017\n"),
            table("id_patientarchive,year\nB,2021\nB,2022\n"),
            table("id_patientarchive\nA\nA\nD\n"),
            table("id_patientarchive\nB\n"),
        )
    }

    fn distinct(ids: impl Iterator<Item = String>) -> usize {
        ids.collect::<BTreeSet<_>>().len()
    }

    #[test]
    fn counts_match_baselines() {
        let data = fixture();
        let counts = ExamCounts::from_exams(&data.exams);
        let summary = Summary::compute(&data, &counts);
        assert_eq!(summary.len(), 9);

        let expected = [
            distinct(data.exams.iter().map(|e| e.patient_id.to_string())),
            3,
            1,
            distinct(data.plasma.iter().map(|s| s.patient_id.to_string())),
            distinct(
                data.plasma
                    .iter()
                    .filter(|s| s.year >= Some(2019))
                    .map(|s| s.patient_id.to_string()),
            ),
            1,
            1,
            2,
            1,
        ];
        let actual = summary.iter().map(|(_, count)| count).collect::<Vec<_>>();
        assert_eq!(actual, expected);
        assert_eq!(summary.get(Category::Exams(ExamThreshold::All)), Some(4));
        assert_eq!(summary.get(Category::Dataset(Selector::PlasmaRecent)), Some(2));
    }

    #[test]
    fn stable_order() {
        let data = fixture();
        let counts = ExamCounts::from_exams(&data.exams);
        let summary = Summary::compute(&data, &counts);
        let order = summary.iter().map(|(c, _)| c).collect::<Vec<_>>();
        assert_eq!(order, Category::ALL.to_vec());
        assert_eq!(Summary::compute(&data, &counts), summary);
    }

    #[test]
    fn exam_rows_match_base_population() {
        let data = fixture();
        let counts = ExamCounts::from_exams(&data.exams);
        let summary = Summary::compute(&data, &counts);
        for threshold in ExamThreshold::ALL {
            let population = base_population(&data, &counts, threshold).len();
            assert_eq!(summary.get(Category::Exams(threshold)), Some(population));
        }
    }

    #[test]
    fn recent_never_exceeds_parent() {
        let data = fixture();
        let counts = ExamCounts::from_exams(&data.exams);
        let summary = Summary::compute(&data, &counts);
        for (parent, recent) in [
            (Selector::Plasma, Selector::PlasmaRecent),
            (Selector::BuffyCoat, Selector::BuffyCoatRecent),
        ] {
            assert!(
                summary.get(Category::Dataset(recent)) <= summary.get(Category::Dataset(parent))
            );
        }
    }
}

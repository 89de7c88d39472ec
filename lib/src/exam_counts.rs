//! Number of exam visits per patient.
//!
//! A visit is identified by the `id_patient` column of the exam data. The same visit can be
//! recorded on several rows (e.g. one row per test performed), so we count distinct visit IDs
//! rather than rows. Rows with no visit ID don't count as a visit, so a patient whose rows all
//! lack one has no entry here (they are still part of the exam population).
use crate::{ArcStr, BandCounts, CountBands, CountRange, Dataset, Exam, PatientId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamCounts {
    counts: BTreeMap<PatientId, usize>,
}

impl ExamCounts {
    /// Group exams by patient and count the distinct visits in each group.
    pub fn from_exams(exams: &Dataset<Exam>) -> Self {
        let mut visits: BTreeMap<&PatientId, BTreeSet<&ArcStr>> = BTreeMap::new();
        for exam in exams.iter_ref() {
            if let Some(visit_id) = &exam.visit_id {
                visits.entry(&exam.patient_id).or_default().insert(visit_id);
            }
        }
        let counts = visits
            .into_iter()
            .map(|(id, visits)| (id.clone(), visits.len()))
            .collect();
        Self { counts }
    }

    /// Number of distinct visits for the patient, `None` if they have none.
    pub fn get(&self, patient_id: &PatientId) -> Option<usize> {
        self.counts.get(patient_id).copied()
    }

    /// Number of patients with at least one visit.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, usize)> + '_ {
        self.counts.iter().map(|(id, count)| (id, *count))
    }

    /// Patients whose visit count falls in `range`, in ID order.
    pub fn patients_in(&self, range: CountRange) -> impl Iterator<Item = &PatientId> + '_ {
        self.counts
            .iter()
            .filter(move |(_, count)| range.contains(**count))
            .map(|(id, _)| id)
    }

    pub fn count_in(&self, range: CountRange) -> usize {
        self.patients_in(range).count()
    }

    /// How many patients fall into each band.
    pub fn distribution(&self, bands: CountBands) -> BandCounts {
        bands.bucket_values(self.counts.values().copied())
    }
}

#[cfg(test)]
mod test {
    use super::ExamCounts;
    use crate::{CountBands, CountRange, Dataset, Exam};
    use std::io;

    fn exams(input: &str) -> Dataset<Exam> {
        Dataset::from_reader(io::Cursor::new(input)).unwrap()
    }

    #[test]
    fn repeated_visits_count_once() {
        let exams = exams(
            "id_patientarchive,id_patient,year\n\
             A,v1,2015\nA,v1,2015\nA,v2,2016\nA,v1,2015\nB,v9,2020\n",
        );
        let counts = ExamCounts::from_exams(&exams);
        assert_eq!(counts.get(&"A".into()), Some(2));
        assert_eq!(counts.get(&"B".into()), Some(1));
        assert_eq!(counts.get(&"C".into()), None);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn visit_ids_are_per_patient() {
        // the same visit ID under two patients is two visits
        let exams = exams("id_patientarchive,id_patient,year\nA,1,2015\nB,1,2015\n");
        let counts = ExamCounts::from_exams(&exams);
        assert_eq!(counts.get(&"A".into()), Some(1));
        assert_eq!(counts.get(&"B".into()), Some(1));
    }

    #[test]
    fn missing_visit_ids_ignored() {
        let exams = exams("id_patientarchive,id_patient,year\nA,,2015\nA,v1,2016\nB,null,2016\n");
        let counts = ExamCounts::from_exams(&exams);
        assert_eq!(counts.get(&"A".into()), Some(1));
        assert_eq!(counts.get(&"B".into()), None);
        assert!(counts.iter().all(|(_, count)| count >= 1));
    }

    #[test]
    fn thresholds_and_distribution() {
        let mut rows = String::from("id_patientarchive,id_patient,year\n");
        for (patient, visits) in [("A", 3), ("B", 1), ("C", 10), ("D", 2)] {
            for visit in 0..visits {
                rows.push_str(&format!("{},{}-{},2018\n", patient, patient, visit));
            }
        }
        let counts = ExamCounts::from_exams(&exams(&rows));
        let three = counts
            .patients_in(CountRange::at_least(3))
            .map(|id| id.to_string())
            .collect::<Vec<_>>();
        assert_eq!(three, vec!["A", "C"]);
        assert_eq!(counts.count_in(CountRange::at_least(10)), 1);

        let bands = counts
            .distribution(CountBands::exam_visits())
            .iter()
            .map(|(_, count)| count)
            .collect::<Vec<_>>();
        assert_eq!(bands, vec![1, 1, 1, 1]);
    }

    #[test]
    fn deterministic() {
        let exams = exams("id_patientarchive,id_patient,year\nB,1,2015\nA,2,2015\nA,3,2015\n");
        assert_eq!(ExamCounts::from_exams(&exams), ExamCounts::from_exams(&exams));
    }
}

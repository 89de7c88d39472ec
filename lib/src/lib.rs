pub mod category;
pub mod config;
pub mod crosstab;
pub mod exam_counts;
mod range;
pub mod session;
pub mod summary;
mod util;

pub use anyhow::{Context, Error};
use qu::ick_use::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::{btree_map, BTreeMap},
    fs, io,
    ops::Deref,
    path::Path,
    sync::Arc,
};

pub use crate::{
    category::{Category, ExamThreshold, Selector},
    config::{Config, Source},
    crosstab::{Query, QueryError, QueryResult},
    exam_counts::ExamCounts,
    range::{BandCounts, CountBands, CountRange},
    session::{Datasets, Session},
    summary::Summary,
    util::{header, path_exists, thousands, ResultExt},
};
use crate::util::{optional_key, optional_year};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
/// The `id_patientarchive` value. Opaque: only compared, never interpreted.
pub type PatientId = ArcStr;

/// Samples taken in this year or later make up the "2019+" datasets.
pub const RECENT_SAMPLE_YEAR: i32 = 2019;

/// A row type that belongs to exactly one patient.
///
/// Raw rows are what the CSV deserializer produces. Rows that don't identify a patient are
/// dropped during conversion.
pub trait PatientRecord: Clone + Serialize + DeserializeOwned {
    type Raw: DeserializeOwned;

    fn from_raw(raw: Self::Raw) -> Option<Self>;

    fn patient_id(&self) -> &PatientId;
}

#[derive(Debug, Deserialize)]
pub struct ExamRaw {
    #[serde(rename = "id_patientarchive", deserialize_with = "optional_key")]
    patient_id: Option<PatientId>,
    #[serde(rename = "id_patient", deserialize_with = "optional_key")]
    visit_id: Option<ArcStr>,
    #[serde(rename = "year", deserialize_with = "optional_year")]
    year: Option<i32>,
}

/// A row in the physical exam dataset. Each row is one visit.
///
/// The same `visit_id` can appear more than once for a patient, so visits must be counted
/// distinctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub patient_id: PatientId,
    pub visit_id: Option<ArcStr>,
    pub year: Option<i32>,
}

impl PatientRecord for Exam {
    type Raw = ExamRaw;

    fn from_raw(raw: ExamRaw) -> Option<Self> {
        Some(Exam {
            patient_id: raw.patient_id?,
            visit_id: raw.visit_id,
            year: raw.year,
        })
    }

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}

#[derive(Debug, Deserialize)]
pub struct SampleRaw {
    #[serde(rename = "id_patientarchive", deserialize_with = "optional_key")]
    patient_id: Option<PatientId>,
    #[serde(rename = "year", deserialize_with = "optional_year")]
    year: Option<i32>,
}

/// A row in the plasma or buffy coat sample datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub patient_id: PatientId,
    /// Missing years are kept, but never count as recent.
    pub year: Option<i32>,
}

impl Sample {
    pub fn taken_since(&self, year: i32) -> bool {
        matches!(self.year, Some(y) if y >= year)
    }
}

impl PatientRecord for Sample {
    type Raw = SampleRaw;

    fn from_raw(raw: SampleRaw) -> Option<Self> {
        Some(Sample {
            patient_id: raw.patient_id?,
            year: raw.year,
        })
    }

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}

#[derive(Debug, Deserialize)]
pub struct MemberRaw {
    #[serde(rename = "id_patientarchive", deserialize_with = "optional_key")]
    patient_id: Option<PatientId>,
}

/// A row in a presence-only dataset (WGS phenotype, clinical data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub patient_id: PatientId,
}

impl PatientRecord for Member {
    type Raw = MemberRaw;

    fn from_raw(raw: MemberRaw) -> Option<Self> {
        raw.patient_id.map(|patient_id| Member { patient_id })
    }

    fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}

/// A parsed dataset, with a pre-built index for the patient ID.
///
/// The index keys are the distinct patients in the dataset, so distinct counts and membership
/// tests never scan the rows.
#[derive(Debug)]
pub struct Dataset<R> {
    els: Arc<Vec<R>>,
    id_idx: BTreeMap<PatientId, Vec<usize>>,
}

impl<R> Clone for Dataset<R> {
    fn clone(&self) -> Self {
        Dataset {
            els: self.els.clone(),
            id_idx: self.id_idx.clone(),
        }
    }
}

impl<R: PatientRecord> Dataset<R> {
    /// Load a dataset from a CSV file in the source extract.
    pub fn load_orig(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("unable to open \"{}\"", path.display()))?;
        Self::from_reader(file).with_context(|| format!("while loading \"{}\"", path.display()))
    }

    /// Parse a dataset from CSV text with a header row.
    ///
    /// Columns not used by the record type are ignored. A missing column is an error.
    pub fn from_reader(reader: impl io::Read) -> Result<Self> {
        let raw: Vec<R::Raw> = load_orig(reader)?;
        let raw_len = raw.len();
        let els: Vec<R> = raw.into_iter().filter_map(R::from_raw).collect();
        if els.len() < raw_len {
            event!(
                Level::WARN,
                "skipped {} rows without a patient ID",
                raw_len - els.len()
            );
        }
        Ok(Self::new(els))
    }

    pub fn new(els: Vec<R>) -> Self {
        let mut this = Dataset {
            els: Arc::new(els),
            id_idx: BTreeMap::new(),
        };
        this.rebuild_index();
        this
    }

    /// Get a `Dataset` containing only rows that match the filter.
    pub fn filter(&self, f: impl Fn(&R) -> bool) -> Self {
        Self::new(self.els.iter().filter(|el| f(el)).cloned().collect())
    }

    fn rebuild_index(&mut self) {
        self.id_idx.clear();
        for (idx, el) in self.els.iter().enumerate() {
            self.id_idx
                .entry(el.patient_id().clone())
                .or_insert_with(Vec::new)
                .push(idx);
        }
    }
}

impl<R> Dataset<R> {
    pub fn contains_patient(&self, patient_id: &PatientId) -> bool {
        self.id_idx.contains_key(patient_id)
    }

    /// Number of distinct patients. Duplicate rows for a patient count once.
    pub fn distinct_patients(&self) -> usize {
        self.id_idx.len()
    }

    /// Distinct patient IDs, in order.
    pub fn patient_ids(&self) -> btree_map::Keys<'_, PatientId, Vec<usize>> {
        self.id_idx.keys()
    }

    pub fn iter_ref(&self) -> impl Iterator<Item = &R> + '_ {
        self.els.iter()
    }
}

impl<R> Deref for Dataset<R> {
    type Target = [R];
    fn deref(&self) -> &Self::Target {
        &self.els
    }
}

/// Load data into memory from a bincode snapshot.
fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    fn inner<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let reader = io::BufReader::new(fs::File::open(path)?);
        bincode::deserialize_from(reader).map_err(Into::into)
    }
    let path = path.as_ref();
    check_extension(path, "bin")?;

    inner(path).with_context(|| format!("unable to load data from \"{}\"", path.display()))
}

/// Save data to a bincode snapshot.
fn save<T: Serialize>(contents: &T, path: impl AsRef<Path>, overwrite: bool) -> Result {
    fn inner<T: Serialize>(contents: &T, path: &Path, overwrite: bool) -> Result {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create parent")?;
        }
        if util::path_exists(path)? {
            ensure!(overwrite, "file already exists");
            event!(
                Level::WARN,
                "overwriting existing file at \"{}\"",
                path.display()
            );
        }
        let mut out = io::BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(&mut out, contents)?;
        Ok(())
    }
    let path = path.as_ref();
    check_extension(path, "bin")?;

    inner(contents, path, overwrite)
        .with_context(|| format!("unable to save data to \"{}\"", path.display()))
}

/// Deserialize every row of a CSV source with a header row.
fn load_orig<T: DeserializeOwned>(reader: impl io::Read) -> Result<Vec<T>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(Into::into)
}

pub fn check_extension(path: &Path, ext: &str) -> Result<()> {
    ensure!(
        matches!(path.extension(), Some(p) if p == ext),
        "filename should end with `.{}`",
        ext
    );
    Ok(())
}

//! Loaded data for one interactive session.
//!
//! Everything is loaded once, up front, and never changes afterwards. Derived data (the exam
//! counts) is computed the first time it is asked for and then reused.
use crate::{
    load, save, util, Config, Dataset, Exam, ExamCounts, Member, PatientId, PatientRecord,
    Query, QueryError, QueryResult, Result, Sample, Selector, Source, Summary,
    RECENT_SAMPLE_YEAR,
};
use itertools::Itertools;
use once_cell::unsync::OnceCell;
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, time::SystemTime};

/// All the tables, including the derived "2019+" sample tables.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub exams: Dataset<Exam>,
    pub plasma: Dataset<Sample>,
    pub plasma_recent: Dataset<Sample>,
    pub buffy_coat: Dataset<Sample>,
    pub buffy_coat_recent: Dataset<Sample>,
    pub genomic: Dataset<Member>,
    pub clinical: Dataset<Member>,
    /// The source files as they were when read. Empty unless loaded from CSV (or a snapshot of
    /// CSVs).
    stamps: Vec<SourceStamp>,
}

/// What gets written to the snapshot file: the source tables only.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    stamps: Vec<SourceStamp>,
    exams: Vec<Exam>,
    plasma: Vec<Sample>,
    buffy_coat: Vec<Sample>,
    genomic: Vec<Member>,
    clinical: Vec<Member>,
}

/// Size and modification time of a source file, used to tell whether a snapshot still matches
/// the CSVs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SourceStamp {
    source: Source,
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceStamp {
    /// `None` if the file doesn't exist.
    fn read(source: Source, path: &Path) -> Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(SourceStamp {
                source,
                len: meta.len(),
                modified: meta.modified().ok(),
            })),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("unable to read metadata of \"{}\"", path.display()))
            }
        }
    }
}

impl Datasets {
    /// Build from the source tables, deriving the recent sample tables.
    pub fn from_parts(
        exams: Dataset<Exam>,
        plasma: Dataset<Sample>,
        buffy_coat: Dataset<Sample>,
        genomic: Dataset<Member>,
        clinical: Dataset<Member>,
    ) -> Self {
        let plasma_recent = plasma.filter(|s| s.taken_since(RECENT_SAMPLE_YEAR));
        let buffy_coat_recent = buffy_coat.filter(|s| s.taken_since(RECENT_SAMPLE_YEAR));
        Datasets {
            exams,
            plasma,
            plasma_recent,
            buffy_coat,
            buffy_coat_recent,
            genomic,
            clinical,
            stamps: Vec::new(),
        }
    }

    /// Load every source CSV named in the config.
    ///
    /// Either everything loads or nothing does: the first failure is returned, naming the source
    /// and file.
    pub fn load_orig(config: &Config) -> Result<Self> {
        let stamps = Source::ALL
            .iter()
            .filter_map(|&source| SourceStamp::read(source, &config.path_of(source)).transpose())
            .collect::<Result<Vec<_>>>()?;
        let mut data = Self::from_parts(
            load_source(config, Source::Exams)?,
            load_source(config, Source::Plasma)?,
            load_source(config, Source::BuffyCoat)?,
            load_source(config, Source::Genomic)?,
            load_source(config, Source::Clinical)?,
        );
        data.stamps = stamps;
        data.log_sizes();
        Ok(data)
    }

    /// Load from a snapshot written by `save`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot: Snapshot = load(path)?;
        let mut data = Self::from_parts(
            Dataset::new(snapshot.exams),
            Dataset::new(snapshot.plasma),
            Dataset::new(snapshot.buffy_coat),
            Dataset::new(snapshot.genomic),
            Dataset::new(snapshot.clinical),
        );
        data.stamps = snapshot.stamps;
        data.log_sizes();
        Ok(data)
    }

    /// Write the source tables to a snapshot, so later sessions skip CSV parsing.
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result {
        let snapshot = Snapshot {
            stamps: self.stamps.clone(),
            exams: self.exams.to_vec(),
            plasma: self.plasma.to_vec(),
            buffy_coat: self.buffy_coat.to_vec(),
            genomic: self.genomic.to_vec(),
            clinical: self.clinical.to_vec(),
        };
        save(&snapshot, path, overwrite)
    }

    /// Sources whose CSV has changed since these tables were read from it.
    ///
    /// A missing CSV doesn't count as a change: there is nothing newer to read.
    pub fn changed_sources(&self, config: &Config) -> Result<Vec<Source>> {
        let mut changed = Vec::new();
        for source in Source::ALL {
            let Some(current) = SourceStamp::read(source, &config.path_of(source))? else {
                continue;
            };
            if !self.stamps.contains(&current) {
                changed.push(source);
            }
        }
        Ok(changed)
    }

    /// Check that a downloaded or hand-edited file parses as the given source.
    ///
    /// Returns the number of rows with a patient ID.
    pub fn check_source(source: Source, path: &Path) -> Result<usize> {
        match source {
            Source::Exams => load_file::<Exam>(source, path).map(|d| d.len()),
            Source::Plasma | Source::BuffyCoat => {
                load_file::<Sample>(source, path).map(|d| d.len())
            }
            Source::Genomic | Source::Clinical => {
                load_file::<Member>(source, path).map(|d| d.len())
            }
        }
    }

    pub fn contains(&self, selector: Selector, patient_id: &PatientId) -> bool {
        use Selector::*;
        match selector {
            Plasma => self.plasma.contains_patient(patient_id),
            PlasmaRecent => self.plasma_recent.contains_patient(patient_id),
            BuffyCoat => self.buffy_coat.contains_patient(patient_id),
            BuffyCoatRecent => self.buffy_coat_recent.contains_patient(patient_id),
            Genomic => self.genomic.contains_patient(patient_id),
            Clinical => self.clinical.contains_patient(patient_id),
        }
    }

    pub fn distinct_patients(&self, selector: Selector) -> usize {
        use Selector::*;
        match selector {
            Plasma => self.plasma.distinct_patients(),
            PlasmaRecent => self.plasma_recent.distinct_patients(),
            BuffyCoat => self.buffy_coat.distinct_patients(),
            BuffyCoatRecent => self.buffy_coat_recent.distinct_patients(),
            Genomic => self.genomic.distinct_patients(),
            Clinical => self.clinical.distinct_patients(),
        }
    }

    /// Number of rows in a source table.
    pub fn rows(&self, source: Source) -> usize {
        use Source::*;
        match source {
            Exams => self.exams.len(),
            Plasma => self.plasma.len(),
            BuffyCoat => self.buffy_coat.len(),
            Genomic => self.genomic.len(),
            Clinical => self.clinical.len(),
        }
    }

    fn log_sizes(&self) {
        for source in Source::ALL {
            event!(Level::INFO, "{}: {} rows", source, self.rows(source));
        }
    }
}

fn load_source<R: PatientRecord>(config: &Config, source: Source) -> Result<Dataset<R>> {
    load_file(source, &config.path_of(source))
}

fn load_file<R: PatientRecord>(source: Source, path: &Path) -> Result<Dataset<R>> {
    fn check_columns(source: Source, path: &Path) -> Result {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = reader.headers()?;
        let missing = source
            .required_columns()
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .collect::<Vec<_>>();
        ensure!(
            missing.is_empty(),
            "missing column(s) {}",
            missing.iter().map(|col| format!("`{}`", col)).join(", ")
        );
        Ok(())
    }

    event!(Level::INFO, "loading {} from \"{}\"", source, path.display());
    check_columns(source, path)
        .and_then(|()| Dataset::load_orig(path))
        .with_context(|| format!("unable to load {} from \"{}\"", source, path.display()))
}

/// One session's loaded data, plus anything derived from it.
pub struct Session {
    data: Datasets,
    exam_counts: OnceCell<ExamCounts>,
}

impl Session {
    pub fn new(data: Datasets) -> Self {
        Session {
            data,
            exam_counts: OnceCell::new(),
        }
    }

    /// Load from the snapshot if the config names one that exists and the CSVs haven't changed
    /// since it was written, otherwise from the CSVs.
    pub fn open(config: &Config) -> Result<Self> {
        let data = match &config.snapshot {
            Some(path) if util::path_exists(path)? => {
                event!(Level::INFO, "loading snapshot \"{}\"", path.display());
                let data = Datasets::load(path)?;
                let changed = data.changed_sources(config)?;
                if changed.is_empty() {
                    data
                } else {
                    event!(
                        Level::WARN,
                        "snapshot \"{}\" is out of date ({} changed), reading the CSVs instead. \
                         Run `import_data --overwrite` to refresh it",
                        path.display(),
                        changed.iter().join(", ")
                    );
                    Datasets::load_orig(config)?
                }
            }
            _ => Datasets::load_orig(config)?,
        };
        Ok(Self::new(data))
    }

    pub fn data(&self) -> &Datasets {
        &self.data
    }

    /// Distinct visits per patient. Computed on first use.
    pub fn exam_counts(&self) -> &ExamCounts {
        self.exam_counts.get_or_init(|| {
            event!(Level::DEBUG, "deriving exam counts");
            ExamCounts::from_exams(&self.data.exams)
        })
    }

    pub fn summary(&self) -> Summary {
        Summary::compute(&self.data, self.exam_counts())
    }

    pub fn query(&self, query: &Query) -> Result<QueryResult, QueryError> {
        query.run(&self.data, self.exam_counts())
    }
}

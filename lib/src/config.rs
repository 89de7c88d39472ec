//! Where the source tables live.
//!
//! Read from a TOML file. Every field has a default, so an empty file (or no file at all) gives
//! the standard layout:
//!
//! ```toml
//! data_dir = "../data/whale"
//! snapshot = "../data/output/whale.bin"
//!
//! [files]
//! exams = "basic.csv"
//! plasma = "xue_sample.csv"
//! buffy_coat = "baimo_sample.csv"
//! genomic = "wgs.csv"
//! clinical = "clinical_data.csv"
//! ```
use crate::Result;
use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the CSV extracts. Relative file names are resolved against it.
    pub data_dir: PathBuf,
    /// Imported copy of the extracts. Used instead of the CSVs when present.
    pub snapshot: Option<PathBuf>,
    pub files: SourceFiles,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("../data/whale"),
            snapshot: Some(PathBuf::from("../data/output/whale.bin")),
            files: SourceFiles::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            toml::from_str(&text).map_err(Error::from)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config \"{}\"", path.display()))
    }

    /// The defaults when no config file was given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Full path of the CSV for a source.
    pub fn path_of(&self, source: Source) -> PathBuf {
        self.data_dir.join(self.files.get(source))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceFiles {
    pub exams: PathBuf,
    pub plasma: PathBuf,
    pub buffy_coat: PathBuf,
    pub genomic: PathBuf,
    pub clinical: PathBuf,
}

impl Default for SourceFiles {
    fn default() -> Self {
        SourceFiles {
            exams: "basic.csv".into(),
            plasma: "xue_sample.csv".into(),
            buffy_coat: "baimo_sample.csv".into(),
            genomic: "wgs.csv".into(),
            clinical: "clinical_data.csv".into(),
        }
    }
}

impl SourceFiles {
    pub fn get(&self, source: Source) -> &Path {
        use Source::*;
        match source {
            Exams => &self.exams,
            Plasma => &self.plasma,
            BuffyCoat => &self.buffy_coat,
            Genomic => &self.genomic,
            Clinical => &self.clinical,
        }
    }
}

/// One of the source tables. The "2019+" datasets are derived, so they aren't sources.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Source {
    Exams,
    Plasma,
    BuffyCoat,
    Genomic,
    Clinical,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Exams,
        Source::Plasma,
        Source::BuffyCoat,
        Source::Genomic,
        Source::Clinical,
    ];

    pub fn label(self) -> &'static str {
        use Source::*;
        match self {
            Exams => "physical exams",
            Plasma => "plasma samples",
            BuffyCoat => "buffy coat samples",
            Genomic => "WGS phenotype",
            Clinical => "clinical data",
        }
    }

    /// Columns that must be present in the CSV.
    pub fn required_columns(self) -> &'static [&'static str] {
        use Source::*;
        match self {
            Exams => &["id_patientarchive", "id_patient", "year"],
            Plasma | BuffyCoat => &["id_patientarchive", "year"],
            Genomic | Clinical => &["id_patientarchive"],
        }
    }
}

impl std::str::FromStr for Source {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        use Source::*;
        Ok(match input.trim() {
            "exams" | "basic" => Exams,
            "plasma" | "xue_sample" => Plasma,
            "buffy_coat" | "baimo_sample" => BuffyCoat,
            "genomic" | "wgs" => Genomic,
            "clinical" | "clinical_data" => Clinical,
            _ => anyhow::bail!("unrecognised data source \"{}\"", input),
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod test {
    use super::{Config, Source};
    use std::path::Path;

    #[test]
    fn empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_config() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/srv/whale"
            [files]
            clinical = "clinical_2023.csv"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.path_of(Source::Clinical),
            Path::new("/srv/whale/clinical_2023.csv")
        );
        assert_eq!(
            config.path_of(Source::Exams),
            Path::new("/srv/whale/basic.csv")
        );
        assert!(config.snapshot.is_some());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("data_dri = \"x\"").is_err());
    }

    #[test]
    fn source_names() {
        assert_eq!("wgs".parse::<Source>().unwrap(), Source::Genomic);
        assert_eq!("baimo_sample".parse::<Source>().unwrap(), Source::BuffyCoat);
        assert!("serum".parse::<Source>().is_err());
    }
}

//! The fixed vocabularies: exam thresholds, dataset selectors and the overview categories built
//! from them.
use crate::{crosstab::QueryError, CountRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base population filter on the number of distinct exam visits.
///
/// `All` is a real filter level (everyone with an exam record), not "no filter".
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum ExamThreshold {
    #[default]
    All,
    AtLeast3,
    AtLeast10,
}

impl ExamThreshold {
    pub const ALL: [ExamThreshold; 3] = [
        ExamThreshold::All,
        ExamThreshold::AtLeast3,
        ExamThreshold::AtLeast10,
    ];

    /// A human-readable label for the threshold.
    pub fn label(self) -> &'static str {
        use ExamThreshold::*;
        match self {
            All => "All",
            AtLeast3 => "3+",
            AtLeast10 => "10+",
        }
    }

    pub fn code(self) -> &'static str {
        use ExamThreshold::*;
        match self {
            All => "all",
            AtLeast3 => "3",
            AtLeast10 => "10",
        }
    }

    /// The exam counts that pass this threshold, `None` for `All`.
    pub fn range(self) -> Option<CountRange> {
        use ExamThreshold::*;
        match self {
            All => None,
            AtLeast3 => Some(CountRange::at_least(3)),
            AtLeast10 => Some(CountRange::at_least(10)),
        }
    }
}

impl std::str::FromStr for ExamThreshold {
    type Err = QueryError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        use ExamThreshold::*;
        Ok(match input.trim().to_ascii_lowercase().as_str() {
            "all" | "any" => All,
            "3" | "3+" => AtLeast3,
            "10" | "10+" => AtLeast10,
            _ => return Err(QueryError::UnknownThreshold(input.to_owned())),
        })
    }
}

impl fmt::Display for ExamThreshold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A dataset that can be intersected with the base population.
///
/// Ordering follows the overview, and is the order selected datasets are listed in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Selector {
    Plasma,
    PlasmaRecent,
    BuffyCoat,
    BuffyCoatRecent,
    Genomic,
    Clinical,
}

impl Selector {
    pub const ALL: [Selector; 6] = [
        Selector::Plasma,
        Selector::PlasmaRecent,
        Selector::BuffyCoat,
        Selector::BuffyCoatRecent,
        Selector::Genomic,
        Selector::Clinical,
    ];

    /// A human-readable label for the dataset.
    pub fn label(self) -> &'static str {
        use Selector::*;
        match self {
            Plasma => "Plasma samples",
            PlasmaRecent => "Plasma (2019+)",
            BuffyCoat => "Buffy coat samples",
            BuffyCoatRecent => "Buffy coat (2019+)",
            Genomic => "WGS phenotype",
            Clinical => "Clinical data",
        }
    }

    pub fn code(self) -> &'static str {
        use Selector::*;
        match self {
            Plasma => "plasma",
            PlasmaRecent => "plasma-2019",
            BuffyCoat => "buffy-coat",
            BuffyCoatRecent => "buffy-coat-2019",
            Genomic => "wgs",
            Clinical => "clinical",
        }
    }
}

impl std::str::FromStr for Selector {
    type Err = QueryError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        use Selector::*;
        Ok(
            match input.trim().to_ascii_lowercase().replace('_', "-").as_str() {
                "plasma" => Plasma,
                "plasma-2019" | "plasma-recent" => PlasmaRecent,
                "buffy-coat" | "buffycoat" => BuffyCoat,
                "buffy-coat-2019" | "buffycoat-2019" | "buffy-coat-recent" => BuffyCoatRecent,
                "wgs" | "genomic" => Genomic,
                "clinical" => Clinical,
                _ => return Err(QueryError::UnknownSelector(input.to_owned())),
            },
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One bar in the data overview.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Category {
    /// Patients in the exam data passing the threshold.
    Exams(ExamThreshold),
    /// Patients in a dataset.
    Dataset(Selector),
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 9] = [
        Category::Exams(ExamThreshold::All),
        Category::Exams(ExamThreshold::AtLeast3),
        Category::Exams(ExamThreshold::AtLeast10),
        Category::Dataset(Selector::Plasma),
        Category::Dataset(Selector::PlasmaRecent),
        Category::Dataset(Selector::BuffyCoat),
        Category::Dataset(Selector::BuffyCoatRecent),
        Category::Dataset(Selector::Genomic),
        Category::Dataset(Selector::Clinical),
    ];

    pub fn label(self) -> &'static str {
        use Category::*;
        match self {
            Exams(ExamThreshold::All) => "Exam population",
            Exams(ExamThreshold::AtLeast3) => "Exams 3+",
            Exams(ExamThreshold::AtLeast10) => "Exams 10+",
            Dataset(selector) => selector.label(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod test {
    use super::{Category, ExamThreshold, Selector};
    use crate::QueryError;

    #[test]
    fn selector_codes_round_trip() {
        for selector in Selector::ALL {
            assert_eq!(selector.code().parse::<Selector>().unwrap(), selector);
        }
        assert_eq!(" Genomic ".parse::<Selector>().unwrap(), Selector::Genomic);
        assert_eq!(
            "buffy_coat_2019".parse::<Selector>().unwrap(),
            Selector::BuffyCoatRecent
        );
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(
            "serum".parse::<Selector>(),
            Err(QueryError::UnknownSelector("serum".into()))
        );
        assert_eq!(
            "5".parse::<ExamThreshold>(),
            Err(QueryError::UnknownThreshold("5".into()))
        );
    }

    #[test]
    fn thresholds() {
        assert_eq!("ALL".parse::<ExamThreshold>().unwrap(), ExamThreshold::All);
        assert_eq!("10+".parse::<ExamThreshold>().unwrap(), ExamThreshold::AtLeast10);
        assert!(ExamThreshold::All.range().is_none());
        assert_eq!(ExamThreshold::AtLeast3.range().unwrap().start(), 3);
    }

    #[test]
    fn categories_cover_every_dataset() {
        for selector in Selector::ALL {
            assert!(Category::ALL.contains(&Category::Dataset(selector)));
        }
        assert_eq!(Category::ALL[0], Category::Exams(ExamThreshold::All));
    }
}

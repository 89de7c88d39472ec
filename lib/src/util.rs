use crate::ArcStr;
use serde::{de, Deserialize, Deserializer};
use std::{fs, io, path::Path};

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

// Helpers for serde to parse fields with quirks.

/// Values that mean "nothing here" in exports from pandas and the hospital database.
fn is_missing(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("nan")
}

/// Parse an identifier, mapping missing markers to `None`.
///
/// The identifier is otherwise kept exactly as written (after trimming), so `007` and `7` are
/// different keys. The same goes for `123.0` and `123`: an ID column exported as floats must be
/// fixed in the extract before it will match the other tables.
pub fn optional_key<'de, D>(d: D) -> Result<Option<ArcStr>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(d)?;
    let s = s.trim();
    if is_missing(s) {
        Ok(None)
    } else {
        Ok(Some(s.into()))
    }
}

/// Parse a year, accepting `2019` and `2019.0` (columns with gaps get exported as floats).
pub fn optional_year<'de, D>(d: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(d)?;
    let s = s.trim();
    if is_missing(s) {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<i32>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v == v.trunc() && v.abs() < 1e6 => Ok(Some(v as i32)),
        _ => Err(de::Error::custom(format!("invalid year \"{}\"", s))),
    }
}

/// Format a count with `,` between thousands.
pub fn thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// A horizontal bar of `#` proportional to `value / max`.
pub(crate) fn bar(value: usize, max: usize, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (value as f64 / max as f64 * width as f64).round() as usize;
    "#".repeat(len.min(width))
}

// error printing helper.
//
pub trait ResultExt {
    fn print_error(self) -> Self;
}

impl<T> ResultExt for Result<T, anyhow::Error> {
    fn print_error(self) -> Self {
        match self {
            Ok(v) => Ok(v),
            Err(error) => {
                println!("error: {}", error);
                let mut err: &dyn std::error::Error = error.as_ref();
                while let Some(cause) = err.source() {
                    println!("caused by: {}", cause);
                    err = cause;
                }
                Err(error)
            }
        }
    }
}

pub fn header(header: &str) {
    let len = header.chars().count();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}

#[cfg(test)]
mod test {
    use super::{bar, optional_key, optional_year, thousands};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "optional_key")]
        id: Option<crate::ArcStr>,
        #[serde(deserialize_with = "optional_year")]
        year: Option<i32>,
    }

    fn parse(input: &str) -> Result<Vec<Row>, csv::Error> {
        csv::Reader::from_reader(input.as_bytes())
            .into_deserialize()
            .collect()
    }

    #[test]
    fn years() {
        let rows = parse("id,year\na,2019\nb,2018.0\nc,\nd,NaN\n").unwrap();
        let years = rows.iter().map(|r| r.year).collect::<Vec<_>>();
        assert_eq!(years, vec![Some(2019), Some(2018), None, None]);
        assert!(parse("id,year\na,2019.5\n").is_err());
        assert!(parse("id,year\na,soon\n").is_err());
    }

    #[test]
    fn keys() {
        let rows = parse("id,year\n 007 ,2019\nNULL,2019\n").unwrap();
        assert_eq!(rows[0].id.as_deref(), Some("007"));
        assert_eq!(rows[1].id, None);

        let rows = parse("id,year\n123.0,2019\n123,2019\n").unwrap();
        assert_eq!(rows[0].id.as_deref(), Some("123.0"));
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn bars() {
        assert_eq!(bar(5, 10, 10), "#####");
        assert_eq!(bar(10, 10, 4), "####");
        assert_eq!(bar(1, 0, 4), "");
    }
}

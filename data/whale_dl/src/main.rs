use std::{fs, io, path::PathBuf};

use clap::Parser;
use qu::ick_use::*;
use serde::Deserialize;
use url::Url;
use whale_crosstab::{Config, Datasets, Source};

/// Sources that are published remotely rather than handed over as files.
const SOURCE_INDEX: &str = include_str!("../sources.csv");

#[derive(Parser)]
struct Opt {
    /// TOML file saying where the extracts are
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Directory to write to, instead of the configured data directory
    #[clap(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RemoteSourceRaw {
    source: String,
    url: String,
}

#[derive(Debug)]
struct RemoteSource {
    source: Source,
    url: Url,
}

impl RemoteSource {
    fn from_raw(raw: RemoteSourceRaw) -> Result<Self> {
        Ok(RemoteSource {
            source: raw.source.parse()?,
            url: Url::parse(&raw.url).with_context(|| format!("bad url for {}", raw.source))?,
        })
    }
}

fn remote_sources() -> Result<Vec<RemoteSource>> {
    csv::Reader::from_reader(io::Cursor::new(SOURCE_INDEX))
        .into_deserialize()
        .map(|row| RemoteSource::from_raw(row?))
        .collect()
}

#[qu::ick]
fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let out_dir = opt.out.unwrap_or_else(|| config.data_dir.clone());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating \"{}\"", out_dir.display()))?;

    for remote in remote_sources()? {
        let out_path = out_dir.join(config.files.get(remote.source));
        event!(Level::INFO, "Downloading {} from {}", remote.source, remote.url);
        let raw = reqwest::blocking::get(remote.url.clone())?
            .error_for_status()?
            .bytes()?;
        event!(Level::INFO, "Writing {} bytes to {}", raw.len(), out_path.display());
        fs::write(&out_path, &raw)
            .with_context(|| format!("writing \"{}\"", out_path.display()))?;

        // a share link that has expired returns an HTML page, not CSV
        let rows = Datasets::check_source(remote.source, &out_path)?;
        event!(Level::INFO, "{}: {} rows", remote.source, rows);
    }
    Ok(())
}

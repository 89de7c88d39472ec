//! Count the patients meeting an exam threshold and present in every chosen dataset.
//!
//! e.g. `crosstab --threshold 3 --dataset plasma-2019 --dataset wgs`
use clap::Parser;
use qu::ick_use::*;
use std::path::PathBuf;
use whale_crosstab::{Config, Query, Session};

#[derive(Parser)]
struct Opt {
    /// TOML file saying where the extracts are
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Always read the CSV extracts, even when a snapshot exists
    #[clap(long)]
    no_snapshot: bool,
    /// Minimum number of exam visits: all, 3 or 10
    #[clap(long, short, default_value = "all")]
    threshold: String,
    /// Dataset to intersect with (repeatable): plasma, plasma-2019, buffy-coat,
    /// buffy-coat-2019, wgs, clinical
    #[clap(long = "dataset", short)]
    datasets: Vec<String>,
    /// Print the result as JSON
    #[clap(long)]
    json: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    // check the question before spending time loading data
    let query = Query::parse(&opt.threshold, &opt.datasets)?;
    query.check()?;

    let mut config = Config::load_or_default(opt.config.as_deref())?;
    if opt.no_snapshot {
        config.snapshot = None;
    }
    let session = Session::open(&config)?;
    let result = session.query(&query)?;

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.term_table());
    }
    Ok(())
}

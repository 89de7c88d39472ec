//! Parse the CSV extracts and write them to a snapshot, so later sessions start quickly.
use clap::Parser;
use qu::ick_use::*;
use std::path::PathBuf;
use term_data_table::{Cell, Row, Table};
use whale_crosstab::{header, thousands, Config, Datasets, Source};

#[derive(Parser)]
struct Opt {
    /// TOML file saying where the extracts are
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Write the snapshot here instead of the configured location
    #[clap(long)]
    out: Option<PathBuf>,
    /// If set, allow overwriting an existing snapshot
    #[clap(long, short)]
    overwrite: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load_or_default(opt.config.as_deref())?;
    let out = match opt.out.or_else(|| config.snapshot.clone()) {
        Some(out) => out,
        None => bail!("no snapshot location configured, pass --out"),
    };

    let data = Datasets::load_orig(&config)?;

    header("Imported");
    let mut table = Table::new().with_row(
        Row::new()
            .with_cell(Cell::from("Source"))
            .with_cell(Cell::from("File"))
            .with_cell(Cell::from("Rows")),
    );
    for source in Source::ALL {
        table.add_row(
            Row::new()
                .with_cell(Cell::from(source.label()))
                .with_cell(Cell::from(config.path_of(source).display().to_string()))
                .with_cell(Cell::from(thousands(data.rows(source)))),
        );
    }
    println!("{}", table);

    data.save(&out, opt.overwrite)?;
    event!(Level::INFO, "snapshot written to \"{}\"", out.display());
    Ok(())
}

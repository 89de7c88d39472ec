use clap::Parser;
use qu::ick_use::*;
use std::path::PathBuf;
use whale_crosstab::{header, thousands, Config, CountBands, Session};

#[derive(Parser)]
struct Opt {
    /// TOML file saying where the extracts are
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Always read the CSV extracts, even when a snapshot exists
    #[clap(long)]
    no_snapshot: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let mut config = Config::load_or_default(opt.config.as_deref())?;
    if opt.no_snapshot {
        config.snapshot = None;
    }
    let session = Session::open(&config)?;

    header("Data categories");
    println!("{}", session.summary().term_table());

    header("Exam visits per patient");
    let exam_counts = session.exam_counts();
    println!(
        "{} of {} patients in the exam data have a recorded visit\n",
        thousands(exam_counts.len()),
        thousands(session.data().exams.distinct_patients())
    );
    println!(
        "{}",
        exam_counts
            .distribution(CountBands::exam_visits())
            .term_table("Visits")
    );
    Ok(())
}

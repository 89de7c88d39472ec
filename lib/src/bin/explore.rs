//! Load the data once, then answer cross tabulation queries typed at the prompt.
use clap::Parser;
use qu::ick_use::*;
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use whale_crosstab::{header, Config, ExamThreshold, Query, ResultExt, Selector, Session};

#[derive(Parser)]
struct Opt {
    /// TOML file saying where the extracts are
    #[clap(long, short)]
    config: Option<PathBuf>,
    /// Always read the CSV extracts, even when a snapshot exists
    #[clap(long)]
    no_snapshot: bool,
}

const HELP: &str = "\
Enter an exam threshold followed by any datasets, separated by spaces.

  thresholds: all, 3, 10
  datasets:   plasma, plasma-2019, buffy-coat, buffy-coat-2019, wgs, clinical

e.g. `3 plasma wgs` or `all wgs clinical`. `all` on its own is not a question.

Other commands: summary, help, quit";

enum Command {
    Query(Query),
    Summary,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };
    Ok(Some(match first.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => Command::Quit,
        "help" | "?" => Command::Help,
        "summary" => Command::Summary,
        // a dataset first means no exam threshold
        _ if first.parse::<Selector>().is_ok() => {
            Command::Query(Query::parse("all", line.split_whitespace())?)
        }
        _ if first.parse::<ExamThreshold>().is_ok() => {
            Command::Query(Query::parse(first, words)?)
        }
        _ => bail!(
            "\"{}\" is neither an exam threshold (all, 3, 10) nor a dataset (plasma, \
             plasma-2019, buffy-coat, buffy-coat-2019, wgs, clinical)",
            first
        ),
    }))
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
    println!("{}\n", HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = match parse_line(&line).print_error() {
            Ok(Some(command)) => command,
            Ok(None) | Err(_) => continue,
        };
        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Summary => println!("{}", session.summary().term_table()),
            Command::Query(query) => {
                if let Ok(result) = session.query(&query).map_err(Error::from).print_error() {
                    println!("{}", result.term_table());
                }
            }
        }
    }
    Ok(())
}

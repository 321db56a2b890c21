use std::path::Path;
use std::process;

use env_logger;
use log;
use rand::Rng;

use recsort::{RecordWriter, SortError};

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .init();

    let arg_parser = build_arg_parser();

    let count = match arg_parser.value_of("count").expect("value is required").parse::<usize>() {
        Ok(count) => count,
        Err(err) => {
            log::error!("can't convert record count to a number: {}", err);
            process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    let mut records: Vec<u64> = (0..count).map(|_| rng.gen()).collect();

    let output = arg_parser.value_of("output").expect("value is required");
    if let Err(err) = write_records(Path::new(output), &records) {
        log::error!("{}", err);
        process::exit(1);
    }

    if let Some(sorted_output) = arg_parser.value_of("sorted_output") {
        records.sort_unstable();
        if let Err(err) = write_records(Path::new(sorted_output), &records) {
            log::error!("{}", err);
            process::exit(1);
        }
    }
}

fn write_records(path: &Path, records: &[u64]) -> Result<(), SortError> {
    let mut writer: RecordWriter<u64> = RecordWriter::create(path)?;
    for record in records {
        writer.write(record)?;
    }

    return writer.close();
}

fn build_arg_parser() -> clap::ArgMatches {
    let app = clap::App::new("gen-records")
        .about("generates random fixed-width record files for sorting tests")
        .arg(
            clap::Arg::new("count")
                .help("number of records to generate")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .help("file the random records are written to")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("sorted_output")
                .help("optional file the sorted expectation is written to")
                .takes_value(true),
        );

    match app.try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            match err.kind {
                clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(1),
            }
        }
    }
}

use std::path::Path;
use std::process;

use clap::ArgEnum;
use env_logger;
use log;

use recsort::{CancellationToken, ExternalSorterBuilder, RecordReader, RecordWriter, DEFAULT_CHUNK_SIZE};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let chunk_size = match arg_parser.value_of("chunk_size") {
        Some(raw) => match raw.parse::<usize>() {
            Ok(chunk_size) if chunk_size > 0 => chunk_size,
            _ => {
                log::error!("can't convert {} to a positive record count", raw);
                process::exit(1);
            }
        },
        None => DEFAULT_CHUNK_SIZE,
    };

    let cancel_token = CancellationToken::new();
    {
        let handler_token = cancel_token.clone();
        if let Err(err) = ctrlc::set_handler(move || handler_token.trigger()) {
            log::warn!("interrupt handler not installed: {}", err);
        }
    }

    let input = arg_parser.value_of("input").expect("value is required");
    let mut input_stream: RecordReader<u64> = match RecordReader::open(Path::new(input)) {
        Ok(stream) => stream,
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };

    let output = arg_parser.value_of("output").expect("value is required");
    let mut output_stream: RecordWriter<u64> = match RecordWriter::create(Path::new(output)) {
        Ok(stream) => stream,
        Err(err) => {
            log::error!("{}", err);
            process::exit(1);
        }
    };

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_chunk_size(chunk_size)
        .with_cancellation_token(cancel_token);

    if let Some(tmp_dir) = arg_parser.value_of("tmp_dir") {
        sorter_builder = sorter_builder.with_tmp_dir(Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = sorter.sort(&mut input_stream, &mut output_stream) {
        log::error!("{}", err);
        process::exit(1);
    }

    if let Err(err) = output_stream.close() {
        log::error!("{}", err);
        process::exit(1);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    let app = clap::App::new("recsort")
        .about("external merge sort for fixed-width binary record files")
        .arg(
            clap::Arg::new("input")
                .help("file of records to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .help("sorted result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .help("number of records sorted in memory at a time")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
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

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}

use std::fs;
use std::io;
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use pipe_sort::{ChunkPlan, PipelineBuilder, PipelineError};

fn main() {
    let arg_parser = build_arg_parser();

    let (command, args) = match arg_parser.subcommand() {
        Some((command, args)) => (command, args),
        None => unreachable!("subcommand is required"),
    };

    let log_level: LogLevel = args.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let result = match command {
        "generate" => generate(args),
        "sort" => sort(args),
        "print" => print(args),
        _ => unreachable!("unknown subcommand"),
    };

    if let Err(err) = result {
        log::error!("{} failed: {}", command, err);
        process::exit(1);
    }
}

fn generate(args: &clap::ArgMatches) -> Result<(), PipelineError> {
    let output = args.value_of("output").expect("value is required");
    let count: usize = args.value_of_t_or_exit("count");

    let pipeline = PipelineBuilder::new().build()?;
    pipeline.write_file(path::Path::new(output), pipeline.random_source(count))?;

    return Ok(());
}

fn sort(args: &clap::ArgMatches) -> Result<(), PipelineError> {
    let input = path::Path::new(args.value_of("input").expect("value is required"));
    let output = path::Path::new(args.value_of("output").expect("value is required"));
    let mode: Mode = args.value_of_t_or_exit("mode");
    let threads: Option<usize> = args
        .is_present("threads")
        .then(|| args.value_of_t_or_exit("threads"));
    let queue_capacity: usize = args.value_of_t_or_exit("queue_capacity");

    let mut pipeline_builder = PipelineBuilder::new().with_queue_capacity(queue_capacity);
    if let Some(threads) = threads {
        pipeline_builder = pipeline_builder.with_threads_number(threads);
    }
    if let Some(host) = args.value_of("bind_host") {
        pipeline_builder = pipeline_builder.with_bind_host(host);
    }
    let pipeline = pipeline_builder.build()?;

    let total_len = fs::metadata(input).map_err(PipelineError::Resource)?.len();
    let plan = if args.is_present("chunk_size") {
        let chunk_size = args.value_of("chunk_size").expect("value is present");
        ChunkPlan::by_size(total_len, chunk_size.parse::<ByteSize>().expect("value is pre-validated").as_u64())?
    } else {
        ChunkPlan::by_count(total_len, args.value_of_t_or_exit("chunks"))?
    };

    let sorted = match mode {
        Mode::Local => pipeline.sort_file(input, &plan)?,
        Mode::Net => pipeline.sort_file_over_network(input, &plan)?,
    };
    pipeline.write_file(output, sorted)?;

    return Ok(());
}

fn print(args: &clap::ArgMatches) -> Result<(), PipelineError> {
    let input = args.value_of("input").expect("value is required");
    let count: usize = args.value_of_t_or_exit("count");

    let pipeline = PipelineBuilder::new().with_threads_number(1).build()?;
    let file = fs::File::open(input).map_err(PipelineError::Resource)?;
    let mut records = pipeline.reader_source(io::BufReader::new(file), None);

    for record in records.by_ref().take(count) {
        println!("{}", record?);
    }

    return records.join();
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

#[derive(Copy, Clone, clap::ArgEnum)]
enum Mode {
    Local,
    Net,
}

impl Mode {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Mode::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Mode as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("pipe-sort")
        .about("external sorter of 64-bit big-endian integer records")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .global(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .subcommand(
            clap::App::new("generate")
                .about("writes random records to a file")
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("file to be created")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("count")
                        .short('n')
                        .long("count")
                        .help("number of records")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            clap::App::new("sort")
                .about("sorts a record file")
                .arg(
                    clap::Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("file to be sorted")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("result file")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("chunks")
                        .short('c')
                        .long("chunks")
                        .help("number of chunks sorted in memory")
                        .takes_value(true)
                        .required_unless_present("chunk_size")
                        .conflicts_with("chunk_size"),
                )
                .arg(
                    clap::Arg::new("chunk_size")
                        .short('s')
                        .long("chunk-size")
                        .help("size of chunks sorted in memory, a multiple of 8 bytes")
                        .takes_value(true)
                        .validator(|v| match v.parse::<ByteSize>() {
                            Ok(_) => Ok(()),
                            Err(err) => Err(format!("Chunk size format incorrect: {}", err)),
                        }),
                )
                .arg(
                    clap::Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .help("whether sorted chunks are merged locally or over TCP connections")
                        .takes_value(true)
                        .default_value("local")
                        .possible_values(Mode::possible_values()),
                )
                .arg(
                    clap::Arg::new("threads")
                        .short('t')
                        .long("threads")
                        .help("number of threads to use for parallel sorting")
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("queue_capacity")
                        .short('q')
                        .long("queue-capacity")
                        .help("capacity of queues between pipeline stages")
                        .takes_value(true)
                        .default_value("1024"),
                )
                .arg(
                    clap::Arg::new("bind_host")
                        .long("bind-host")
                        .help("host network sinks listen on in net mode")
                        .takes_value(true),
                ),
        )
        .subcommand(
            clap::App::new("print")
                .about("prints the first records of a file")
                .arg(
                    clap::Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("file to be printed")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("count")
                        .short('n')
                        .long("count")
                        .help("number of records to print")
                        .takes_value(true)
                        .default_value("100"),
                ),
        )
        .get_matches()
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

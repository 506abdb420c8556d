use clap::builder::{styling, PossibleValuesParser};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lincomp_common::config::{CompileOptions, EmitFormat, PassOptions, SearchOptions};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub src_path: PathBuf,

    // `None` compiles every candidate the search finds.
    pub limit: Option<usize>,
    pub emit: EmitFormat,
    pub options: CompileOptions,
}

#[derive(Clone, Debug)]
pub struct CandidatesConfig {
    pub src_path: PathBuf,
    pub limit: Option<usize>,
    pub search: SearchOptions,
}

#[derive(Clone, Debug)]
pub enum Config {
    BuildConfig(BuildConfig),
    CandidatesConfig(CandidatesConfig),
}

const EMIT_FORMATS: &[&str] = &["text", "json"];
const DEFAULT_EMIT_FORMAT: &str = "text";

fn parse_emit_format(s: &str) -> EmitFormat {
    match s {
        "text" => EmitFormat::Text,
        "json" => EmitFormat::Json,
        _ => unreachable!(),
    }
}

fn src_path_arg() -> Arg {
    Arg::new("src-path")
        .help("Specify the problem file to compile.")
        .required(true)
        .index(1)
}

fn node_limit_arg() -> Arg {
    Arg::new("node-limit")
        .long("node-limit")
        .value_parser(value_parser!(usize))
        .help(
            "Abandon candidates that would need more than this many operations. Without a bound, \
            termination of the search depends on the operation catalog.",
        )
}

fn search_options(matches: &ArgMatches) -> SearchOptions {
    SearchOptions {
        node_limit: matches.get_one::<usize>("node-limit").copied(),
    }
}

fn limit_arg(matches: &ArgMatches) -> Option<usize> {
    matches.get_one::<u64>("limit").map(|&limit| limit as usize)
}

fn src_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("src-path")
        .map(PathBuf::from)
        .unwrap_or_default()
}

impl Config {
    /// Parses the command line. Also returns the requested log verbosity.
    pub fn from_args() -> (Self, usize) {
        Self::from_matches(Self::command().get_matches())
    }

    pub fn command() -> Command {
        let styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
            .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
            .literal(styling::AnsiColor::Cyan.on_default() | styling::Effects::BOLD)
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(std::env!("CARGO_PKG_NAME"))
            .version(std::env!("CARGO_PKG_VERSION"))
            .about(std::env!("CARGO_PKG_DESCRIPTION"))
            .styles(styles)
            .next_line_help(true)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .global(true)
                    .action(ArgAction::Count)
                    .help("Log more. Repeat for search and pass traces."),
            )
            .subcommand(
                Command::new("build")
                    .about("Finds kernel sequences for a problem and plans their storage")
                    .arg(src_path_arg())
                    .arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(value_parser!(u64).range(1..))
                            .default_value("1")
                            .conflicts_with("all")
                            .help("Compile at most this many candidates, in search order."),
                    )
                    .arg(
                        Arg::new("all")
                            .long("all")
                            .action(ArgAction::SetTrue)
                            .help("Compile every candidate the search finds."),
                    )
                    .arg(node_limit_arg())
                    .arg(
                        Arg::new("no-elide-copies")
                            .long("no-elide-copies")
                            .action(ArgAction::SetTrue)
                            .help(
                                "Keep every copy inserted to protect the inputs of in-place \
                                kernels, even where nothing reads the protected value again.",
                            ),
                    )
                    .arg(
                        Arg::new("emit")
                            .long("emit")
                            .value_parser(PossibleValuesParser::new(EMIT_FORMATS))
                            .default_value(DEFAULT_EMIT_FORMAT)
                            .help("Set the format of the emitted plans."),
                    ),
            )
            .subcommand(
                Command::new("candidates")
                    .about("Lists kernel sequences for a problem without planning storage")
                    .arg(src_path_arg())
                    .arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(value_parser!(u64).range(1..))
                            .help("List at most this many candidates."),
                    )
                    .arg(node_limit_arg()),
            )
    }

    pub fn from_matches(matches: ArgMatches) -> (Self, usize) {
        let verbosity = matches.get_count("verbose") as usize;

        if let Some(matches) = matches.subcommand_matches("build") {
            let limit = if matches.get_flag("all") {
                None
            } else {
                limit_arg(matches)
            };

            let emit = parse_emit_format(
                matches
                    .get_one::<String>("emit")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_EMIT_FORMAT),
            );

            let build_config = BuildConfig {
                src_path: src_path(matches),
                limit,
                emit,
                options: CompileOptions {
                    search: search_options(matches),
                    passes: PassOptions {
                        elide_copies: !matches.get_flag("no-elide-copies"),
                    },
                },
            };
            return (Self::BuildConfig(build_config), verbosity);
        }

        if let Some(matches) = matches.subcommand_matches("candidates") {
            let candidates_config = CandidatesConfig {
                src_path: src_path(matches),
                limit: limit_arg(matches),
                search: search_options(matches),
            };
            return (Self::CandidatesConfig(candidates_config), verbosity);
        }

        // Clap will exit our program gracefully if no subcommand is provided.
        // Therefore, one of the above if statements will always trigger.
        unreachable!();
    }
}

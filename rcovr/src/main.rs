//! # rcovr
//!
//! A CLI for aggregating gcov code coverage results across a project.
//!
//! ## Overview
//!
//! rcovr is built on top of rcovrlib. It finds the coverage data files a
//! test run left behind, runs `gcov` on each of them, merges the
//! per-compilation-unit reports into one per-file view, and renders the
//! result as a text table, a Cobertura XML document, or an HTML page.
//! Coverage minimums can be enforced through the exit status, so CI jobs
//! can fail on insufficient coverage without parsing the output.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize coverage for the project in the current directory
//! rcovr -r .
//!
//! # Branch coverage table, worst-covered files first
//! rcovr -b -p
//!
//! # Cobertura XML for CI, failing under 80% line coverage
//! rcovr -x -o coverage.xml --fail-under-line 80
//!
//! # HTML report with one annotated page per source file
//! rcovr --html --html-details -o coverage.html
//!
//! # Consume pre-generated *.gcov reports instead of running gcov
//! rcovr -g build/reports
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::style;
use rcovrlib::{
    run, HtmlFormatter, Options, RunReport, SortMode, SummaryFormatter, TextFormatter,
    XmlFormatter,
};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("rcovr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run gcov across a project and aggregate the coverage results")
        .arg(
            Arg::new("search-path")
                .help("Search these paths for coverage data files (defaults to the root)")
                .num_args(0..),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print progress messages"),
        )
        .arg(
            Arg::new("fail-under-line")
                .long("fail-under-line")
                .value_name("MIN")
                .value_parser(percentage)
                .default_value("0.0")
                .help(
                    "Exit with a status of 2 if the total line coverage is less than MIN. \
                     Can be ORed with the exit status of --fail-under-branch",
                ),
        )
        .arg(
            Arg::new("fail-under-branch")
                .long("fail-under-branch")
                .value_name("MIN")
                .value_parser(percentage)
                .default_value("0.0")
                .help(
                    "Exit with a status of 4 if the total branch coverage is less than MIN. \
                     Can be ORed with the exit status of --fail-under-line",
                ),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Print output to this filename"),
        )
        .arg(
            Arg::new("branches")
                .short('b')
                .long("branches")
                .action(ArgAction::SetTrue)
                .help("Tabulate the branch coverage instead of the line coverage"),
        )
        .arg(
            Arg::new("sort-uncovered")
                .short('u')
                .long("sort-uncovered")
                .action(ArgAction::SetTrue)
                .help("Sort entries by increasing number of uncovered lines"),
        )
        .arg(
            Arg::new("sort-percentage")
                .short('p')
                .long("sort-percentage")
                .action(ArgAction::SetTrue)
                .help("Sort entries by decreasing percentage of covered lines"),
        )
        .arg(
            Arg::new("print-summary")
                .short('s')
                .long("print-summary")
                .action(ArgAction::SetTrue)
                .help("Print a small report to stdout with line & branch percentage coverage"),
        )
        .arg(
            Arg::new("xml")
                .short('x')
                .long("xml")
                .action(ArgAction::SetTrue)
                .help("Generate XML instead of the normal tabular output"),
        )
        .arg(
            Arg::new("xml-pretty")
                .long("xml-pretty")
                .action(ArgAction::SetTrue)
                .help("Generate pretty XML instead of the normal dense format"),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .action(ArgAction::SetTrue)
                .help("Generate HTML instead of the normal tabular output"),
        )
        .arg(
            Arg::new("html-details")
                .long("html-details")
                .action(ArgAction::SetTrue)
                .help("Generate HTML output for source file coverage"),
        )
        .arg(
            Arg::new("html-absolute-paths")
                .long("html-absolute-paths")
                .action(ArgAction::SetTrue)
                .help("Set the paths in the HTML report to be absolute instead of relative"),
        )
        .arg(
            Arg::new("html-encoding")
                .long("html-encoding")
                .value_name("ENCODING")
                .default_value("UTF-8")
                .help("HTML file encoding"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("ROOT")
                .default_value(".")
                .help(
                    "Defines the root directory for source files. This is also used \
                     to filter the files, and to standardize the output",
                ),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .action(ArgAction::Append)
                .value_name("REGEX")
                .help("Keep only the source files that match this regular expression"),
        )
        .arg(
            Arg::new("exclude")
                .short('e')
                .long("exclude")
                .action(ArgAction::Append)
                .value_name("REGEX")
                .help("Exclude source files that match this regular expression"),
        )
        .arg(
            Arg::new("gcov-filter")
                .long("gcov-filter")
                .value_name("REGEX")
                .help("Keep only gcov data files that match this regular expression"),
        )
        .arg(
            Arg::new("gcov-exclude")
                .long("gcov-exclude")
                .action(ArgAction::Append)
                .value_name("REGEX")
                .help("Exclude gcov data files that match this regular expression"),
        )
        .arg(
            Arg::new("exclude-directories")
                .long("exclude-directories")
                .action(ArgAction::Append)
                .value_name("REGEX")
                .help("Exclude directories from the search path that match this regular expression"),
        )
        .arg(
            Arg::new("gcov-executable")
                .long("gcov-executable")
                .value_name("GCOV")
                .help(
                    "Defines the name/path to the gcov executable [defaults to the \
                     GCOV environment variable, if present; else 'gcov']",
                ),
        )
        .arg(
            Arg::new("exclude-unreachable-branches")
                .long("exclude-unreachable-branches")
                .action(ArgAction::SetTrue)
                .help(
                    "Exclude branches which are marked with LCOV/GCOV exclusion markers \
                     or sit on lines containing only compiler-generated \"dead\" code",
                ),
        )
        .arg(
            Arg::new("use-gcov-files")
                .short('g')
                .long("use-gcov-files")
                .action(ArgAction::SetTrue)
                .help("Use preprocessed gcov files for analysis"),
        )
        .arg(
            Arg::new("gcov-ignore-parse-errors")
                .long("gcov-ignore-parse-errors")
                .action(ArgAction::SetTrue)
                .help(
                    "Skip lines with parse errors in gcov files instead of exiting \
                     with an error. A report is shown on stderr",
                ),
        )
        .arg(
            Arg::new("object-directory")
                .long("object-directory")
                .value_name("DIR")
                .help(
                    "Specify the directory that contains the gcov data files, when \
                     they do not sit next to the object files",
                ),
        )
        .arg(
            Arg::new("keep")
                .short('k')
                .long("keep")
                .action(ArgAction::SetTrue)
                .help("Keep the temporary *.gcov files generated by gcov. By default, these are deleted"),
        )
        .arg(
            Arg::new("delete")
                .short('d')
                .long("delete")
                .action(ArgAction::SetTrue)
                .help(
                    "Delete the coverage data files after they are processed. These are \
                     generated by the user's program, and by default are not removed",
                ),
        )
}

/// Percentage argument: a float within 0.0 to 100.0.
fn percentage(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=100.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("'{value}' is not in the range [0.0, 100.0]"))
    }
}

/// Wire the verbose flag to the tracing log level.
/// RUST_LOG in the environment takes precedence; --verbose falls back to DEBUG.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Assemble pipeline options from parsed flags.
fn build_options(matches: &ArgMatches) -> Options {
    let mut options = Options::new()
        .root(
            matches
                .get_one::<String>("root")
                .map(String::as_str)
                .unwrap_or("."),
        )
        .search_paths(collect_paths(matches, "search-path"))
        .filter(collect_strings(matches, "filter"))
        .exclude(collect_strings(matches, "exclude"))
        .object_directory(matches.get_one::<String>("object-directory").map(PathBuf::from))
        .fail_under(
            matches.get_one::<f64>("fail-under-line").copied().unwrap_or(0.0),
            matches.get_one::<f64>("fail-under-branch").copied().unwrap_or(0.0),
        );

    if let Some(executable) = matches.get_one::<String>("gcov-executable") {
        options = options.gcov_executable(executable.clone());
    }

    options.gcov_filter = matches.get_one::<String>("gcov-filter").cloned();
    options.gcov_exclude = collect_strings(matches, "gcov-exclude");
    options.exclude_directories = collect_strings(matches, "exclude-directories");
    options.exclude_unreachable_branches = matches.get_flag("exclude-unreachable-branches");
    options.use_gcov_files = matches.get_flag("use-gcov-files");
    options.ignore_parse_errors = matches.get_flag("gcov-ignore-parse-errors");
    options.keep_gcov_files = matches.get_flag("keep");
    options.delete_data_files = matches.get_flag("delete");
    options
}

fn collect_strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn collect_paths(matches: &ArgMatches, id: &str) -> Vec<PathBuf> {
    matches
        .get_many::<String>(id)
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default()
}

fn sort_mode(matches: &ArgMatches) -> SortMode {
    if matches.get_flag("sort-uncovered") {
        SortMode::Uncovered
    } else if matches.get_flag("sort-percentage") {
        SortMode::Percent
    } else {
        SortMode::Path
    }
}

/// Render the requested report, then the optional summary.
fn render_report(report: &RunReport, matches: &ArgMatches) -> anyhow::Result<()> {
    let output = matches.get_one::<String>("output");

    if matches.get_flag("xml") || matches.get_flag("xml-pretty") {
        let document = XmlFormatter::new(report)
            .pretty(matches.get_flag("xml-pretty"))
            .generate();
        write_output(output, &document)?;
    } else if matches.get_flag("html") || matches.get_flag("html-details") {
        let details = matches.get_flag("html-details");
        let formatter = HtmlFormatter::new(report)
            .details(details)
            .encoding(
                matches
                    .get_one::<String>("html-encoding")
                    .map(String::as_str)
                    .unwrap_or("UTF-8"),
            )
            .relative_anchors(!matches.get_flag("html-absolute-paths"))
            .sort(sort_mode(matches));
        match output {
            Some(path) => formatter
                .output(path)
                .save()
                .with_context(|| format!("cannot write {path}"))?,
            None if details => anyhow::bail!("--html-details requires an output file (-o)"),
            None => print!("{}", formatter.generate()),
        }
    } else {
        let table = TextFormatter::new(report)
            .branches(matches.get_flag("branches"))
            .sort(sort_mode(matches))
            .generate();
        write_output(output, &table)?;
    }

    if matches.get_flag("print-summary") {
        print!("{}", SummaryFormatter::new(report).generate());
    }
    Ok(())
}

fn write_output(output: Option<&String>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("cannot write {path}"))?,
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let options = build_options(&matches);
    let report = match run(&options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {e}", style("(ERROR)").red().for_stderr());
            return ExitCode::FAILURE;
        }
    };

    for warning in &report.warnings {
        eprintln!("{} {warning}", style("(WARNING)").yellow().for_stderr());
    }

    if let Err(e) = render_report(&report, &matches) {
        eprintln!("{} {e:#}", style("(ERROR)").red().for_stderr());
        return ExitCode::FAILURE;
    }

    let check = report.threshold_check(options.fail_under_line, options.fail_under_branch);
    ExitCode::from(check.exit_code())
}

// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for tg2html.
//!
//! Renders Telegram message JSON (single Bot API messages, arrays of them, or
//! whole history exports) to one HTML fragment per message, or lists the
//! hashtags of each message with `--tags`.

use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tg2html::parser::{self, Message, MessageFormat};
use tg2html::{renderer, tags};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Destination for rendered messages.
#[derive(Clone, Debug)]
enum Sink {
    /// One output file per input, named after the input's stem.
    Dir(PathBuf),
    /// A single input, printed.
    Stdout,
}

impl From<PathBuf> for Sink {
    fn from(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdout
        } else {
            Self::Dir(path)
        }
    }
}

/// What to produce for each message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Html,
    Tags,
}

impl Mode {
    const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Tags => "tags",
        }
    }

    /// One line per message.
    fn render(self, messages: &[Message]) -> String {
        let mut out = String::new();
        for message in messages {
            match self {
                Self::Html => out.push_str(&renderer::render_message(message)),
                Self::Tags => {
                    let line: Vec<String> = tags::extract_tags(message)
                        .into_iter()
                        .map(tags::TagValue::into_inner)
                        .collect();
                    out.push_str(&line.join(" "));
                }
            }
            out.push('\n');
        }
        out
    }
}

#[allow(clippy::struct_excessive_bools)]
struct Options {
    paths: Vec<PathBuf>,
    sink: Sink,
    format: Option<MessageFormat>,
    mode: Mode,
    verbose: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("invalid arguments: {source}"))]
    Args { source: lexopt::Error },

    #[snafu(display("no input paths given"))]
    NoInputs,

    #[snafu(display("{count} inputs found, but stdout takes exactly one"))]
    StdoutNeedsOneInput { count: usize },

    #[snafu(display("cannot create {}: {source}", dir.display()))]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot parse messages in {}: {source}", path.display()))]
    Parse {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("{} has no file name to derive an output name from", path.display()))]
    NoFileStem { path: PathBuf },

    #[snafu(display("cannot write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

const HELP: &str = "\
Render Telegram messages and history exports as HTML

Usage: tg2html [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  JSON files, or directories searched for *.json

Options:
  -o, --output <OUTPUT>   Output directory, or - for stdout
      --format <FORMAT>   auto, live or history [default: auto]
      --tags              List hashtags instead of rendering HTML

Other options:
  -v, --verbose           Log debug diagnostics (TG2HTML_LOG overrides)
  -q, --quiet             Do not report written files
  -n, --dry-run           Report what would be written and stop
  -f, --force             Replace existing output files
  -h, --help              Print help
  -V, --version           Print version";

fn print_version() {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}

fn parse_format(value: &str) -> Result<Option<MessageFormat>, lexopt::Error> {
    match value {
        "auto" => Ok(None),
        "live" => Ok(Some(MessageFormat::Live)),
        "history" => Ok(Some(MessageFormat::History)),
        other => Err(format!("unknown format {other:?}, expected auto, live or history").into()),
    }
}

fn parse_options() -> Result<Options, lexopt::Error> {
    let mut parser = lexopt::Parser::from_env();
    let mut paths = Vec::new();
    let mut sink = None;
    let mut format = None;
    let mut mode = Mode::Html;
    let (mut verbose, mut quiet, mut dry_run, mut force) = (false, false, false, false);
    let mut seen_any = false;

    while let Some(arg) = parser.next()? {
        seen_any = true;
        match arg {
            Short('o') | Long("output") => sink = Some(Sink::from(PathBuf::from(parser.value()?))),
            Long("format") => format = parse_format(&parser.value()?.string()?)?,
            Long("tags") => mode = Mode::Tags,
            Short('v') | Long("verbose") => verbose = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                println!("{HELP}");
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                print_version();
                std::process::exit(0);
            }
            Value(path) => paths.push(PathBuf::from(path)),
            _ => return Err(arg.unexpected()),
        }
    }

    if !seen_any {
        println!("{HELP}");
        std::process::exit(0);
    }

    Ok(Options {
        paths,
        sink: sink.ok_or("missing required option: --output")?,
        format,
        mode,
        verbose,
        quiet,
        dry_run,
        force,
    })
}

fn init_tracing(verbose: bool) {
    let directives = std::env::var("TG2HTML_LOG").unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        format!("tg2html={level}")
    });
    if let Err(err) = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(directives))
        .try_init()
    {
        eprintln!("logging disabled: {err}");
    }
}

fn is_json(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("json"))
}

/// Expands directories into the JSON files beneath them, in name order.
fn discover_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| -> Vec<PathBuf> {
            if !path.is_dir() {
                return vec![path.clone()];
            }
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .map(walkdir::DirEntry::into_path)
                .filter(|p| is_json(p))
                .collect()
        })
        .collect()
}

fn load(path: &Path, format: Option<MessageFormat>) -> Result<Vec<Message>, Error> {
    let json = std::fs::read_to_string(path).context(ReadSnafu { path })?;
    parser::parse_document(&json, format).context(ParseSnafu { path })
}

fn print_one(path: &Path, opts: &Options) -> Result<(), Error> {
    if opts.dry_run {
        eprintln!("would render {} to stdout", path.display());
        return Ok(());
    }
    let messages = load(path, opts.format)?;
    print!("{}", opts.mode.render(&messages));
    Ok(())
}

fn write_one(path: &Path, dir: &Path, opts: &Options) -> Result<(), Error> {
    let stem = path.file_stem().context(NoFileStemSnafu { path })?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(opts.mode.extension());
    let target = dir.join(name);

    if opts.dry_run {
        eprintln!("would write {}", target.display());
        return Ok(());
    }
    if target.exists() && !opts.force {
        eprintln!("{} exists, skipping (use --force to replace)", target.display());
        return Ok(());
    }

    let messages = load(path, opts.format)?;
    std::fs::write(&target, opts.mode.render(&messages)).context(WriteSnafu { path: &target })?;
    debug!(input = %path.display(), output = %target.display(), "rendered");

    if !opts.quiet {
        eprintln!("wrote {} ({} messages)", target.display(), messages.len());
    }
    Ok(())
}

fn main() -> Result<(), Error> {
    let opts = parse_options().context(ArgsSnafu)?;
    init_tracing(opts.verbose);
    ensure!(!opts.paths.is_empty(), NoInputsSnafu);

    let inputs = discover_inputs(&opts.paths);
    debug!(count = inputs.len(), "discovered inputs");

    match &opts.sink {
        Sink::Stdout => {
            let [input] = inputs.as_slice() else {
                return StdoutNeedsOneInputSnafu { count: inputs.len() }.fail();
            };
            print_one(input, &opts)
        }
        Sink::Dir(dir) => {
            if !opts.dry_run {
                std::fs::create_dir_all(dir).context(CreateDirSnafu { dir })?;
            }
            inputs.iter().try_for_each(|input| write_one(input, dir, &opts))
        }
    }
}

//! apifmt formats api interface definition files.
//!
//! Without an explicit path, apifmt processes standard input. Given a file,
//! it operates on that file; given a directory, it operates on all `.api`
//! files in that directory, recursively (files starting with a period are
//! ignored). By default, apifmt prints the reformatted sources to standard
//! output.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use walkdir::{DirEntry, WalkDir};

use api_ast::errors::ErrorList;
use api_ast::parser;
use api_ast::printer;
use api_ast::sequencer::{Reporter, Sequencer};
use api_ast::token::{FileSet, Position};

#[derive(Debug, Parser)]
#[command(name = "apifmt", version, about = "apifmt formats api source files")]
struct Args {
    /// List files whose formatting differs from apifmt's.
    #[arg(short = 'l')]
    list: bool,

    /// Write result to (source) file instead of standard output.
    #[arg(short = 'w')]
    write: bool,

    /// Report all errors (not just the first 10 on different lines).
    #[arg(short = 'e')]
    all_errors: bool,

    /// Files or directories to format; standard input when empty.
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
struct Options {
    list: bool,
    write: bool,
    mode: parser::Mode,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    // The concurrency budget is a total byte size of the files being worked
    // on, scaled by the available cores, so a directory of large files does
    // not blow the address space while small files still run in parallel.
    let nproc = std::thread::available_parallelism().map_or(1, |n| n.get());
    let max_weight = (2i64 << 20) * nproc as i64;
    let mut seq = match Sequencer::new(max_weight, Box::new(io::stdout()), Box::new(io::stderr())) {
        Ok(seq) => seq,
        Err(err) => {
            eprintln!("apifmt: {err}");
            std::process::exit(2);
        }
    };

    run(&args, &mut seq);
    std::process::exit(seq.get_exit_code());
}

fn run(args: &Args, seq: &mut Sequencer) {
    let mut mode = parser::Mode::PARSE_COMMENTS;
    if args.all_errors {
        mode = mode | parser::Mode::ALL_ERRORS;
    }
    let opts = Options { list: args.list, write: args.write, mode };

    if args.paths.is_empty() {
        if opts.write {
            seq.add_report(anyhow!("error: cannot use -w with standard input"));
            return;
        }
        seq.add(0, move |r| process_stdin(opts, r));
        return;
    }

    for path in &args.paths {
        let info = match fs::metadata(path) {
            Ok(info) => info,
            Err(err) => {
                seq.add_report(anyhow!("{}: {err}", path.display()));
                continue;
            }
        };
        if info.is_dir() {
            walk_dir(path, opts, seq);
        } else {
            enqueue_file(path.clone(), &info, opts, seq);
        }
    }
}

fn is_api_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_file() && !name.starts_with('.') && name.ends_with(".api")
}

fn walk_dir(dir: &Path, opts: Options, seq: &mut Sequencer) {
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                seq.add_report(anyhow!("{err}"));
                continue;
            }
        };
        if !is_api_file(&entry) {
            continue;
        }
        match entry.metadata() {
            Ok(info) => enqueue_file(entry.into_path(), &info, opts, seq),
            Err(err) => seq.add_report(anyhow!("{}: {err}", entry.path().display())),
        }
    }
}

fn enqueue_file(path: PathBuf, info: &fs::Metadata, opts: Options, seq: &mut Sequencer) {
    // Irregular files report no usable size; run them exclusively.
    let (weight, known_size) = if info.is_file() {
        (info.len() as i64, Some(info.len()))
    } else {
        (-1, None)
    };
    tracing::debug!(path = %path.display(), weight, "queueing");
    seq.add(weight, move |r| process_file(&path, known_size, opts, r));
}

fn process_file(path: &Path, known_size: Option<u64>, opts: Options, r: &mut Reporter) -> Result<()> {
    let src = fs::read(path).with_context(|| path.display().to_string())?;
    if let Some(size) = known_size {
        if src.len() as u64 != size {
            bail!(
                "{}: file size changed during reading (from {} to {} bytes)",
                path.display(),
                size,
                src.len()
            );
        }
    }
    process(&path.to_string_lossy(), &src, Some(path), opts, r)
}

fn process_stdin(opts: Options, r: &mut Reporter) -> Result<()> {
    let mut src = Vec::new();
    io::stdin().read_to_end(&mut src).context("standard input")?;
    process("<standard input>", &src, None, opts, r)
}

/// Rejects invalid UTF-8 with a positioned diagnostic instead of silently
/// substituting replacement characters.
fn decode_utf8<'a>(filename: &str, src: &'a [u8]) -> Result<&'a str, ErrorList> {
    std::str::from_utf8(src).map_err(|err| {
        let offset = err.valid_up_to();
        let line = 1 + src[..offset].iter().filter(|&&b| b == b'\n').count();
        let bol = src[..offset].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let mut errors = ErrorList::new();
        errors.add(
            filename,
            Position { offset, line, column: 1 + offset - bol },
            "illegal UTF-8 encoding",
        );
        errors
    })
}

fn process(filename: &str, src: &[u8], path: Option<&Path>, opts: Options, r: &mut Reporter) -> Result<()> {
    let text = decode_utf8(filename, src)?;
    let mut fset = FileSet::new();
    let (file, errors) = parser::parse_file(&mut fset, filename, text, opts.mode);
    errors.err()?;
    let tf = fset.last().ok_or_else(|| anyhow!("{filename}: no file registered"))?;
    let formatted = printer::format(tf, &file)?;

    if !opts.list && !opts.write {
        r.write_all(&formatted)?;
        return Ok(());
    }
    if formatted != src {
        if opts.list {
            writeln!(r, "{filename}")?;
        }
        if opts.write {
            let path = path.ok_or_else(|| anyhow!("cannot write standard input"))?;
            fs::write(path, &formatted).with_context(|| path.display().to_string())?;
        }
    }
    Ok(())
}

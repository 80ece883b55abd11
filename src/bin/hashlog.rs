//! Replays a hash-layout stream as text using a `.hashlog` dictionary:
//! `hashlog [-x HASHLOG] [-i INPUT] [-o OUTPUT]`.
//!
//! Grounded alongside `binlog` (see `src/bin/binlog.rs`) in the same
//! original `source/logging/layouts/hash_layout.cpp` CLI pair
//! (original_source).

use corelog::layout::{decode_hash, HashDictionary, Layout, TextLayout, DEFAULT_PATTERN};
use corelog::record::Record;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

struct Args {
    input: Option<String>,
    output: Option<String>,
    dictionary: Option<String>,
}

fn parse_args(raw: &[String]) -> Args {
    let mut args = Args { input: None, output: None, dictionary: None };
    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "-i" => {
                i += 1;
                args.input = raw.get(i).cloned();
            }
            "-o" => {
                i += 1;
                args.output = raw.get(i).cloned();
            }
            "-x" => {
                i += 1;
                args.dictionary = raw.get(i).cloned();
            }
            _ => {}
        }
        i += 1;
    }
    args
}

/// Walks from the current directory up to the filesystem root looking for
/// any `*.hashlog` sidecar, used when `-x` isn't given.
fn find_dictionary_upward() -> Option<PathBuf> {
    let mut dir = env::current_dir().ok()?;
    loop {
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|ext| ext == "hashlog").unwrap_or(false) {
                    return Some(path);
                }
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn load_dictionary(path: &Option<String>) -> io::Result<HashDictionary> {
    let resolved = match path {
        Some(p) => Some(PathBuf::from(p)),
        None => find_dictionary_upward(),
    };
    match resolved {
        Some(p) => HashDictionary::read_from(File::open(p)?),
        None => Ok(HashDictionary::new()),
    }
}

fn read_input(path: &Option<String>) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match path {
        Some(p) => {
            File::open(p)?.read_to_end(&mut bytes)?;
        }
        None => {
            io::stdin().lock().read_to_end(&mut bytes)?;
        }
    }
    Ok(bytes)
}

fn open_output(path: &Option<String>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(p) => Ok(Box::new(BufWriter::new(File::create(p)?))),
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Resolves a hash against the dictionary, falling back to a marker that
/// still lets the rest of the line render instead of aborting the replay.
fn resolve(dictionary: &HashDictionary, hash: u32) -> String {
    dictionary.lookup(hash).unwrap_or_else(|| format!("<unresolved:{hash:08x}>"))
}

fn run() -> io::Result<()> {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&raw_args);

    let dictionary = load_dictionary(&args.dictionary)?;
    let input = read_input(&args.input)?;
    let mut output = open_output(&args.output)?;
    let layout = TextLayout::new(DEFAULT_PATTERN);

    let mut offset = 0;
    while offset < input.len() {
        let Some((decoded, consumed)) = decode_hash(&input[offset..]) else {
            break;
        };
        offset += consumed;

        let logger = resolve(&dictionary, decoded.logger_hash);
        let message = resolve(&dictionary, decoded.message_hash);

        let mut record = Record::new(decoded.level);
        record.set_timestamp(decoded.timestamp);
        record.set_thread_id(decoded.thread_id);
        let _ = record.set_logger(&logger);
        let _ = record.set_message(&message);
        record.set_argument_buffer(&decoded.buffer);

        layout.layout(&mut record);
        let rendered = record.raw();
        let payload = match rendered.last() {
            Some(0) => &rendered[..rendered.len() - 1],
            _ => rendered,
        };
        output.write_all(payload)?;
    }

    output.flush()
}

fn main() {
    match run() {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("hashlog: {err}");
            std::process::exit(-1);
        }
    }
}

//! Replays a binary-layout stream as text, per the external interface
//! binlog is specified against: `binlog [-i INPUT] [-o OUTPUT]`.
//!
//! Grounded in the `binlog`/`hashlog` CLI pair described alongside
//! `source/logging/layouts/binary_layout.cpp` (original_source); arguments
//! are parsed by hand (no `clap`) to match the original's getopt-style
//! `-i`/`-o` flags.

use corelog::layout::{decode_binary, Layout, TextLayout, DEFAULT_PATTERN};
use corelog::record::Record;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

struct Args {
    input: Option<String>,
    output: Option<String>,
}

fn parse_args(raw: &[String]) -> Args {
    let mut args = Args { input: None, output: None };
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
            _ => {}
        }
        i += 1;
    }
    args
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

fn run() -> io::Result<()> {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&raw_args);

    let input = read_input(&args.input)?;
    let mut output = open_output(&args.output)?;
    let layout = TextLayout::new(DEFAULT_PATTERN);

    let mut offset = 0;
    while offset < input.len() {
        let Some((decoded, consumed)) = decode_binary(&input[offset..]) else {
            break;
        };
        offset += consumed;

        let mut record = Record::new(decoded.level);
        record.set_timestamp(decoded.timestamp);
        record.set_thread_id(decoded.thread_id);
        let _ = record.set_logger(&String::from_utf8_lossy(&decoded.logger));
        let _ = record.set_message(&String::from_utf8_lossy(&decoded.message));
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
            eprintln!("binlog: {err}");
            std::process::exit(-1);
        }
    }
}

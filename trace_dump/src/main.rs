//! Converts `perf.data` v2 capture files to JSON.
//!
//! Flag parsing, file handling, and the top-level JSON shape follow the
//! same texture as a small decoding tool built straight on [`std`]: no
//! argument-parsing or logging crate, just `env::args()` and `eprintln!`.

mod json_sink;

use std::env;
use std::fs;
use std::io;
use std::io::IsTerminal;
use std::io::Write;
use std::process;

use trace_capture::{CaptureOrder, CaptureReader, RawRecord};
use trace_decode::{write_event_fields, ConvertOptions, JsonSink, SchemaWalker};

use json_sink::{escape_json, WriteSink};

const USAGE_COMMON: &str = "\nUsage: trace_dump [options...] PerfDataFiles...\n";

const USAGE_SHORT: &str = "\nUsage: trace_dump [options...] PerfDataFiles...\n";

const USAGE_LONG: &str = "\nConverts perf.data files to JSON.\n\nOptions:\n\n-o, --output <file> Set the output filename. The default is stdout.\n\n-h, --help          Show this help message and exit.\n";

fn main() -> process::ExitCode {
    let mut input_names = Vec::new();
    let mut output_name = String::new();
    let mut show_help = false;
    let mut usage_error = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if !arg.starts_with('-') || arg == "-" {
            input_names.push(arg);
        } else if let Some(flag) = arg.strip_prefix("--") {
            match flag {
                "output" => match args.next() {
                    Some(name) => output_name = name,
                    None => {
                        eprintln!("error: missing filename for flag --output.");
                        usage_error = true;
                    }
                },
                "help" => show_help = true,
                _ => {
                    eprintln!("error: invalid flag \"--{}\".", flag);
                    usage_error = true;
                }
            }
        } else {
            for flag in arg[1..].chars() {
                match flag {
                    'o' => match args.next() {
                        Some(name) => output_name = name,
                        None => {
                            eprintln!("error: missing filename for flag -o.");
                            usage_error = true;
                        }
                    },
                    'h' => show_help = true,
                    _ => {
                        eprintln!("error: invalid flag -{}.", flag);
                        usage_error = true;
                    }
                }
            }
        }
    }

    if show_help {
        println!("{}{}", USAGE_COMMON, USAGE_LONG);
        return process::ExitCode::SUCCESS;
    }
    if usage_error {
        eprintln!("{}{}", USAGE_COMMON, USAGE_SHORT);
        return process::ExitCode::FAILURE;
    }
    if input_names.is_empty() {
        eprintln!("error: no input files specified.");
        return process::ExitCode::FAILURE;
    }

    let is_tty;
    let mut output: Box<dyn io::Write> = if output_name.is_empty() {
        let stdout = io::stdout();
        is_tty = stdout.is_terminal();
        Box::new(stdout)
    } else {
        match fs::File::create(&output_name) {
            Ok(f) => {
                is_tty = f.is_terminal();
                Box::new(f)
            }
            Err(e) => {
                eprintln!("error: failed to open output file \"{}\": {}", output_name, e);
                return process::ExitCode::FAILURE;
            }
        }
    };

    match write_json(&mut output, &input_names, is_tty) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            process::ExitCode::FAILURE
        }
    }
}

fn write_json(out: &mut dyn io::Write, input_names: &[String], is_tty: bool) -> io::Result<process::ExitCode> {
    let mut exit_code = process::ExitCode::SUCCESS;

    writeln!(out, "{}", if is_tty { "{" } else { "\u{FEFF}{" })?;
    let mut first_input = true;

    for input_name in input_names {
        if !first_input {
            writeln!(out, ",")?;
        }
        first_input = false;
        writeln!(out, " \"{}\": [", escape_json(input_name))?;

        let bytes = match fs::read(input_name) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("error: failed to read \"{}\": {}", input_name, e);
                exit_code = process::ExitCode::FAILURE;
                write!(out, " ]")?;
                continue;
            }
        };

        let mut reader = match CaptureReader::open(&bytes, CaptureOrder::Time) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: open(\"{}\") failed: {}", input_name, e);
                exit_code = process::ExitCode::FAILURE;
                write!(out, " ]")?;
                continue;
            }
        };

        let mut first_event = true;
        loop {
            let record = match reader.next_record() {
                Ok(Some(r)) => r,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("error: read_event(\"{}\") failed: {}", input_name, e);
                    exit_code = process::ExitCode::FAILURE;
                    break;
                }
            };

            if !first_event {
                writeln!(out, ",")?;
            }
            first_event = false;
            write_event(out, &reader, &record)?;
        }

        write!(out, " ]")?;
    }

    writeln!(out, " }}")?;
    Ok(exit_code)
}

fn write_event(out: &mut dyn io::Write, reader: &CaptureReader<'_>, record: &RawRecord<'_>) -> io::Result<()> {
    write!(out, "  ")?;
    let mut sink = WriteSink::new(out);
    sink.begin_obj();

    if !record.is_sample() {
        sink.prop_name("NonSample");
        sink.write_number(record.header_type as f64);
        if let Ok(info) = reader.get_non_sample_event_info(record) {
            sink.prop_name("cpu");
            sink.write_number(info.cpu as f64);
            sink.prop_name("pid");
            sink.write_number(info.pid as f64);
            sink.prop_name("tid");
            sink.write_number(info.tid as f64);
            sink.prop_name("time_ns");
            sink.write_number(info.time_ns as f64);
        }
        sink.end_obj();
        sink.finish()?;
        return Ok(());
    }

    match reader.get_sample_event_info(record) {
        Err(e) => {
            sink.prop_name("n");
            sink.write_null();
            sink.prop_name("error");
            sink.write_string(&escape_json(&e.to_string()));
        }
        Ok(info) => {
            sink.prop_name("cpu");
            sink.write_number(info.cpu as f64);
            sink.prop_name("pid");
            sink.write_number(info.pid as f64);
            sink.prop_name("tid");
            sink.write_number(info.tid as f64);
            sink.prop_name("time_ns");
            sink.write_number(info.time_ns as f64);

            match SchemaWalker::start_event(info.event_desc.name(), info.raw_data) {
                Ok((mut walker, event_info)) => {
                    sink.prop_name("n");
                    sink.write_string(&escape_json(event_info.event_name));
                    sink.prop_name("fields");
                    let err = write_event_fields(&mut walker, ConvertOptions::Default, &mut sink);
                    if let Some(err) = err {
                        sink.prop_name("decode_error");
                        sink.write_string(&escape_json(&err.to_string()));
                    }
                }
                Err(_) => match info.event_desc.format() {
                    Some(format) => {
                        sink.prop_name("n");
                        sink.write_string(&escape_json(info.event_desc.name()));
                        sink.prop_name("fields");
                        sink.begin_obj();
                        let skip = format.common_field_count();
                        for field in format.fields().iter().skip(skip) {
                            if let Some(value) = field.get_field_value(info.raw_data, reader.session().byte_reader()) {
                                sink.prop_name(field.name());
                                trace_decode::write_value(&value, ConvertOptions::Default, &mut sink);
                            }
                        }
                        sink.end_obj();
                    }
                    None => {
                        sink.prop_name("n");
                        sink.write_string(&escape_json(info.event_desc.name()));
                    }
                },
            }
        }
    }

    sink.end_obj();
    sink.finish()
}

use std::fs;
use std::io::{Cursor, Read};

use servolink_codec::{Answer, Command, Protocol, Query};
use servolink_link::{LinkConfig, LinkError, MessageReader, RawFrame};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::describe::{answer_output, query_output, raw_output};
use crate::exit::{io_error, link_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{parse_hex, print_frame, print_stats, FrameOutput, OutputFormat};

pub fn run(args: DecodeArgs, config: &LinkConfig, format: OutputFormat) -> CliResult<i32> {
    let answers_for = args.answers_for.map(Command::from);
    if answers_for.is_some() && config.protocol == Protocol::HostUnified {
        return Err(CliError::usage(
            "--answers-for names device commands and needs the device protocol",
        ));
    }

    let input = read_input(&args)?;
    let total = input.len();
    let mut reader: MessageReader<_> = MessageReader::with_config(Cursor::new(input), config.clone());

    let mut frames = 0usize;
    loop {
        let next = match answers_for {
            Some(query) => reader.read_answer_frame(query),
            None => reader.read_frame(),
        };
        let frame = match next {
            Ok(frame) => frame,
            Err(LinkError::ConnectionClosed) => break,
            Err(err) => return Err(link_error("decode failed", err)),
        };
        print_frame(&describe(&frame, config, answers_for), format);
        frames += 1;
    }

    let trailing = reader.buffered();
    print_stats(&reader.stats(), trailing, format);
    debug!(total, frames, trailing, "input exhausted");

    if total > 0 && frames == 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex).map_err(|err| CliError::usage(format!("invalid hex input: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(input)
}

fn describe(frame: &RawFrame, config: &LinkConfig, answers_for: Option<Command>) -> FrameOutput {
    if config.protocol == Protocol::HostUnified {
        return raw_output(frame, "frame");
    }

    let mut msg = frame.decoder();
    match answers_for {
        Some(query) => match Answer::decode(&mut msg, query, &config.answer_lengths) {
            Ok(answer) => answer_output(&answer, &frame.bytes),
            Err(err) => {
                warn!(error = %err, "answer frame has no typed layout");
                raw_output(frame, "answer")
            }
        },
        None => match Query::decode(&mut msg, &config.query_lengths) {
            Ok(query) => query_output(&query, &frame.bytes),
            Err(err) => {
                warn!(error = %err, "query frame has no typed layout");
                raw_output(frame, "query")
            }
        },
    }
}

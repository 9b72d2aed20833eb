use servolink_codec::packer::BITS_PER_BYTE;
use servolink_codec::{Answer, MessageOut, Protocol, Query, MAX_FRAME_SIZE};
use servolink_link::LinkConfig;
use tracing::{debug, warn};

use crate::cmd::{EncodeArgs, HostField, MessageArgs};
use crate::describe::{answer_output, query_output};
use crate::exit::{CliError, CliResult, SUCCESS};
use crate::output::{print_frame, Field, FrameOutput, OutputFormat};

enum Typed {
    Query(Query),
    Answer(Answer),
    Host {
        cmd: u8,
        fields: Vec<HostField>,
        answer: bool,
    },
}

pub fn run(args: EncodeArgs, config: &LinkConfig, format: OutputFormat) -> CliResult<i32> {
    let frame = match to_typed(args.message) {
        Typed::Host {
            cmd,
            fields,
            answer,
        } => encode_host(cmd, &fields, answer)?,
        Typed::Query(query) => encode_query(&query, config),
        Typed::Answer(answer) => encode_answer(&answer),
    };
    print_frame(&frame, format);
    Ok(SUCCESS)
}

fn to_typed(message: MessageArgs) -> Typed {
    match message {
        MessageArgs::Control { id, value, mode } => Typed::Query(Query::Control {
            id,
            value: mode.map(|mode| mode.value()).or(value).unwrap_or_default(),
        }),
        MessageArgs::ControlAnswer { angle, moment } => {
            Typed::Answer(Answer::Control { angle, moment })
        }
        MessageArgs::Info { id } => Typed::Query(Query::Info { id }),
        MessageArgs::InfoAnswer { values } => {
            let mut out = [0i16; 3];
            for (slot, value) in out.iter_mut().zip(values) {
                *slot = value;
            }
            Typed::Answer(Answer::Info { values: out })
        }
        MessageArgs::Write { id, index, value } => Typed::Query(Query::Write { id, index, value }),
        MessageArgs::WriteAnswer { value } => Typed::Answer(Answer::Write { value }),
        MessageArgs::Read { id, index } => Typed::Query(Query::Read { id, index }),
        MessageArgs::ReadAnswer { value } => Typed::Answer(Answer::Read { value }),
        MessageArgs::Flash { id, address, word } => {
            Typed::Query(Query::Flash { id, address, word })
        }
        MessageArgs::FlashAnswer { status, id, value } => {
            Typed::Answer(Answer::Flash { status, id, value })
        }
        MessageArgs::Host {
            cmd,
            fields,
            answer,
        } => Typed::Host {
            cmd,
            fields,
            answer,
        },
    }
}

fn encode_query(query: &Query, config: &LinkConfig) -> FrameOutput {
    let mut enc: MessageOut = MessageOut::new();
    query.encode(&mut enc);
    if config.protocol == Protocol::DeviceAddressed {
        let expected = config.query_lengths.length(query.command().code());
        if expected != enc.length() {
            warn!(
                command = query.command().name(),
                expected,
                encoded = enc.length(),
                "encoded length differs from the configured query table"
            );
        }
    }
    debug!(?query, len = enc.length(), "encoded query");
    query_output(query, enc.buffer())
}

fn encode_answer(answer: &Answer) -> FrameOutput {
    let mut enc: MessageOut = MessageOut::new();
    answer.encode(&mut enc);
    debug!(?answer, len = enc.length(), "encoded answer");
    answer_output(answer, enc.buffer())
}

/// Bytes a host frame needs: header, payload, checksum and terminator.
fn host_frame_size(fields: &[HostField]) -> usize {
    let bits: u32 = fields.iter().map(|field| field.bits).sum();
    1 + bits.div_ceil(BITS_PER_BYTE) as usize + 2
}

fn encode_host(cmd: u8, fields: &[HostField], answer: bool) -> CliResult<FrameOutput> {
    let size = host_frame_size(fields);
    if size > MAX_FRAME_SIZE {
        return Err(CliError::usage(format!(
            "fields need a {size}-byte frame, the limit is {MAX_FRAME_SIZE}"
        )));
    }

    let mut enc: MessageOut = MessageOut::new();
    if answer {
        enc.host_begin_answer();
    } else {
        enc.host_begin_query(cmd);
    }
    for field in fields {
        enc.add_int_n(field.value, field.bits);
    }
    enc.host_end();
    debug!(cmd, answer, len = enc.length(), "encoded host frame");

    let kind = if answer { "answer" } else { "query" };
    let header = enc.buffer()[0];
    let mut out = FrameOutput::new(kind, format!("0x{header:02X}"), enc.buffer());
    out.fields = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            Field::new(format!("field{i}"), field.value).with_note(format!("{} bits", field.bits))
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_mode_overrides_raw_value() {
        let typed = to_typed(MessageArgs::Control {
            id: 1,
            value: None,
            mode: Some(servolink_codec::actuation::SpecialMode::Free),
        });
        let Typed::Query(Query::Control { value, .. }) = typed else {
            panic!("expected a control query");
        };
        assert_eq!(value, 32767);
    }

    #[test]
    fn device_query_matches_wire_bytes() {
        let query = Query::Control { id: 3, value: 20000 };
        let out = encode_query(&query, &LinkConfig::default());
        assert_eq!(&out.bytes[..4], &[0x03, 0xA7, 0x88, 0x80]);
        assert_eq!(out.length, 5);
    }

    #[test]
    fn host_frame_ends_with_terminator() {
        let fields = [HostField { bits: 16, value: 0x1234 }];
        let out = encode_host(0x30, &fields, false).expect("fits");
        assert_eq!(out.bytes[0], 0x30);
        assert_eq!(out.bytes.last(), Some(&b'\n'));
        assert_eq!(out.length, host_frame_size(&fields));
    }

    #[test]
    fn host_frame_rejects_oversized_payload() {
        let fields = [HostField { bits: 32, value: 0 }; 4];
        let err = encode_host(0x30, &fields, false).expect_err("too large");
        assert_eq!(err.code, crate::exit::USAGE);
    }
}

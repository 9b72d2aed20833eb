//! Turning decoded messages into printable frames.

use servolink_codec::actuation::{Actuation, ANGLE_OFFSET};
use servolink_codec::message::FLASH_OK;
use servolink_codec::{Answer, Query};
use servolink_link::RawFrame;

use crate::output::{to_hex, Field, FrameOutput};

fn actuation_note(value: i16) -> String {
    match Actuation::classify(value) {
        Actuation::Special(mode) => format!("mode {}", mode.name()),
        Actuation::Pwm(offset) => format!("pwm {offset:+}"),
        Actuation::Angle(degrees) => format!("angle {degrees:.1}°"),
        Actuation::Other(_) => "outside regulation range".to_string(),
    }
}

pub fn query_output(query: &Query, bytes: &[u8]) -> FrameOutput {
    let mut out = FrameOutput::new("query", query.command().name(), bytes);
    out.id = Some(query.id());
    out.fields = match *query {
        Query::Control { value, .. } => {
            vec![Field::new("value", value).with_note(actuation_note(value))]
        }
        Query::Info { .. } => Vec::new(),
        Query::Write { index, value, .. } => {
            vec![Field::new("index", index), Field::new("value", value)]
        }
        Query::Read { index, .. } => vec![Field::new("index", index)],
        Query::Flash { address, word, .. } => vec![
            Field::new("address", address).with_note(format!("0x{address:08X}")),
            Field::new("word", word).with_note(format!("0x{word:08X}")),
        ],
    };
    out
}

pub fn answer_output(answer: &Answer, bytes: &[u8]) -> FrameOutput {
    let mut out = FrameOutput::new("answer", answer.command().name(), bytes);
    out.fields = match *answer {
        Answer::Control { angle, moment } => vec![
            Field::new("angle", angle).with_note(format!("offset {ANGLE_OFFSET}")),
            Field::new("moment", moment),
        ],
        Answer::Info { values } => values
            .iter()
            .enumerate()
            .map(|(i, &v)| Field::new(format!("value{i}"), v))
            .collect(),
        Answer::Write { value } | Answer::Read { value } => vec![Field::new("value", value)],
        Answer::Flash { status, id, value } => {
            out.id = Some(id);
            let note = if status == FLASH_OK { "ok" } else { "error" };
            vec![
                Field::new("status", status).with_note(note),
                Field::new("value", value).with_note(format!("0x{value:08X}")),
            ]
        }
    };
    out
}

/// Output for a frame whose payload layout is not known.
pub fn raw_output(frame: &RawFrame, kind: &'static str) -> FrameOutput {
    let mut out = FrameOutput::new(kind, format!("0x{:02X}", frame.command()), &frame.bytes);
    out.id = frame.id();
    let payload = frame.payload();
    out.fields = vec![Field::new("payload_bytes", payload.len() as u32).with_note(to_hex(payload))];
    out
}

use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use servolink_link::LinkStats;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded field of a frame.
#[derive(Debug, Serialize)]
pub struct Field {
    pub name: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<i64>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A frame as printed by `encode` and `decode`.
#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub kind: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u8>,
    pub length: usize,
    pub hex: String,
    pub fields: Vec<Field>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl FrameOutput {
    pub fn new(kind: &'static str, command: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            kind,
            command: command.into(),
            id: None,
            length: bytes.len(),
            hex: to_hex(bytes),
            fields: Vec::new(),
            bytes: bytes.to_vec(),
        }
    }
}

pub fn print_frame(frame: &FrameOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(frame),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE", "NOTE"]);
            table.add_row(vec![
                "frame".to_string(),
                format!("{} {}", frame.command, frame.kind),
                frame.hex.clone(),
            ]);
            if let Some(id) = frame.id {
                table.add_row(vec!["id".to_string(), id.to_string(), String::new()]);
            }
            for field in &frame.fields {
                table.add_row(vec![
                    field.name.clone(),
                    field.value.to_string(),
                    field.note.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", pretty_line(frame)),
        OutputFormat::Raw => print_raw(&frame.bytes),
    }
}

fn pretty_line(frame: &FrameOutput) -> String {
    let mut line = format!("{} {}", frame.command, frame.kind);
    if let Some(id) = frame.id {
        line.push_str(&format!(" id={id}"));
    }
    for field in &frame.fields {
        line.push_str(&format!(" {}={}", field.name, field.value));
        if let Some(note) = &field.note {
            line.push_str(&format!(" ({note})"));
        }
    }
    line.push_str(&format!(" len={} [{}]", frame.length, frame.hex));
    line
}

#[derive(Serialize)]
struct StatsOutput {
    kind: &'static str,
    frames: u64,
    checksum_errors: u64,
    unknown_headers: u64,
    skipped_bytes: u64,
    trailing_bytes: usize,
}

pub fn print_stats(stats: &LinkStats, trailing_bytes: usize, format: OutputFormat) {
    let out = StatsOutput {
        kind: "stats",
        frames: stats.frames,
        checksum_errors: stats.checksum_errors,
        unknown_headers: stats.unknown_headers,
        skipped_bytes: stats.skipped_bytes,
        trailing_bytes,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAMES", "CRC ERRORS", "UNKNOWN", "SKIPPED", "TRAILING"])
                .add_row(vec![
                    out.frames.to_string(),
                    out.checksum_errors.to_string(),
                    out.unknown_headers.to_string(),
                    out.skipped_bytes.to_string(),
                    out.trailing_bytes.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "frames={} checksum_errors={} unknown_headers={} skipped_bytes={} trailing_bytes={}",
            out.frames, out.checksum_errors, out.unknown_headers, out.skipped_bytes, out.trailing_bytes
        ),
        OutputFormat::Raw => {}
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text; whitespace, `:` and `,` separators and `0x` prefixes are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }
    if !digits.is_ascii() {
        return Err("input contains non-hex characters".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_formats() {
        assert_eq!(parse_hex("03 a7 88 80").unwrap(), vec![0x03, 0xA7, 0x88, 0x80]);
        assert_eq!(parse_hex("0x03,0xA7").unwrap(), vec![0x03, 0xA7]);
        assert_eq!(parse_hex("03:a7\n88").unwrap(), vec![0x03, 0xA7, 0x88]);
        assert_eq!(to_hex(&[0x03, 0xA7]), "03 A7");
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("é1").is_err());
        assert!(parse_hex("éé").is_err());
    }

    #[test]
    fn pretty_line_lists_fields() {
        let mut frame = FrameOutput::new("query", "CONTROL", &[0x03, 0xA7, 0x88, 0x80, 0xC1]);
        frame.id = Some(3);
        frame
            .fields
            .push(Field::new("value", 20000).with_note("pwm +0"));
        assert_eq!(
            pretty_line(&frame),
            "CONTROL query id=3 value=20000 (pwm +0) len=5 [03 A7 88 80 C1]"
        );
    }
}

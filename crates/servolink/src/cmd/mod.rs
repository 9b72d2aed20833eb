use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use servolink_codec::actuation::SpecialMode;
use servolink_link::LinkConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod table;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a single frame and print it.
    Encode(EncodeArgs),
    /// Scan bytes for frames and print what they carry.
    Decode(DecodeArgs),
    /// Print the frame length tables in use.
    Table(TableArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, config: &LinkConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, config, format),
        Command::Decode(args) => decode::run(args, config, format),
        Command::Table(args) => table::run(args, config, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(subcommand)]
    pub message: MessageArgs,
}

#[derive(Subcommand, Debug)]
pub enum MessageArgs {
    /// Control query: set the actuation value of one device.
    Control {
        #[arg(long, value_parser = device_id())]
        id: u8,
        /// Raw actuation value.
        #[arg(long, allow_negative_numbers = true, required_unless_present = "mode")]
        value: Option<i16>,
        /// Named special mode instead of a raw value (free, hold, zp-lock, ...).
        #[arg(long, value_parser = parse_mode, conflicts_with = "value")]
        mode: Option<SpecialMode>,
    },
    /// Control answer: current angle and moment.
    ControlAnswer {
        #[arg(long, allow_negative_numbers = true)]
        angle: i16,
        #[arg(long, allow_negative_numbers = true)]
        moment: i16,
    },
    /// Info query.
    Info {
        #[arg(long, value_parser = device_id())]
        id: u8,
    },
    /// Info answer: three status values.
    InfoAnswer {
        #[arg(long, num_args = 3, allow_negative_numbers = true)]
        values: Vec<i16>,
    },
    /// Write query: store a parameter.
    Write {
        #[arg(long, value_parser = device_id())]
        id: u8,
        #[arg(long)]
        index: u16,
        #[arg(long, allow_negative_numbers = true)]
        value: i32,
    },
    /// Write answer: the stored value.
    WriteAnswer {
        #[arg(long, allow_negative_numbers = true)]
        value: i32,
    },
    /// Read query: fetch a parameter.
    Read {
        #[arg(long, value_parser = device_id())]
        id: u8,
        #[arg(long)]
        index: u16,
    },
    /// Read answer: the parameter value.
    ReadAnswer {
        #[arg(long, allow_negative_numbers = true)]
        value: i32,
    },
    /// Flash query: program one word of firmware.
    Flash {
        #[arg(long, value_parser = device_id(), default_value_t = servolink_codec::DEVICE_BROADCAST)]
        id: u8,
        /// Target address (decimal or 0x-prefixed hex).
        #[arg(long, value_parser = parse_u32)]
        address: u32,
        /// Word to program (decimal or 0x-prefixed hex).
        #[arg(long, value_parser = parse_u32)]
        word: u32,
    },
    /// Flash answer: status, responding device and a value.
    FlashAnswer {
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=7))]
        status: u8,
        #[arg(long, value_parser = device_id())]
        id: u8,
        #[arg(long, value_parser = parse_u32)]
        value: u32,
    },
    /// Host-unified frame with free-form fields.
    Host {
        /// 7-bit command code (decimal or 0x-prefixed hex).
        #[arg(long, value_parser = parse_host_command)]
        cmd: u8,
        /// Field as BITS:VALUE, packed in order. Repeatable.
        #[arg(long = "field", value_name = "BITS:VALUE", value_parser = parse_field)]
        fields: Vec<HostField>,
        /// Encode as an answer rather than a query.
        #[arg(long)]
        answer: bool,
    },
}

/// One `--field` of a host frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostField {
    pub bits: u32,
    pub value: u32,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes to decode. Reads stdin when neither this nor --file is given.
    pub hex: Option<String>,
    /// Read raw bytes from a file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// Treat the input as answers to this query command.
    #[arg(long, value_name = "COMMAND")]
    pub answers_for: Option<CommandArg>,
}

#[derive(Args, Debug, Default)]
pub struct TableArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CommandArg {
    Control,
    Info,
    Write,
    Read,
    Flash,
}

impl From<CommandArg> for servolink_codec::Command {
    fn from(arg: CommandArg) -> Self {
        use servolink_codec::Command;
        match arg {
            CommandArg::Control => Command::Control,
            CommandArg::Info => Command::Info,
            CommandArg::Write => Command::Write,
            CommandArg::Read => Command::Read,
            CommandArg::Flash => Command::Flash,
        }
    }
}

fn device_id() -> clap::builder::RangedI64ValueParser<u8> {
    clap::value_parser!(u8).range(0..=i64::from(servolink_codec::command::DEVICE_ID_MAX))
}

fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid value '{input}': {err}"))
}

fn parse_mode(input: &str) -> Result<SpecialMode, String> {
    SpecialMode::ALL
        .into_iter()
        .find(|mode| mode.name() == input)
        .ok_or_else(|| {
            let names: Vec<&str> = SpecialMode::ALL.iter().map(|mode| mode.name()).collect();
            format!("unknown mode '{input}' (expected one of: {})", names.join(", "))
        })
}

fn parse_host_command(input: &str) -> Result<u8, String> {
    let code = parse_u32(input)?;
    if code > 0x7F {
        return Err(format!("command {code} does not fit a 7-bit header"));
    }
    if code == u32::from(servolink_codec::HOST_TERMINATOR) {
        return Err("command 0x0A collides with the frame terminator".to_string());
    }
    Ok(code as u8)
}

fn parse_field(input: &str) -> Result<HostField, String> {
    let (bits, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected BITS:VALUE, got '{input}'"))?;
    let bits: u32 = bits
        .trim()
        .parse()
        .map_err(|err| format!("invalid field width '{bits}': {err}"))?;
    if bits == 0 || bits > 32 {
        return Err(format!("field width must be 1..=32, got {bits}"));
    }
    let value = value.trim();
    let value = match value.strip_prefix('-') {
        Some(magnitude) => {
            let magnitude = parse_u32(magnitude)?;
            if magnitude > 1 << 31 {
                return Err(format!("value '{value}' does not fit 32 bits"));
            }
            magnitude.wrapping_neg()
        }
        None => parse_u32(value)?,
    };
    let mask = if bits == 32 { u32::MAX } else { (1 << bits) - 1 };
    Ok(HostField {
        bits,
        value: value & mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_words() {
        assert_eq!(parse_u32("0x08000000"), Ok(0x0800_0000));
        assert_eq!(parse_u32("4096"), Ok(4096));
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(parse_mode("hold"), Ok(SpecialMode::Hold));
        assert_eq!(parse_mode("free"), Ok(SpecialMode::Free));
        assert_eq!(parse_mode("zp-lock"), Ok(SpecialMode::ZeroSetupLock));
        assert!(parse_mode("release").is_err());
        assert!(parse_mode("spin").is_err());
    }

    #[test]
    fn host_command_rejects_terminator_and_wide_codes() {
        assert_eq!(parse_host_command("0x30"), Ok(0x30));
        assert!(parse_host_command("10").is_err());
        assert!(parse_host_command("128").is_err());
    }

    #[test]
    fn field_masks_negative_values_to_width() {
        assert_eq!(parse_field("8:-1"), Ok(HostField { bits: 8, value: 0xFF }));
        assert_eq!(parse_field("16:0x1234"), Ok(HostField { bits: 16, value: 0x1234 }));
        assert!(parse_field("0:1").is_err());
        assert!(parse_field("33:1").is_err());
        assert!(parse_field("12").is_err());
    }
}

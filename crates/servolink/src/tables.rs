use std::collections::BTreeMap;
use std::path::Path;

use clap::ValueEnum;
use serde::Deserialize;
use servolink_codec::{LengthTable, Protocol};
use servolink_link::LinkConfig;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ProtocolArg {
    /// Device-addressed headers (command + device id).
    Device,
    /// Host-unified headers (7-bit command), frames end with a newline.
    Host,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Device => Protocol::DeviceAddressed,
            ProtocolArg::Host => Protocol::HostUnified,
        }
    }
}

/// Length table file:
///
/// ```json
/// { "queries": { "48": 5, "49": 9 }, "answers": { "48": 7 } }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthFile {
    #[serde(default)]
    queries: BTreeMap<u8, u8>,
    #[serde(default)]
    answers: BTreeMap<u8, u8>,
}

fn to_table(entries: &BTreeMap<u8, u8>) -> CliResult<LengthTable> {
    let mut lengths = Vec::new();
    for (&code, &len) in entries {
        if code > 0x7F {
            return Err(CliError::new(
                DATA_INVALID,
                format!("command code {code} does not fit a 7-bit header"),
            ));
        }
        if len == 1 {
            return Err(CliError::new(
                DATA_INVALID,
                format!("command {code}: a frame needs at least a header and a checksum"),
            ));
        }
        let index = code as usize;
        if lengths.len() <= index {
            lengths.resize(index + 1, 0);
        }
        lengths[index] = len;
    }
    Ok(LengthTable::new(lengths))
}

fn parse_length_file(text: &str) -> CliResult<(LengthTable, LengthTable)> {
    let file: LengthFile = serde_json::from_str(text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid length table: {err}")))?;
    Ok((to_table(&file.queries)?, to_table(&file.answers)?))
}

/// Build the link configuration from the global CLI flags.
pub fn load_link_config(protocol: ProtocolArg, lengths: Option<&Path>) -> CliResult<LinkConfig> {
    let protocol = Protocol::from(protocol);
    let mut config = LinkConfig {
        protocol,
        ..LinkConfig::default()
    };

    match (lengths, protocol) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            let (queries, answers) = parse_length_file(&text)?;
            config.query_lengths = queries;
            config.answer_lengths = answers;
        }
        (None, Protocol::HostUnified) => {
            return Err(CliError::new(
                USAGE,
                "the host protocol has no built-in command catalog; pass --lengths FILE",
            ));
        }
        (None, Protocol::DeviceAddressed) => {}
    }

    tracing::debug!(?config, "link configuration");
    Ok(config)
}

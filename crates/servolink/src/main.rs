mod cmd;
mod describe;
mod exit;
mod logging;
mod output;
mod tables;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;
use crate::tables::ProtocolArg;

#[derive(Parser, Debug)]
#[command(name = "servolink", version, about = "Servo link frame encoder and decoder")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Header layout of the link.
    #[arg(
        long,
        value_name = "PROTOCOL",
        default_value = "device",
        env = "SERVOLINK_PROTOCOL",
        global = true
    )]
    protocol: ProtocolArg,

    /// JSON file with query/answer length tables (required for the host protocol).
    #[arg(long, value_name = "FILE", env = "SERVOLINK_LENGTHS", global = true)]
    lengths: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = tables::load_link_config(cli.protocol, cli.lengths.as_deref())
        .and_then(|config| cmd::run(cli.command, &config, format));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::MessageArgs;

    #[test]
    fn parses_encode_write() {
        let cli = Cli::try_parse_from([
            "servolink",
            "encode",
            "write",
            "--id",
            "5",
            "--index",
            "60",
            "--value",
            "1234567",
        ])
        .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => assert!(matches!(
                args.message,
                MessageArgs::Write {
                    id: 5,
                    index: 60,
                    value: 1_234_567
                }
            )),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_decode_inputs() {
        let err = Cli::try_parse_from([
            "servolink",
            "decode",
            "03a78880",
            "--file",
            "/tmp/capture.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_global_protocol_after_subcommand() {
        let cli = Cli::try_parse_from(["servolink", "table", "--protocol", "host"])
            .expect("table args should parse");
        assert!(matches!(cli.protocol, ProtocolArg::Host));
        assert!(matches!(cli.command, Command::Table(_)));
    }

    #[test]
    fn rejects_device_id_out_of_range() {
        let err = Cli::try_parse_from(["servolink", "encode", "info", "--id", "16"])
            .expect_err("id 16 should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use servolink_codec::{command_name, Protocol};
use servolink_link::LinkConfig;

use crate::cmd::TableArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct LengthRow {
    code: u8,
    name: &'static str,
    query_length: usize,
    answer_length: usize,
}

fn rows(config: &LinkConfig) -> Vec<LengthRow> {
    let top = config
        .query_lengths
        .entries()
        .chain(config.answer_lengths.entries())
        .map(|(code, _)| code)
        .max();
    let Some(top) = top else {
        return Vec::new();
    };

    (0..=top)
        .map(|code| LengthRow {
            code,
            name: match config.protocol {
                Protocol::DeviceAddressed => command_name(code),
                Protocol::HostUnified => "-",
            },
            query_length: config.query_lengths.length(code),
            answer_length: config.answer_lengths.length(code),
        })
        .filter(|row| row.query_length > 0 || row.answer_length > 0)
        .collect()
}

pub fn run(_args: TableArgs, config: &LinkConfig, format: OutputFormat) -> CliResult<i32> {
    let rows = rows(config);
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "QUERY LEN", "ANSWER LEN"]);
            for row in &rows {
                table.add_row(vec![
                    format!("0x{:02X}", row.code),
                    row.name.to_string(),
                    row.query_length.to_string(),
                    row.answer_length.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "0x{:02X} {:<8} query={} answer={}",
                    row.code, row.name, row.query_length, row.answer_length
                );
            }
        }
    }
    Ok(SUCCESS)
}

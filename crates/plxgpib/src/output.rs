use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

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

/// A text reply to one query.
#[derive(Serialize)]
pub struct ReplyOutput<'a> {
    pub endpoint: String,
    pub address: u8,
    pub query: &'a str,
    pub reply: &'a str,
}

/// Decoded values of one query.
#[derive(Serialize)]
pub struct ValuesOutput<'a> {
    pub endpoint: String,
    pub address: u8,
    pub query: &'a str,
    pub value_format: &'a str,
    pub count: usize,
    pub values: &'a [f64],
}

pub fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_reply(out: &ReplyOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "ADDR", "QUERY", "REPLY"])
                .add_row(vec![
                    out.endpoint.clone(),
                    out.address.to_string(),
                    out.query.to_string(),
                    out.reply.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}@{} {} -> {}", out.endpoint, out.address, out.query, out.reply);
        }
        OutputFormat::Raw => {
            print_raw(out.reply.as_bytes());
            println!();
        }
    }
}

pub fn print_values(out: &ValuesOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INDEX", "VALUE"]);
            for (index, value) in out.values.iter().enumerate() {
                table.add_row(vec![index.to_string(), format_value(*value)]);
            }
            if let Some(column) = table.column_mut(1) {
                column.set_cell_alignment(CellAlignment::Right);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} values ({}) from {}@{} for {}",
                out.count, out.value_format, out.endpoint, out.address, out.query
            );
            for (index, value) in out.values.iter().enumerate() {
                println!("  [{index:>5}] {}", format_value(*value));
            }
        }
        OutputFormat::Raw => {
            let mut text = String::new();
            for value in out.values {
                text.push_str(&value.to_string());
                text.push('\n');
            }
            print_raw(text.as_bytes());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn format_value(value: f64) -> String {
    format!("{value:.6e}")
}

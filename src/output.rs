use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use wcferry::identity::{IdentityKind, classify_identity};
use wcferry::proto;
use wcferry::rows::RawField;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub kind: IdentityKind,
    pub contact: proto::RpcContact,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListOutput {
    pub contacts: Vec<ContactSummary>,
}

impl ContactListOutput {
    pub fn new(contacts: Vec<proto::RpcContact>) -> Self {
        let contacts = contacts
            .into_iter()
            .map(|contact| ContactSummary {
                kind: classify_identity(&contact.wxid),
                contact,
            })
            .collect();
        Self { contacts }
    }
}

/// Query rows with every column rendered as text.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowListOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowListOutput {
    pub fn new(rows: &[proto::DbRow]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in rows {
            for field in &row.fields {
                if !columns.iter().any(|column| column == &field.column) {
                    columns.push(field.column.clone());
                }
            }
        }

        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.fields
                            .iter()
                            .find(|field| &field.column == column)
                            .map(|field| RawField::new(field).as_text().into_owned())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

/// Outcome of a command that only reports success.
#[derive(Debug, Serialize)]
pub struct AckOutput<'a> {
    pub ok: bool,
    pub message: &'a str,
}

pub fn print_ack(message: &str, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(&AckOutput { ok: true, message });
    }
    println!("{message}");
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), OutputError> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

pub fn print_contacts(output: &ContactListOutput, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(output);
    }

    let mut wxid_width = display_width("wxid");
    let mut name_width = display_width("name");
    let mut remark_width = display_width("remark");
    for summary in &output.contacts {
        wxid_width = wxid_width.max(display_width(&summary.contact.wxid));
        name_width = name_width.max(display_width(&summary.contact.name));
        remark_width = remark_width.max(display_width(&summary.contact.remark));
    }
    wxid_width = wxid_width.min(32);
    name_width = name_width.min(24);
    remark_width = remark_width.min(16);

    println!(
        "{}  {}  {}  {}",
        pad_right("wxid", wxid_width),
        pad_right("name", name_width),
        pad_right("remark", remark_width),
        pad_right("kind", 8),
    );
    for summary in &output.contacts {
        let contact = &summary.contact;
        let remark = if contact.remark.is_empty() { "-" } else { &contact.remark };
        println!(
            "{}  {}  {}  {}",
            pad_right(&truncate_display(&contact.wxid, wxid_width), wxid_width),
            pad_right(&truncate_display(&contact.name, name_width), name_width),
            pad_right(&truncate_display(remark, remark_width), remark_width),
            pad_right(kind_label(summary.kind), 8),
        );
    }
    Ok(())
}

pub fn print_rows(output: &RowListOutput, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(output);
    }

    let mut widths: Vec<usize> = output.columns.iter().map(|column| display_width(column)).collect();
    for row in &output.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(value));
        }
    }
    for width in &mut widths {
        *width = (*width).min(40);
    }

    let header: Vec<String> = output
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| pad_right(&truncate_display(column, *width), *width))
        .collect();
    println!("{}", header.join("  "));
    for row in &output.rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, width)| pad_right(&truncate_display(&single_line(value), *width), *width))
            .collect();
        println!("{}", line.join("  "));
    }
    Ok(())
}

pub fn print_column_map(map: &HashMap<String, Vec<u8>>, json: bool) -> Result<(), OutputError> {
    let mut entries: Vec<(&String, String)> = map
        .iter()
        .map(|(column, content)| (column, String::from_utf8_lossy(content).into_owned()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    if json {
        let object: serde_json::Map<String, serde_json::Value> = entries
            .into_iter()
            .map(|(column, text)| (column.clone(), serde_json::Value::String(text)))
            .collect();
        return print_json(&object);
    }

    let width = entries
        .iter()
        .map(|(column, _)| display_width(column))
        .max()
        .unwrap_or(0)
        .min(32);
    for (column, text) in entries {
        println!("{}  {}", pad_right(column, width), single_line(&text));
    }
    Ok(())
}

pub fn print_tables(tables: &[proto::DbTable], json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(tables);
    }

    let width = tables
        .iter()
        .map(|table| display_width(&table.name))
        .max()
        .unwrap_or(0)
        .clamp(display_width("table"), 32);
    println!("{}  {}", pad_right("table", width), "sql");
    for table in tables {
        println!(
            "{}  {}",
            pad_right(&truncate_display(&table.name, width), width),
            truncate_display(&single_line(&table.sql), 96),
        );
    }
    Ok(())
}

pub fn print_msg_types(types: &HashMap<i32, String>, json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(types);
    }

    let mut entries: Vec<_> = types.iter().collect();
    entries.sort_by_key(|(id, _)| **id);
    println!("{}  {}", pad_left("type", 6), "name");
    for (id, name) in entries {
        println!("{}  {}", pad_left(&id.to_string(), 6), name);
    }
    Ok(())
}

pub fn print_lines(values: &[String], json: bool) -> Result<(), OutputError> {
    if json {
        return print_json(values);
    }
    for value in values {
        println!("{value}");
    }
    Ok(())
}

fn kind_label(kind: IdentityKind) -> &'static str {
    match kind {
        IdentityKind::Friend => "friend",
        IdentityKind::ChatRoom => "room",
        IdentityKind::OfficialAccount => "official",
        IdentityKind::SystemService => "service",
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_display(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let ellipsis = "...";
    let mut width = 0usize;
    let mut output = String::new();
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + ellipsis.len() > max_width {
            break;
        }
        output.push(ch);
        width += ch_width;
    }
    output.push_str(ellipsis);
    output
}

fn pad_right(value: &str, width: usize) -> String {
    let mut output = value.to_string();
    let current = display_width(value);
    if current < width {
        output.push_str(&" ".repeat(width - current));
    }
    output
}

fn pad_left(value: &str, width: usize) -> String {
    let current = display_width(value);
    if current >= width {
        return value.to_string();
    }
    let mut output = " ".repeat(width - current);
    output.push_str(value);
    output
}

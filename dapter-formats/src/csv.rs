use dapter_core::{Adapter, AdapterError, AdapterResult, Conversion, Records, Representation};
use serde_json::{Map, Value};

use crate::value_type;

pub const CSV_KEY: &str = "csv";

/// CSV text adapter backed by the `csv` crate.
///
/// The header row comes from the first record's keys. Cells are plain text
/// and come back as strings; the record's field types decide what they turn
/// into. A null is written as an empty cell and an empty string as `""`, so
/// the two stay apart on the way back in.
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    delimiter: u8,
    escape: Option<u8>,
}

impl CsvAdapter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            escape: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Escape quotes with `escape` instead of doubling them.
    pub fn with_escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn writer(&self) -> csv::Writer<Vec<u8>> {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(self.delimiter);
        if let Some(escape) = self.escape {
            builder.double_quote(false).escape(escape);
        }
        builder.from_writer(Vec::new())
    }

    /// Append one row. `None` cells are left empty.
    fn push_row<'a>(
        &self,
        out: &mut Vec<u8>,
        cells: impl IntoIterator<Item = Option<&'a str>>,
    ) -> anyhow::Result<()> {
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            match cell {
                None => {}
                Some("") => out.extend_from_slice(b"\"\""),
                Some(text) => {
                    let mut writer = self.writer();
                    writer.write_field(text)?;
                    out.extend(writer.into_inner().map_err(|e| e.into_error())?);
                }
            }
        }
        out.push(b'\n');
        Ok(())
    }

    /// Which fields of one raw record were written as a quoted empty string.
    ///
    /// The parsed record cannot tell `""` from an empty cell, the raw bytes can.
    fn quoted_empties(&self, raw: &[u8]) -> Vec<bool> {
        let Some(start) = raw.iter().position(|b| !matches!(b, b'\r' | b'\n')) else {
            return Vec::new();
        };
        let raw = &raw[start..];

        let mut marks = Vec::new();
        let mut field_start = 0;
        let mut in_quotes = false;
        let mut i = 0;
        while i < raw.len() {
            let byte = raw[i];
            if in_quotes {
                if Some(byte) == self.escape {
                    i += 1;
                } else if byte == b'"' {
                    in_quotes = false;
                }
            } else if byte == b'"' {
                in_quotes = true;
            } else if byte == self.delimiter || byte == b'\n' || byte == b'\r' {
                marks.push(&raw[field_start..i] == b"\"\"");
                if byte != self.delimiter {
                    return marks;
                }
                field_start = i + 1;
            }
            i += 1;
        }
        marks.push(&raw[field_start..] == b"\"\"");
        marks
    }

    fn reader<'a>(&self, text: &'a str) -> csv::Reader<&'a [u8]> {
        let mut builder = csv::ReaderBuilder::new();
        builder.delimiter(self.delimiter);
        if self.escape.is_some() {
            builder.double_quote(false).escape(self.escape);
        }
        builder.from_reader(text.as_bytes())
    }
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn as_row<'a>(value: &'a Value, model: &str) -> AdapterResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        AdapterError::type_conversion(format!(
            "CSV rows must be flat records, got {}",
            value_type(value)
        ))
        .with("source_type", value_type(value))
        .with("model_name", model)
    })
}

fn cell(field: &str, value: &Value, model: &str) -> AdapterResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(AdapterError::type_conversion(format!(
            "Field '{field}' of type {} cannot be written to a CSV cell",
            value_type(value)
        ))
        .with("field_name", field)
        .with("source_type", value_type(value))
        .with("model_name", model)),
    }
}

impl Adapter for CsvAdapter {
    fn obj_key(&self) -> &str {
        CSV_KEY
    }

    fn name(&self) -> &str {
        "CsvAdapter"
    }

    fn outward(
        &self,
        records: Records<Value>,
        call: &Conversion<'_>,
    ) -> anyhow::Result<Representation> {
        let rows = records.into_vec();
        let Some(first) = rows.first() else {
            return Ok(Representation::Text(String::new()));
        };
        let header: Vec<String> = as_row(first, call.record_type)?.keys().cloned().collect();

        let mut out = Vec::new();
        self.push_row(&mut out, header.iter().map(|field| Some(field.as_str())))?;
        for (index, value) in rows.iter().enumerate() {
            let row = as_row(value, call.record_type).map_err(|e| e.with("index", index))?;
            if let Some(extra) = row.keys().find(|k| !header.contains(k)) {
                return Err(AdapterError::validation(format!(
                    "Field '{extra}' is not part of the CSV header"
                ))
                .with("field", extra.as_str())
                .with("index", index)
                .with("header", header.clone())
                .into());
            }
            let cells = header
                .iter()
                .map(|field| cell(field, row.get(field).unwrap_or(&Value::Null), call.record_type))
                .collect::<AdapterResult<Vec<_>>>()
                .map_err(|e| e.with("index", index))?;
            self.push_row(&mut out, cells.iter().map(Option::as_deref))?;
        }

        Ok(Representation::Text(String::from_utf8(out)?))
    }

    fn inward(&self, obj: Representation, call: &Conversion<'_>) -> anyhow::Result<Records<Value>> {
        let text = obj.as_text()?;
        let mut reader = self.reader(&text);
        let parse_error = |e: csv::Error, row: usize| {
            let line = e.position().map(|p| p.line());
            AdapterError::parse(format!("Invalid CSV data: {e}"))
                .with("obj_key", CSV_KEY)
                .with("row", row)
                .with("line", line)
                .with_source(e)
        };
        let header = reader.headers().map_err(|e| parse_error(e, 0))?.clone();

        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();
        loop {
            let start = reader.position().byte() as usize;
            if !reader
                .read_record(&mut record)
                .map_err(|e| parse_error(e, rows.len()))?
            {
                break;
            }
            let end = reader.position().byte() as usize;
            let quoted = self.quoted_empties(&text.as_bytes()[start..end]);

            let row: Map<String, Value> = header
                .iter()
                .zip(record.iter())
                .enumerate()
                .map(|(i, (field, cell))| {
                    let value = if cell.is_empty() && !quoted.get(i).copied().unwrap_or(false) {
                        Value::Null
                    } else {
                        Value::String(cell.to_owned())
                    };
                    (field.to_owned(), value)
                })
                .collect();
            rows.push(Value::Object(row));
        }

        if call.many {
            return Ok(Records::Many(rows));
        }
        match rows.len() {
            1 => Ok(Records::One(rows.remove(0))),
            count => Err(AdapterError::validation(format!(
                "Expected exactly one CSV row, found {count}"
            ))
            .with("obj_key", CSV_KEY)
            .with("count", count)
            .into()),
        }
    }
}

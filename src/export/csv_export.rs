use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Writer, WriterBuilder};

use crate::db::{Row, RowStream};
use crate::error::{ConfigError, ExportError};

pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_QUOTE: char = '"';
pub const ESCAPE_CHAR: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Quote every field that is not a number.
    NonNumeric,
    /// Never quote; escape special characters with a backslash.
    NoneEscaped,
}

/// Text dialect for one output file. Quoting follows from whether a quote
/// character is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    delimiter: u8,
    quote: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER as u8,
            quote: Some(DEFAULT_QUOTE as u8),
        }
    }
}

fn ascii_byte(field: &'static str, c: char) -> Result<u8, ConfigError> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("'{}' is not a single-byte character", c),
        })
    }
}

impl Dialect {
    pub fn new(delimiter: char, quote: Option<char>) -> Result<Self, ConfigError> {
        let delimiter = ascii_byte("delimiter", delimiter)?;
        let quote = quote.map(|q| ascii_byte("quotechar", q)).transpose()?;
        if quote == Some(delimiter) {
            return Err(ConfigError::InvalidValue {
                field: "quotechar",
                reason: "must differ from the delimiter".into(),
            });
        }
        Ok(Self { delimiter, quote })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter as char
    }

    pub fn quote_char(&self) -> Option<char> {
        self.quote.map(|q| q as char)
    }

    /// Present only when quoting is disabled.
    pub fn escape_char(&self) -> Option<char> {
        match self.quote {
            Some(_) => None,
            None => Some(ESCAPE_CHAR),
        }
    }

    pub fn quoting(&self) -> Quoting {
        match self.quote {
            Some(_) => Quoting::NonNumeric,
            None => Quoting::NoneEscaped,
        }
    }

    /// Fields are encoded here, so the csv writer never adds quotes of its own.
    fn writer_builder(&self) -> WriterBuilder {
        let mut b = WriterBuilder::new();
        b.delimiter(self.delimiter).quote_style(QuoteStyle::Never);
        b
    }

    fn needs_quotes(&self, field: &str, quote: u8) -> bool {
        field
            .bytes()
            .any(|b| b == self.delimiter || b == quote || b == b'\r' || b == b'\n')
    }

    /// Encode one field for this dialect. With a quote character, every
    /// non-numeric field is quoted (embedded quotes doubled); numeric fields
    /// are quoted only when they contain a special character. Without one,
    /// fields are backslash-escaped.
    pub fn encode_field<'a>(&self, field: &'a str, numeric: bool) -> Cow<'a, str> {
        match self.quote {
            Some(q) if numeric && !self.needs_quotes(field, q) => Cow::Borrowed(field),
            Some(q) => {
                let q = q as char;
                let mut out = String::with_capacity(field.len() + 2);
                out.push(q);
                for c in field.chars() {
                    if c == q {
                        out.push(q);
                    }
                    out.push(c);
                }
                out.push(q);
                Cow::Owned(out)
            }
            None => Cow::Owned(self.escape_field(field)),
        }
    }

    /// Backslash-escape the delimiter, the default quote, the escape itself and
    /// line breaks. Only used when quoting is disabled.
    pub fn escape_field(&self, field: &str) -> String {
        let delim = self.delimiter as char;
        let mut out = String::with_capacity(field.len());
        for c in field.chars() {
            if c == delim || c == DEFAULT_QUOTE || c == ESCAPE_CHAR || c == '\r' || c == '\n' {
                out.push(ESCAPE_CHAR);
            }
            out.push(c);
        }
        out
    }
}

/// Streams rows to a delimited file, flushing each row before counting it.
pub struct CsvStreamWriter {
    writer: Writer<File>,
    dialect: Dialect,
    rows_written: u64,
    write_path: PathBuf,
    final_path: PathBuf,
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

impl CsvStreamWriter {
    /// Create (or truncate) the output and write the header row.
    pub fn create(path: &Path, columns: &[String], dialect: Dialect) -> Result<Self, ExportError> {
        Self::open(path.to_path_buf(), path.to_path_buf(), columns, dialect)
    }

    /// Like `create`, but rows go to `<path>.partial` until `finish` renames it.
    pub fn create_atomic(
        path: &Path,
        columns: &[String],
        dialect: Dialect,
    ) -> Result<Self, ExportError> {
        Self::open(partial_path(path), path.to_path_buf(), columns, dialect)
    }

    fn open(
        write_path: PathBuf,
        final_path: PathBuf,
        columns: &[String],
        dialect: Dialect,
    ) -> Result<Self, ExportError> {
        if let Some(parent) = write_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&write_path)?;
        let writer = dialect.writer_builder().from_writer(file);
        let mut w = Self {
            writer,
            dialect,
            rows_written: 0,
            write_path,
            final_path,
        };
        w.write_fields(columns.iter().map(|c| (c.as_str(), false)))?;
        Ok(w)
    }

    /// Write one record of `(text, numeric)` fields and flush it.
    fn write_fields<'a>(
        &mut self,
        fields: impl Iterator<Item = (&'a str, bool)>,
    ) -> Result<(), ExportError> {
        let encoded: Vec<Cow<'a, str>> = fields
            .map(|(f, numeric)| self.dialect.encode_field(f, numeric))
            .collect();
        self.writer
            .write_record(encoded.iter().map(|f| f.as_bytes()))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &Row) -> Result<(), ExportError> {
        let rendered: Vec<(Cow<'_, str>, bool)> = row
            .values()
            .iter()
            .map(|v| (v.render(), v.is_numeric()))
            .collect();
        self.write_fields(rendered.iter().map(|(c, numeric)| (&**c, *numeric)))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, sync, and move a `.partial` file into place. Returns the row count.
    pub fn finish(mut self) -> Result<u64, ExportError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        if self.write_path != self.final_path {
            std::fs::rename(&self.write_path, &self.final_path)?;
        }
        Ok(self.rows_written)
    }
}

/// Drain `stream` into `writer`, batch by batch. Returns rows written.
pub async fn export_rows(
    stream: &mut RowStream<'_>,
    writer: &mut CsvStreamWriter,
) -> anyhow::Result<u64> {
    while let Some(batch) = stream.next_batch().await? {
        for row in &batch {
            writer.write_row(row)?;
        }
    }
    Ok(writer.rows_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use std::sync::Arc;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(columns: &[String], values: Vec<Value>) -> Row {
        let c: Arc<[String]> = columns.to_vec().into();
        Row::new(c, values)
    }

    #[test]
    fn dialect_quoting_follows_quote_char() {
        let d = Dialect::default();
        assert_eq!(d.quoting(), Quoting::NonNumeric);
        assert_eq!(d.escape_char(), None);
        let d = Dialect::new('|', None).unwrap();
        assert_eq!(d.quoting(), Quoting::NoneEscaped);
        assert_eq!(d.escape_char(), Some('\\'));
        assert!(Dialect::new('é', Some('"')).is_err());
        assert!(Dialect::new(',', Some(',')).is_err());
    }

    #[test]
    fn non_numeric_fields_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let c = cols(&["N", "S", "E"]);
        let mut w = CsvStreamWriter::create(&path, &c, Dialect::default()).unwrap();
        w.write_row(&row(&c, vec![Value::Int(1), Value::Text("A".into()), Value::Null]))
            .unwrap();
        w.write_row(&row(
            &c,
            vec![Value::Float(2.5), Value::Text("say \"hi\"".into()), Value::Int(0)],
        ))
        .unwrap();
        assert_eq!(w.finish().unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "\"N\",\"S\",\"E\"\n1,\"A\",\"\"\n2.5,\"say \"\"hi\"\"\",0\n"
        );
    }

    #[test]
    fn numeric_looking_text_is_still_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zip.csv");
        let c = cols(&["zip", "n", "t"]);
        let mut w = CsvStreamWriter::create(&path, &c, Dialect::default()).unwrap();
        w.write_row(&row(
            &c,
            vec![
                Value::Text("08028".into()),
                Value::Decimal(rust_decimal::Decimal::new(5, 1)),
                Value::Text("123".into()),
            ],
        ))
        .unwrap();
        w.finish().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "\"zip\",\"n\",\"t\"\n\"08028\",0.5,\"123\"\n"
        );
    }

    #[test]
    fn numbers_with_special_chars_are_quoted() {
        let d = Dialect::new('.', Some('"')).unwrap();
        assert_eq!(d.encode_field("2.5", true), "\"2.5\"");
        assert_eq!(d.encode_field("25", true), "25");
        assert_eq!(Dialect::default().encode_field("a\"b", false), "\"a\"\"b\"");
    }

    #[test]
    fn quoting_disabled_escapes_with_backslash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let c = cols(&["a", "b"]);
        let d = Dialect::new(';', None).unwrap();
        let mut w = CsvStreamWriter::create(&path, &c, d).unwrap();
        w.write_row(&row(&c, vec![Value::Int(1), Value::Text("A".into())]))
            .unwrap();
        w.write_row(&row(
            &c,
            vec![Value::Text("x;y".into()), Value::Text("q\"\\".into())],
        ))
        .unwrap();
        w.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a;b\n1;A\nx\\;y;q\\\"\\\\\n");
    }

    #[test]
    fn custom_delimiter_and_quote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let c = cols(&["id", "name"]);
        let d = Dialect::new('\t', Some('\'')).unwrap();
        let mut w = CsvStreamWriter::create(&path, &c, d).unwrap();
        w.write_row(&row(&c, vec![Value::Int(3), Value::Text("x".into())]))
            .unwrap();
        w.finish().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "'id'\t'name'\n3\t'x'\n"
        );
    }

    #[test]
    fn rows_are_on_disk_as_soon_as_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.csv");
        let c = cols(&["v"]);
        let mut w = CsvStreamWriter::create(&path, &c, Dialect::default()).unwrap();
        for i in 0..3 {
            w.write_row(&row(&c, vec![Value::Int(i)])).unwrap();
            let lines = std::fs::read_to_string(&path).unwrap().lines().count() as u64;
            assert_eq!(lines, w.rows_written() + 1);
        }
        // dropped without finish: header plus three rows stay behind
        drop(w);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn atomic_output_appears_only_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("final.csv");
        let c = cols(&["v"]);
        let mut w = CsvStreamWriter::create_atomic(&path, &c, Dialect::default()).unwrap();
        w.write_row(&row(&c, vec![Value::Int(1)])).unwrap();
        assert!(!path.exists());
        assert!(partial_path(&path).exists());
        assert_eq!(w.path(), path.as_path());
        w.finish().unwrap();
        assert!(path.exists());
        assert!(!partial_path(&path).exists());
    }
}

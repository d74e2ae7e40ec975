//! Lectura de VOTable (XML) a una tabla fila/columna.
//!
//! Sólo se lee la primera `TABLE` del documento. Serializaciones soportadas:
//! `TABLEDATA`, `BINARY` y `BINARY2` en base64 embebido. `FITS` y streams
//! externos (`href`) no se soportan.

use base64::Engine;
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VoTableError};

/// Tipos primitivos de VOTable 1.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Bit,
    UnsignedByte,
    Short,
    Int,
    Long,
    Char,
    UnicodeChar,
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
}

impl DataType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "boolean" => Self::Boolean,
            "bit" => Self::Bit,
            "unsignedByte" => Self::UnsignedByte,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "char" => Self::Char,
            "unicodeChar" => Self::UnicodeChar,
            "float" => Self::Float,
            "double" => Self::Double,
            "floatComplex" => Self::FloatComplex,
            "doubleComplex" => Self::DoubleComplex,
            _ => return None,
        })
    }

    fn is_text(self) -> bool {
        matches!(self, Self::Char | Self::UnicodeChar)
    }

    fn is_integer(self) -> bool {
        matches!(self, Self::UnsignedByte | Self::Short | Self::Int | Self::Long)
    }

    /// Tamaño en bytes de un elemento en la serialización binaria.
    fn binary_width(self) -> usize {
        match self {
            Self::Boolean | Self::UnsignedByte | Self::Char => 1,
            Self::Short | Self::UnicodeChar => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double | Self::FloatComplex => 8,
            Self::DoubleComplex => 16,
            Self::Bit => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArraySize {
    Scalar,
    Fixed(usize),
    /// `*` o `N*`: longitud prefijada en el stream binario.
    Variable,
}

impl ArraySize {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::Scalar);
        };
        if raw.ends_with('*') {
            return Ok(Self::Variable);
        }
        let mut total = 1usize;
        for dim in raw.split('x') {
            let n: usize = dim.trim()
                              .parse()
                              .map_err(|_| VoTableError::Malformed(format!("invalid arraysize '{raw}'")))?;
            total = total.checked_mul(n)
                         .ok_or_else(|| VoTableError::Malformed(format!("arraysize '{raw}' overflows")))?;
        }
        Ok(Self::Fixed(total))
    }
}

/// Descripción de una columna (`FIELD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub arraysize: ArraySize,
    pub unit: Option<String>,
    pub ucd: Option<String>,
    /// Valor centinela declarado en `<VALUES null="..">`.
    pub null: Option<String>,
}

impl Field {
    /// Un único valor por celda (los `char` escalares también cuentan como texto).
    fn is_scalar(&self) -> bool {
        self.arraysize == ArraySize::Scalar || self.datatype.is_text()
    }
}

/// Valor de una celda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Cell>),
}

impl Cell {
    /// Valor numérico; `None` si la celda no es convertible.
    /// Las celdas nulas se leen como `NaN`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => Some(f64::NAN),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Array(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Cell::Null => "null".into(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Array(items) => format!("[{} items]", items.len()),
        }
    }
}

/// Elemento `INFO` (p. ej. `QUERY_STATUS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub name: String,
    pub value: String,
    pub content: String,
}

/// Tabla leída de un VOTable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoTable {
    pub name: Option<String>,
    pub fields: Vec<Field>,
    pub rows: Vec<Vec<Cell>>,
    pub infos: Vec<Info>,
}

impl VoTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        parse_votable(&bytes)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn colnames(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Columna convertida a `f64`. Falla si la columna no existe o si alguna
    /// celda no es numérica; los nulos quedan como `NaN`.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)
                      .ok_or_else(|| VoTableError::MissingColumn(name.to_string()))?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = &cells[idx];
                cell.as_f64().ok_or_else(|| VoTableError::InvalidValue { column: name.to_string(),
                                                                         row,
                                                                         value: cell.describe() })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Serialization {
    TableData,
    Binary,
    Binary2,
}

#[derive(Default)]
struct ParseState {
    in_table: bool,
    table_seen: bool,
    name: Option<String>,
    fields: Vec<Field>,
    open_field: Option<usize>,
    serialization: Option<Serialization>,
    raw_rows: Vec<Vec<Option<String>>>,
    row: Option<Vec<Option<String>>>,
    cell: Option<String>,
    stream: Option<String>,
    infos: Vec<Info>,
    open_info: Option<Info>,
}

impl ParseState {
    fn capturing(&self) -> bool {
        self.in_table
    }
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for a in e.attributes() {
        let a = a?;
        if a.key.local_name().as_ref() == key.as_bytes() {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_field(e: &BytesStart<'_>) -> Result<Field> {
    let name = match attr(e, "name")? {
        Some(n) => n,
        None => attr(e, "ID")?.ok_or_else(|| VoTableError::Malformed("FIELD without name".into()))?,
    };
    let raw_type = attr(e, "datatype")?.ok_or_else(|| VoTableError::Malformed(format!("FIELD '{name}' without datatype")))?;
    let datatype = DataType::parse(&raw_type)
        .ok_or_else(|| VoTableError::Malformed(format!("FIELD '{name}' has unknown datatype '{raw_type}'")))?;
    Ok(Field { arraysize: ArraySize::parse(attr(e, "arraysize")?.as_deref())?,
               unit: attr(e, "unit")?,
               ucd: attr(e, "ucd")?,
               null: None,
               name,
               datatype })
}

fn on_start(state: &mut ParseState, e: &BytesStart<'_>, empty: bool) -> Result<()> {
    match e.local_name().as_ref() {
        b"TABLE" if !state.table_seen => {
            state.table_seen = true;
            state.name = attr(e, "name")?;
            state.in_table = !empty;
        }
        b"FIELD" if state.capturing() => {
            state.fields.push(parse_field(e)?);
            if !empty {
                state.open_field = Some(state.fields.len() - 1);
            }
        }
        b"VALUES" => {
            if let Some(idx) = state.open_field {
                state.fields[idx].null = attr(e, "null")?;
            }
        }
        b"TABLEDATA" if state.capturing() => state.serialization = Some(Serialization::TableData),
        b"BINARY" if state.capturing() => state.serialization = Some(Serialization::Binary),
        b"BINARY2" if state.capturing() => state.serialization = Some(Serialization::Binary2),
        b"FITS" if state.capturing() => return Err(VoTableError::Unsupported("FITS serialization".into())),
        b"STREAM" if state.capturing() => {
            if let Some(href) = attr(e, "href")? {
                return Err(VoTableError::Unsupported(format!("external stream {href}")));
            }
            if let Some(enc) = attr(e, "encoding")? {
                if enc != "base64" {
                    return Err(VoTableError::Unsupported(format!("stream encoding {enc}")));
                }
            }
            state.stream = Some(String::new());
        }
        b"TR" if state.capturing() => state.row = Some(Vec::with_capacity(state.fields.len())),
        b"TD" if state.capturing() => {
            if empty {
                if let Some(row) = state.row.as_mut() {
                    row.push(None);
                }
            } else {
                state.cell = Some(String::new());
            }
        }
        b"INFO" => {
            let info = Info { name: attr(e, "name")?.unwrap_or_default(),
                              value: attr(e, "value")?.unwrap_or_default(),
                              content: String::new() };
            if empty {
                state.infos.push(info);
            } else {
                state.open_info = Some(info);
            }
        }
        _ => {}
    }
    Ok(())
}

fn on_end(state: &mut ParseState, local: &[u8]) {
    match local {
        b"TABLE" if state.in_table => state.in_table = false,
        b"FIELD" => state.open_field = None,
        b"TD" => {
            if let (Some(cell), Some(row)) = (state.cell.take(), state.row.as_mut()) {
                let trimmed = cell.trim();
                row.push(if trimmed.is_empty() { None } else { Some(trimmed.to_string()) });
            }
        }
        b"TR" => {
            if let Some(row) = state.row.take() {
                state.raw_rows.push(row);
            }
        }
        b"INFO" => {
            if let Some(info) = state.open_info.take() {
                state.infos.push(info);
            }
        }
        _ => {}
    }
}

fn on_text(state: &mut ParseState, text: &str) {
    if let Some(cell) = state.cell.as_mut() {
        cell.push_str(text);
    } else if let Some(stream) = state.stream.as_mut() {
        stream.push_str(text);
    } else if let Some(info) = state.open_info.as_mut() {
        info.content.push_str(text);
    }
}

/// Parsea un documento VOTable completo.
///
/// Un `INFO name="QUERY_STATUS" value="ERROR"` se reporta como
/// `VoTableError::QueryError` con el mensaje del servicio.
pub fn parse_votable(bytes: &[u8]) -> Result<VoTable> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut state = ParseState::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => on_start(&mut state, &e, false)?,
            Event::Empty(e) => on_start(&mut state, &e, true)?,
            Event::End(e) => on_end(&mut state, e.local_name().as_ref()),
            Event::Text(e) => on_text(&mut state, &e.unescape()?),
            Event::CData(e) => on_text(&mut state, &String::from_utf8_lossy(&e.into_inner())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    for info in &state.infos {
        if info.name == "QUERY_STATUS" {
            match info.value.as_str() {
                "ERROR" => return Err(VoTableError::QueryError(info.content.trim().to_string())),
                "OVERFLOW" => warn!("VOTable result truncated by the service (QUERY_STATUS=OVERFLOW)"),
                _ => {}
            }
        }
    }
    if !state.table_seen {
        return Err(VoTableError::NoTable);
    }

    let rows = match state.serialization {
        Some(Serialization::Binary) => decode_binary(&state.fields, state.stream.as_deref().unwrap_or(""), false)?,
        Some(Serialization::Binary2) => decode_binary(&state.fields, state.stream.as_deref().unwrap_or(""), true)?,
        Some(Serialization::TableData) | None => convert_tabledata(&state.fields, state.raw_rows)?,
    };
    debug!("parsed VOTable: {} columns, {} rows", state.fields.len(), rows.len());

    Ok(VoTable { name: state.name,
                 fields: state.fields,
                 rows,
                 infos: state.infos })
}

// ---------------------------------------------------------------
// TABLEDATA
// ---------------------------------------------------------------

fn convert_tabledata(fields: &[Field], raw_rows: Vec<Vec<Option<String>>>) -> Result<Vec<Vec<Cell>>> {
    raw_rows.into_iter()
            .enumerate()
            .map(|(row_idx, raw)| {
                if raw.len() != fields.len() {
                    return Err(VoTableError::Malformed(format!("row {row_idx} has {} cells, expected {}",
                                                               raw.len(),
                                                               fields.len())));
                }
                fields.iter()
                      .zip(raw)
                      .map(|(field, text)| match text {
                          None => Ok(Cell::Null),
                          Some(t) => text_cell(field, &t, row_idx),
                      })
                      .collect()
            })
            .collect()
}

fn text_cell(field: &Field, text: &str, row: usize) -> Result<Cell> {
    if field.null.as_deref() == Some(text) {
        return Ok(Cell::Null);
    }
    if field.datatype.is_text() || matches!(field.datatype, DataType::Bit) {
        return Ok(Cell::Text(text.to_string()));
    }
    if !field.is_scalar() {
        return text.split_whitespace()
                   .map(|item| scalar_from_text(field, item, row))
                   .collect::<Result<Vec<_>>>()
                   .map(Cell::Array);
    }
    scalar_from_text(field, text, row)
}

fn scalar_from_text(field: &Field, text: &str, row: usize) -> Result<Cell> {
    let invalid = || VoTableError::InvalidValue { column: field.name.clone(),
                                                  row,
                                                  value: text.to_string() };
    match field.datatype {
        DataType::Boolean => match text {
            "T" | "t" | "true" | "TRUE" | "1" => Ok(Cell::Bool(true)),
            "F" | "f" | "false" | "FALSE" | "0" => Ok(Cell::Bool(false)),
            "?" => Ok(Cell::Null),
            _ => Err(invalid()),
        },
        dt if dt.is_integer() => text.parse::<i64>().map(Cell::Int).map_err(|_| invalid()),
        DataType::Float | DataType::Double => text.parse::<f64>().map(Cell::Float).map_err(|_| invalid()),
        _ => Ok(Cell::Text(text.to_string())),
    }
}

// ---------------------------------------------------------------
// BINARY / BINARY2
// ---------------------------------------------------------------

struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(VoTableError::Malformed("truncated binary stream".into()));
        }
        let end = self.pos + n;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

fn decode_binary(fields: &[Field], stream: &str, with_null_mask: bool) -> Result<Vec<Vec<Cell>>> {
    let compact: String = stream.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;
    let mut cursor = ByteCursor { buf: &bytes, pos: 0 };
    let mask_len = fields.len().div_ceil(8);

    if fields.is_empty() && !cursor.is_empty() {
        return Err(VoTableError::Malformed("binary stream in a table without FIELDs".into()));
    }

    let mut rows = Vec::new();
    while !cursor.is_empty() {
        let start = cursor.pos;
        let mask = if with_null_mask { cursor.take(mask_len)? } else { &[][..] };
        let mut row = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let cell = binary_cell(field, &mut cursor)?;
            let masked = with_null_mask && mask[i / 8] & (0x80 >> (i % 8)) != 0;
            row.push(if masked { Cell::Null } else { cell });
        }
        // filas de cero bytes no avanzan el cursor
        if cursor.pos == start {
            return Err(VoTableError::Malformed("binary row consumes no bytes".into()));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn binary_cell(field: &Field, cursor: &mut ByteCursor<'_>) -> Result<Cell> {
    let count = match field.arraysize {
        ArraySize::Scalar => 1,
        ArraySize::Fixed(n) => n,
        ArraySize::Variable => u32::from_be_bytes(cursor.take_array::<4>()?) as usize,
    };
    let needed = match field.datatype {
        DataType::Bit => count.div_ceil(8),
        other => count.saturating_mul(other.binary_width()),
    };
    if needed > cursor.remaining() {
        return Err(VoTableError::Malformed(format!("FIELD '{}' declares {count} items, stream has {} bytes left",
                                                   field.name,
                                                   cursor.remaining())));
    }
    match field.datatype {
        DataType::Char => {
            let raw = cursor.take(count)?;
            let text = String::from_utf8_lossy(raw);
            let text = text.trim_end_matches(['\0', ' ']);
            Ok(if text.is_empty() { Cell::Null } else { Cell::Text(text.to_string()) })
        }
        DataType::UnicodeChar => {
            let raw = cursor.take(count * 2)?;
            let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
            let text = String::from_utf16_lossy(&units);
            let text = text.trim_end_matches(['\0', ' ']);
            Ok(if text.is_empty() { Cell::Null } else { Cell::Text(text.to_string()) })
        }
        DataType::Bit => {
            let raw = cursor.take(count.div_ceil(8))?;
            let bits: String = (0..count).map(|i| if raw[i / 8] & (0x80 >> (i % 8)) != 0 { '1' } else { '0' })
                                         .collect();
            Ok(Cell::Text(bits))
        }
        _ => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(binary_scalar(field, cursor)?);
            }
            if field.arraysize == ArraySize::Scalar {
                Ok(items.pop().unwrap_or(Cell::Null))
            } else {
                Ok(Cell::Array(items))
            }
        }
    }
}

fn binary_scalar(field: &Field, cursor: &mut ByteCursor<'_>) -> Result<Cell> {
    let int_cell = |v: i64| {
        if field.null.as_deref().and_then(|n| n.parse::<i64>().ok()) == Some(v) {
            Cell::Null
        } else {
            Cell::Int(v)
        }
    };
    let cell = match field.datatype {
        DataType::Boolean => match cursor.take(1)?[0] {
            b'T' | b't' | b'1' => Cell::Bool(true),
            b'F' | b'f' | b'0' => Cell::Bool(false),
            _ => Cell::Null,
        },
        DataType::UnsignedByte => int_cell(i64::from(cursor.take(1)?[0])),
        DataType::Short => int_cell(i64::from(i16::from_be_bytes(cursor.take_array()?))),
        DataType::Int => int_cell(i64::from(i32::from_be_bytes(cursor.take_array()?))),
        DataType::Long => int_cell(i64::from_be_bytes(cursor.take_array()?)),
        DataType::Float => Cell::Float(f64::from(f32::from_be_bytes(cursor.take_array()?))),
        DataType::Double => Cell::Float(f64::from_be_bytes(cursor.take_array()?)),
        DataType::FloatComplex => {
            let re = f32::from_be_bytes(cursor.take_array()?);
            let im = f32::from_be_bytes(cursor.take_array()?);
            Cell::Text(format!("{re} {im}"))
        }
        DataType::DoubleComplex => {
            let re = f64::from_be_bytes(cursor.take_array()?);
            let im = f64::from_be_bytes(cursor.take_array()?);
            Cell::Text(format!("{re} {im}"))
        }
        other => {
            cursor.take(other.binary_width())?;
            Cell::Null
        }
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLEDATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE version="1.3" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
  <RESOURCE type="results">
    <INFO name="QUERY_STATUS" value="OK"/>
    <TABLE name="counts">
      <FIELD name="ra_floor" datatype="double" unit="deg"/>
      <FIELD name="dec_floor" datatype="double" unit="deg"/>
      <FIELD name="nb" datatype="long">
        <VALUES null="-1"/>
      </FIELD>
      <FIELD name="label" datatype="char" arraysize="*"/>
      <DATA>
        <TABLEDATA>
          <TR><TD>10</TD><TD>-5.5</TD><TD>42</TD><TD>a &amp; b</TD></TR>
          <TR><TD>11</TD><TD/><TD>-1</TD><TD></TD></TR>
        </TABLEDATA>
      </DATA>
    </TABLE>
  </RESOURCE>
</VOTABLE>"#;

    #[test]
    fn parses_tabledata_fields_and_rows() {
        let t = parse_votable(TABLEDATA.as_bytes()).unwrap();
        assert_eq!(t.name.as_deref(), Some("counts"));
        assert_eq!(t.colnames(), vec!["ra_floor", "dec_floor", "nb", "label"]);
        assert_eq!(t.fields[0].unit.as_deref(), Some("deg"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0], vec![Cell::Float(10.0), Cell::Float(-5.5), Cell::Int(42), Cell::Text("a & b".into())]);
        // <TD/>, null sentinel and empty text are all nulls
        assert_eq!(t.rows[1][1], Cell::Null);
        assert_eq!(t.rows[1][2], Cell::Null);
        assert_eq!(t.rows[1][3], Cell::Null);
    }

    #[test]
    fn column_f64_reads_nulls_as_nan() {
        let t = parse_votable(TABLEDATA.as_bytes()).unwrap();
        let dec = t.column_f64("dec_floor").unwrap();
        assert_eq!(dec[0], -5.5);
        assert!(dec[1].is_nan());
        assert!(matches!(t.column_f64("missing"), Err(VoTableError::MissingColumn(c)) if c == "missing"));
        assert!(matches!(t.column_f64("label"), Err(VoTableError::InvalidValue { row: 0, .. })));
    }

    #[test]
    fn query_status_error_is_reported() {
        let doc = r#"<VOTABLE><RESOURCE type="results">
            <INFO name="QUERY_STATUS" value="ERROR">Table 'foo' does not exist</INFO>
        </RESOURCE></VOTABLE>"#;
        let err = parse_votable(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, VoTableError::QueryError(m) if m == "Table 'foo' does not exist"));
    }

    #[test]
    fn document_without_table_fails() {
        let err = parse_votable(b"<VOTABLE><RESOURCE/></VOTABLE>").unwrap_err();
        assert!(matches!(err, VoTableError::NoTable));
    }

    #[test]
    fn malformed_integer_propagates() {
        let doc = r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="nb" datatype="int"/>
            <DATA><TABLEDATA><TR><TD>abc</TD></TR></TABLEDATA></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        let err = parse_votable(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, VoTableError::InvalidValue { ref column, row: 0, .. } if column == "nb"));
    }

    #[test]
    fn only_first_table_is_read() {
        let doc = r#"<VOTABLE><RESOURCE>
            <TABLE name="first"><FIELD name="a" datatype="int"/><DATA><TABLEDATA><TR><TD>1</TD></TR></TABLEDATA></DATA></TABLE>
            <TABLE name="second"><FIELD name="b" datatype="int"/><DATA><TABLEDATA><TR><TD>2</TD></TR><TR><TD>3</TD></TR></TABLEDATA></DATA></TABLE>
        </RESOURCE></VOTABLE>"#;
        let t = parse_votable(doc.as_bytes()).unwrap();
        assert_eq!(t.name.as_deref(), Some("first"));
        assert_eq!(t.colnames(), vec!["a"]);
        assert_eq!(t.len(), 1);
    }

    fn binary_doc(tag: &str, payload: &[u8]) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(payload);
        format!(r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="ra_floor" datatype="double"/>
            <FIELD name="nb" datatype="int"/>
            <FIELD name="src" datatype="char" arraysize="*"/>
            <DATA><{tag}><STREAM encoding="base64">{b64}</STREAM></{tag}></DATA>
        </TABLE></RESOURCE></VOTABLE>"#)
    }

    #[test]
    fn parses_binary_stream() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&12.5f64.to_be_bytes());
        payload.extend_from_slice(&7i32.to_be_bytes());
        payload.extend_from_slice(&3u32.to_be_bytes());
        payload.extend_from_slice(b"gsc");
        let t = parse_votable(binary_doc("BINARY", &payload).as_bytes()).unwrap();
        assert_eq!(t.rows, vec![vec![Cell::Float(12.5), Cell::Int(7), Cell::Text("gsc".into())]]);
    }

    #[test]
    fn parses_binary2_null_mask() {
        let mut payload = vec![0b0100_0000u8];
        payload.extend_from_slice(&1.0f64.to_be_bytes());
        payload.extend_from_slice(&0i32.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes());
        let t = parse_votable(binary_doc("BINARY2", &payload).as_bytes()).unwrap();
        assert_eq!(t.rows[0][0], Cell::Float(1.0));
        assert_eq!(t.rows[0][1], Cell::Null);
        assert_eq!(t.rows[0][2], Cell::Null);
    }

    #[test]
    fn truncated_binary_stream_is_malformed() {
        let payload = 12.5f64.to_be_bytes();
        let err = parse_votable(binary_doc("BINARY", &payload).as_bytes()).unwrap_err();
        assert!(matches!(err, VoTableError::Malformed(_)));
    }

    #[test]
    fn oversized_variable_length_is_malformed() {
        let doc = format!(r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="ids" datatype="int" arraysize="*"/>
            <DATA><BINARY><STREAM encoding="base64">{}</STREAM></BINARY></DATA>
        </TABLE></RESOURCE></VOTABLE>"#,
                          base64::engine::general_purpose::STANDARD.encode([u32::MAX.to_be_bytes(), 1i32.to_be_bytes()].concat()));
        let err = parse_votable(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, VoTableError::Malformed(m) if m.contains("ids")));
    }

    #[test]
    fn binary_stream_without_fields_is_malformed() {
        let doc = r#"<VOTABLE><RESOURCE><TABLE>
            <DATA><BINARY><STREAM encoding="base64">YWJjZA==</STREAM></BINARY></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        assert!(matches!(parse_votable(doc.as_bytes()).unwrap_err(), VoTableError::Malformed(_)));
    }

    #[test]
    fn zero_width_rows_are_malformed() {
        let doc = r#"<VOTABLE><RESOURCE><TABLE>
            <FIELD name="empty" datatype="int" arraysize="0"/>
            <DATA><BINARY><STREAM encoding="base64">YWJjZA==</STREAM></BINARY></DATA>
        </TABLE></RESOURCE></VOTABLE>"#;
        assert!(matches!(parse_votable(doc.as_bytes()).unwrap_err(), VoTableError::Malformed(_)));
    }

    #[test]
    fn arraysize_parsing() {
        assert_eq!(ArraySize::parse(None).unwrap(), ArraySize::Scalar);
        assert_eq!(ArraySize::parse(Some("2x3")).unwrap(), ArraySize::Fixed(6));
        assert_eq!(ArraySize::parse(Some("12*")).unwrap(), ArraySize::Variable);
        assert!(ArraySize::parse(Some("abc")).is_err());
        assert!(ArraySize::parse(Some("99999999999x99999999999")).is_err());
    }
}

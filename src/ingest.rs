use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, warn};

use crate::domain::{CleanRecord, RawRecord};
use crate::error::{PipelineError, Result};

/// The registry export is semicolon-delimited and opens with one
/// descriptive line ahead of the header row. Columns are addressed by
/// these published names, wherever they sit.
const AIRCRAFT_ID_COLUMN: &str = "CODIGO_AERONAVE";
const EXPIRATION_COLUMN: &str = "DATA_VALIDADE";
const OPERATOR_COLUMN: &str = "OPERADOR";
const TAX_ID_COLUMN: &str = "CPF_CNPJ";
const USE_COLUMN: &str = "TIPO_USO";
const MANUFACTURER_COLUMN: &str = "FABRICANTE";
const MODEL_COLUMN: &str = "MODELO";
const SERIAL_COLUMN: &str = "NUMERO_SERIE";
const WEIGHT_COLUMN: &str = "PESO_MAXIMO_DECOLAGEM_KG";
const ACTIVITY_COLUMN: &str = "RAMO_ATIVIDADE";

/// Decoded registry rows plus what the decoder had to throw away.
#[derive(Debug)]
pub struct IngestResult {
    pub records: Vec<RawRecord>,
    /// Rows skipped because they could not be decoded at all
    pub broken_rows: usize,
}

struct ColumnIndex {
    aircraft_id: usize,
    expiration_date: usize,
    operator_name: usize,
    tax_id: usize,
    type_of_use: usize,
    manufacturer: usize,
    model: usize,
    serial_number: usize,
    max_takeoff_weight_kg: usize,
    activity: usize,
}

impl ColumnIndex {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            aircraft_id: find(AIRCRAFT_ID_COLUMN)?,
            expiration_date: find(EXPIRATION_COLUMN)?,
            operator_name: find(OPERATOR_COLUMN)?,
            tax_id: find(TAX_ID_COLUMN)?,
            type_of_use: find(USE_COLUMN)?,
            manufacturer: find(MANUFACTURER_COLUMN)?,
            model: find(MODEL_COLUMN)?,
            serial_number: find(SERIAL_COLUMN)?,
            max_takeoff_weight_kg: find(WEIGHT_COLUMN)?,
            activity: find(ACTIVITY_COLUMN)?,
        })
    }
}

fn record_from_row(row: &StringRecord, idx: &ColumnIndex) -> Option<RawRecord> {
    Some(RawRecord {
        aircraft_id: row.get(idx.aircraft_id)?.to_string(),
        expiration_date: row.get(idx.expiration_date)?.to_string(),
        operator_name: row.get(idx.operator_name)?.to_string(),
        tax_id: row.get(idx.tax_id)?.to_string(),
        type_of_use: row.get(idx.type_of_use)?.to_string(),
        manufacturer: row.get(idx.manufacturer)?.to_string(),
        model: row.get(idx.model)?.to_string(),
        serial_number: row.get(idx.serial_number)?.to_string(),
        max_takeoff_weight_kg: row.get(idx.max_takeoff_weight_kg)?.to_string(),
        activity: row.get(idx.activity)?.to_string(),
    })
}

/// Decodes the registry export from any reader. The descriptive first
/// line is consumed by byte position before any CSV decoding, whatever
/// its content. Structurally broken rows are skipped and counted; a
/// missing column in the header is fatal.
pub fn read_registry<R: Read>(reader: R) -> Result<IngestResult> {
    let mut reader = BufReader::new(reader);
    let mut preamble = Vec::new();
    reader.read_until(b'\n', &mut preamble)?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut broken_rows = 0;
    let mut columns: Option<ColumnIndex> = None;

    for row in rdr.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping undecodable row: {}", e);
                broken_rows += 1;
                continue;
            }
        };

        match &columns {
            None => columns = Some(ColumnIndex::from_header(&row)?),
            Some(idx) => match record_from_row(&row, idx) {
                Some(record) => records.push(record),
                None => {
                    debug!(
                        "Skipping short row at line {}",
                        row.position().map(|p| p.line()).unwrap_or(0)
                    );
                    broken_rows += 1;
                }
            },
        }
    }

    if columns.is_none() {
        return Err(PipelineError::MissingColumn(AIRCRAFT_ID_COLUMN.to_string()));
    }
    if records.is_empty() {
        warn!("Registry export decoded to zero data rows");
    }

    Ok(IngestResult {
        records,
        broken_rows,
    })
}

/// Convenience wrapper opening `path` for [`read_registry`].
pub fn read_registry_path<P: AsRef<Path>>(path: P) -> Result<IngestResult> {
    let file = File::open(path)?;
    read_registry(file)
}

/// Writes the clean batch back out as semicolon-delimited CSV with ISO
/// dates and one header row.
pub fn write_clean_csv<W: Write>(writer: W, records: &[CleanRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(b';').from_writer(writer);

    wtr.write_record([
        "aircraft_id",
        "expiration_date",
        "registration_date",
        "status",
        "operator_name",
        "legal_entity",
        "entity_number",
        "type_of_use",
        "manufacturer",
        "model",
        "activity",
    ])?;

    for record in records {
        let expiration_date = record.expiration_date.to_string();
        let registration_date = record.registration_date.to_string();
        wtr.write_record([
            record.aircraft_id.as_str(),
            expiration_date.as_str(),
            registration_date.as_str(),
            record.status.as_str(),
            record.operator_name.as_str(),
            record.legal_entity.as_str(),
            record.entity_number.as_str(),
            record.type_of_use.as_str(),
            record.manufacturer.as_str(),
            record.model.as_str(),
            record.activity.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

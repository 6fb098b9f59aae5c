use crate::errors::ProvisionError;
use crate::models::{InputRecord, InputRow, ProvisionOutcome, UnreadableRow, REQUIRED_COLUMNS};
use crate::platform::IdentityPlatform;
use crate::provisioner::Provisioner;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Reads all user rows from a CSV file, in file order.
pub fn read_users<P: AsRef<Path>>(file_path: P) -> Result<Vec<InputRow>, ProvisionError> {
    let path = file_path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProvisionError::InputNotFound(path.display().to_string()),
        _ => ProvisionError::Io(e),
    })?;
    read_users_from(file)
}

/// Reads user rows from any CSV source after checking the header row.
///
/// A row that cannot be decoded is kept as an `UnreadableRow` so it still
/// yields an outcome.
pub fn read_users_from<R: Read>(reader: R) -> Result<Vec<InputRow>, ProvisionError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All) // Handle potential whitespaces
        .flexible(true) // Allow short rows
        .from_reader(reader);

    let available: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !available.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ProvisionError::MissingColumns { missing, available });
    }

    let rows = rdr
        .deserialize::<InputRecord>()
        .enumerate()
        .map(|(index, result)| {
            result.map_err(|e| UnreadableRow {
                // Header is line 1.
                line: e.position().map_or(index as u64 + 2, |pos| pos.line()),
                error: e.to_string(),
            })
        })
        .collect();
    Ok(rows)
}

/// Runs every record through the provisioner, one at a time.
pub fn process_users<P: IdentityPlatform>(
    rows: &[InputRow],
    provisioner: &mut Provisioner<P>,
) -> Vec<ProvisionOutcome> {
    let total = rows.len();
    info!("Found {} users to process", total);

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Ok(record) => {
                info!("Processing user {}/{}: {}", index + 1, total, record.email);
                provisioner.process(record)
            }
            Err(unreadable) => {
                warn!(
                    "Could not read user {}/{} at line {}: {}",
                    index + 1,
                    total,
                    unreadable.line,
                    unreadable.error
                );
                ProvisionOutcome::unreadable(unreadable)
            }
        })
        .collect()
}

/// Writes the credentials of successful outcomes in CSV format.
pub fn write_credentials<W: Write>(
    outcomes: &[ProvisionOutcome],
    writer: W,
) -> Result<usize, ProvisionError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut written = 0;

    for row in outcomes.iter().filter_map(ProvisionOutcome::to_credentials_row) {
        wtr.serialize(row)?;
        written += 1;
    }

    wtr.flush()?;
    Ok(written)
}

/// Writes the credentials report file.
///
/// Returns `Ok(None)` without touching the filesystem when nothing succeeded.
pub fn write_credentials_report<P: AsRef<Path>>(
    outcomes: &[ProvisionOutcome],
    output_path: P,
) -> Result<Option<usize>, ProvisionError> {
    if !outcomes.iter().any(ProvisionOutcome::is_success) {
        return Ok(None);
    }

    let file = File::create(output_path.as_ref())
        .map_err(|e| ProvisionError::ReportWrite(e.to_string()))?;
    let written =
        write_credentials(outcomes, file).map_err(|e| ProvisionError::ReportWrite(e.to_string()))?;
    Ok(Some(written))
}

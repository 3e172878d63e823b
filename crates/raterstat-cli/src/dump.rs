//! Arrow IPC export of the canonical annotation table.

use std::fs::File;
use std::path::Path;

use arrow::ipc::writer::FileWriter;
use raterstat_core::AnnotationTable;

pub fn write_table(table: &AnnotationTable, path: &Path) -> anyhow::Result<()> {
    let batch = table.to_record_batch()?;
    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &batch.schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

use anyhow::{Context, Result};

use crate::model::{ContributionRecord, Field};
use crate::window::TimeWindow;

/// Sort descending by `key`. `sort_by` is stable, so ties keep collection order.
pub fn sort_records(records: &mut [ContributionRecord], key: Field) {
  records.sort_by(|a, b| key.cmp_desc(a, b));
}

/// Row 0 of the report: one title per column, each carrying the window label.
pub fn header_row(window: &TimeWindow) -> Vec<String> {
  let label = window.column_label();
  Field::ALL.iter().map(|f| f.header(&label)).collect()
}

pub fn record_row(record: &ContributionRecord) -> Vec<String> {
  Field::ALL.iter().map(|f| record.value(*f).render()).collect()
}

/// Serialize header plus rows, in the given order, as `\n`-terminated CSV.
pub fn to_csv(records: &[ContributionRecord], window: &TimeWindow) -> Result<Vec<u8>> {
  let mut writer = csv::WriterBuilder::new()
    .terminator(csv::Terminator::Any(b'\n'))
    .from_writer(Vec::new());

  writer.write_record(header_row(window)).context("writing csv header")?;

  for record in records {
    writer
      .write_record(record_row(record))
      .with_context(|| format!("writing csv row for {}", record.user_name))?;
  }

  writer.into_inner().map_err(|e| e.into_error()).context("flushing csv")
}

/// Sort the collected records by `key` and render the report table.
pub fn render(mut records: Vec<ContributionRecord>, key: Field, window: &TimeWindow) -> Result<Vec<u8>> {
  sort_records(&mut records, key);
  to_csv(&records, window)
}

//! Tabular rendering of a catalog, for interactive inspection.
//!
//! The summary file format (see [`catalog_file`](crate::database::catalog_file))
//! stays the persisted representation; this table is only meant to be read.
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::{constants::UNSET_PATH, database::Database, time::epoch_to_mjd};

impl Database {
    /// Render the catalog as a table, one row per entry in catalog order
    pub fn table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("#"),
            Cell::new("File"),
            Cell::new("Type"),
            Cell::new("RA"),
            Cell::new("DEC"),
            Cell::new("MJD"),
            Cell::new("BW (MHz)"),
            Cell::new("Freq (MHz)"),
            Cell::new("nchan"),
            Cell::new("Instrument"),
            Cell::new("Receiver"),
        ]);

        for (i, entry) in self.entries.iter().enumerate() {
            table.add_row(Row::from(vec![
                Cell::new(i).set_alignment(CellAlignment::Right),
                Cell::new(entry.filename.as_str()),
                Cell::new(entry.type_name()),
                Cell::new(entry.position.ra_hms()).set_alignment(CellAlignment::Right),
                Cell::new(entry.position.dec_dms()).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.6}", epoch_to_mjd(&entry.epoch)))
                    .set_alignment(CellAlignment::Right),
                Cell::new(entry.bandwidth).set_alignment(CellAlignment::Right),
                Cell::new(entry.frequency).set_alignment(CellAlignment::Right),
                Cell::new(entry.nchan).set_alignment(CellAlignment::Right),
                Cell::new(&entry.instrument),
                Cell::new(&entry.receiver),
            ]));
        }

        table.to_string()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.as_ref().map_or(UNSET_PATH, |p| p.as_str());
        writeln!(f, "Calibrator database ({} entries, path={path})", self.len())?;
        write!(f, "{}", self.table())
    }
}

//! Tabular rendering of managed clusters.

use std::io::{self, Write};

use crate::store::ClusterState;

const HEADING: &str = "Clusters currently being managed";
const COLUMNS: [&str; 3] = ["Cluster Name:", "Current State:", "Desired State:"];
const NOT_FOUND: &str = "not found";
const COLUMN_GAP: usize = 3;

/// One row of the cluster list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterListing {
    /// Cluster name.
    pub name: String,
    /// Recorded current state; `None` when the cluster has no record.
    pub current_state: Option<ClusterState>,
    /// Recorded desired state; `None` when the cluster has no record.
    pub desired_state: Option<ClusterState>,
}

impl ClusterListing {
    fn cells(&self) -> [&str; 3] {
        [
            self.name.as_str(),
            self.current_state.map_or(NOT_FOUND, ClusterState::as_str),
            self.desired_state.map_or(NOT_FOUND, ClusterState::as_str),
        ]
    }
}

/// Writes `listings` as an aligned table.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_listing(out: &mut dyn Write, listings: &[ClusterListing]) -> io::Result<()> {
    let rows: Vec<[&str; 3]> = listings.iter().map(ClusterListing::cells).collect();
    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    writeln!(out, "{HEADING}")?;
    write_row(out, &COLUMNS, &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row(out: &mut dyn Write, cells: &[&str; 3], widths: &[usize; 3]) -> io::Result<()> {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(&format!("{cell:<width$}", width = width + COLUMN_GAP));
    }
    writeln!(out, "{}", line.trim_end())
}

//! Caller-side orchestration: owns the grid and the render surface, routes
//! cell commits through the reconciler and falls back to a full rebuild.

use crate::compiler::build_chart;
use crate::config::ChartConfig;
use crate::data::{CellValue, SheetGrid, WorksheetData};
use crate::header::load_worksheet;
use crate::ir::ChartDescriptor;
use crate::parser::{MAX_COLUMN, MAX_ROW};
use crate::reconcile::{CellEditEvent, Reconciled, RenderSurface, UpdateReconciler};
use crate::sanitize::{is_chartable_row, SanitizeRules};
use anyhow::{bail, Context, Result};
use tracing::{debug, info};

/// What a committed edit did to the rendered chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Applied in place
    Patched(Reconciled),
    /// Pipeline re-run and installed under a new generation
    Rebuilt(u64),
    /// Pipeline re-run but nothing is chartable any more; the surface keeps its last chart
    NoChart,
}

pub struct ChartSession<S: RenderSurface> {
    grid: SheetGrid,
    worksheet: WorksheetData,
    rules: SanitizeRules,
    separator: String,
    reconciler: UpdateReconciler,
    surface: S,
    rendered: bool,
}

impl<S: RenderSurface> ChartSession<S> {
    /// Normalize the grid and render the first chart, if there is one
    pub fn open(grid: SheetGrid, surface: S, config: &ChartConfig) -> Result<Self> {
        let worksheet = load_worksheet(&grid, &config.header_separator);
        let mut session = Self {
            grid,
            worksheet,
            rules: config.sanitize_rules(),
            separator: config.header_separator.clone(),
            reconciler: UpdateReconciler::new(config.sequence_label.clone()),
            surface,
            rendered: false,
        };
        session.rebuild()?;
        Ok(session)
    }

    pub fn grid(&self) -> &SheetGrid {
        &self.grid
    }

    pub fn worksheet(&self) -> &WorksheetData {
        &self.worksheet
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn generation(&self) -> u64 {
        self.reconciler.generation()
    }

    /// The chart as the surface currently holds it
    pub fn chart(&self) -> Option<ChartDescriptor> {
        self.surface.current_state()
    }

    /// Re-run the whole pipeline from the grid and install the result.
    /// Returns the new generation, or None when nothing is chartable.
    pub fn rebuild(&mut self) -> Result<Option<u64>> {
        self.worksheet = load_worksheet(&self.grid, &self.separator);
        let Some(chart) = build_chart(&self.worksheet, &self.rules) else {
            info!(sheet = %self.grid.name, "nothing to chart");
            return Ok(None);
        };

        let generation = self
            .reconciler
            .install(&mut self.surface, chart)
            .context("Failed to install rebuilt chart")?;
        self.rendered = true;
        Ok(Some(generation))
    }

    /// Write `text` into the grid at (row, col) and bring the chart up to date.
    ///
    /// The edit is patched in place only when it leaves the charted rows and
    /// columns as they were; anything else re-runs the pipeline.
    pub fn commit_edit(&mut self, row: usize, col: usize, text: &str) -> Result<EditOutcome> {
        if row >= MAX_ROW || col > MAX_COLUMN {
            bail!("Cell ({}, {}) is outside the worksheet", row, col);
        }

        let old_columns = self.worksheet.columns.clone();
        let old_header_rows = self.worksheet.header_row_count;
        let was_charted = self.row_charted(row);
        let was_sequence = self.sequence_column_at(col);

        self.grid.set_cell(row, col, CellValue::from_text(text));
        self.worksheet = load_worksheet(&self.grid, &self.separator);

        let event = self.edit_event(row, col, text, &old_columns);
        let layout_changed = self.worksheet.header_row_count != old_header_rows
            || !columns_match_except(&old_columns, &self.worksheet.columns, event.as_ref().map(|_| col))
            || self.sequence_column_at(col) != was_sequence
            || self.row_charted(row) != was_charted;

        match event {
            Some(event) if self.rendered && !layout_changed => {
                if let Ok(outcome) = self.reconciler.reconcile(&mut self.surface, &event) {
                    debug!(row, col, ?outcome, "edit applied in place");
                    return Ok(EditOutcome::Patched(outcome));
                }
            }
            _ => debug!(row, col, layout_changed, "edit cannot be patched"),
        }

        Ok(match self.rebuild()? {
            Some(generation) => EditOutcome::Rebuilt(generation),
            None => EditOutcome::NoChart,
        })
    }

    // Whether grid row `row` survives sanitization of the current worksheet
    fn row_charted(&self, row: usize) -> bool {
        row.checked_sub(self.worksheet.header_row_count)
            .and_then(|idx| self.worksheet.rows.get(idx))
            .is_some_and(|data| is_chartable_row(data, &self.worksheet.columns, &self.rules))
    }

    fn sequence_column_at(&self, col: usize) -> bool {
        self.worksheet
            .columns
            .get(col)
            .is_some_and(|name| self.rules.is_sequence_column(name))
    }

    // Header edits carry the column's old and new composite names
    fn edit_event(&self, row: usize, col: usize, text: &str, old_columns: &[String]) -> Option<CellEditEvent> {
        let new_name = self.worksheet.columns.get(col)?;
        if row == 0 {
            let old_name = old_columns.get(col)?;
            return Some(
                CellEditEvent::new(0, col, new_name.clone(), new_name.clone()).with_old_column_name(old_name.clone()),
            );
        }
        Some(CellEditEvent::new(row, col, text, new_name.clone()))
    }
}

/// Column lists are equal apart from position `except`
fn columns_match_except(old: &[String], new: &[String], except: Option<usize>) -> bool {
    old.len() == new.len()
        && old
            .iter()
            .zip(new)
            .enumerate()
            .all(|(idx, (a, b))| Some(idx) == except || a == b)
}

//! Incremental chart updates for single-cell edits.
//!
//! An edit is classified (header rename, sequence column, non-numeric value,
//! numeric value) and, where possible, applied to the live chart as a patch.
//! The box-plot series is never patched: after a numeric edit it keeps the old
//! quartiles until the next full rebuild, so that per-keystroke updates stay
//! cheap.
//!
//! Edits are treated as sequence-column edits when the column name contains the
//! sequence label, while sanitization only drops a column whose name equals it.
//! A charted column such as `设备序号-X` therefore ignores value edits until the
//! next rebuild, in the same way as the box plot.

use crate::ir::{ChartDescriptor, ChartSeriesPoint, RawValue, Series};
use crate::sanitize::DEFAULT_SEQUENCE_LABEL;
use crate::series::{parse_finite_str, scatter_series_name};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

// =============================================================================
// Edit events
// =============================================================================

/// A committed cell edit. `row_index == 0` is the header row; any other value is a
/// data row in raw spreadsheet coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEditEvent {
    pub row_index: usize,
    pub column_index: usize,
    pub new_value: String,
    pub resolved_column_name: String,
    pub timestamp: SystemTime,
    pub old_column_name: Option<String>,
}

impl CellEditEvent {
    pub fn new(
        row_index: usize,
        column_index: usize,
        new_value: impl Into<String>,
        resolved_column_name: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            column_index,
            new_value: new_value.into(),
            resolved_column_name: resolved_column_name.into(),
            timestamp: SystemTime::now(),
            old_column_name: None,
        }
    }

    pub fn with_old_column_name(mut self, name: impl Into<String>) -> Self {
        self.old_column_name = Some(name.into());
        self
    }

    pub fn is_header_edit(&self) -> bool {
        self.row_index == 0
    }
}

// =============================================================================
// Render surface contract
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("no chart has been applied to the surface")]
    Empty,
    #[error("series index {0} out of range")]
    SeriesOutOfRange(usize),
    #[error("series {0} is not a scatter series")]
    NotScatter(usize),
    #[error("surface rejected the update: {0}")]
    Rejected(String),
}

/// How a full descriptor is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Normal rebuild, merging with nothing but allowed to animate
    Animated,
    /// Replace wholesale without animation or event emission
    Silent,
}

/// Partial update for one scatter series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesPatch {
    pub name: Option<String>,
    pub data: Option<Vec<ChartSeriesPoint>>,
}

impl SeriesPatch {
    /// Apply onto a series; fails when the target is not a scatter series
    pub fn apply_to(&self, series: &mut Series) -> bool {
        let Some(scatter) = series.as_scatter_mut() else {
            return false;
        };
        if let Some(name) = &self.name {
            scatter.name = name.clone();
        }
        if let Some(data) = &self.data {
            scatter.data = data.clone();
        }
        true
    }
}

/// A stateful chart engine the reconciler drives.
///
/// Implementations must leave their state untouched when an operation fails.
pub trait RenderSurface {
    /// Replace the whole chart
    fn apply_descriptor(&mut self, descriptor: &ChartDescriptor, mode: ApplyMode) -> Result<(), SurfaceError>;

    /// The live chart, as the engine currently holds it
    fn current_state(&self) -> Option<ChartDescriptor>;

    /// Localized update of the series at `series_index`
    fn patch_series(&mut self, series_index: usize, patch: &SeriesPatch) -> Result<(), SurfaceError>;

    /// Relabel the series drawn from `old_column`, their points and legend entries.
    /// Surfaces without a native rename reapply the renamed chart silently.
    fn rename_series(&mut self, old_column: &str, new_column: &str) -> Result<(), SurfaceError> {
        let current = self.current_state().ok_or(SurfaceError::Empty)?;
        let (renamed, _) = apply_rename(&current, old_column, new_column)
            .ok_or_else(|| SurfaceError::Rejected(format!("no series for column {:?}", old_column)))?;
        self.apply_descriptor(&renamed, ApplyMode::Silent)
    }
}

// =============================================================================
// Classification and errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("value {0:?} is not a finite number")]
    InvalidNumericValue(String),
    #[error("no series for column {0:?}")]
    NoMatchingSeries(String),
    #[error("no data point for column {column:?} at row {row}")]
    NoMatchingDataPoint { column: String, row: usize },
    #[error("patch failed: {0}")]
    PatchApplication(#[from] SurfaceError),
    #[error("header edit without a usable previous name")]
    AmbiguousHeaderRename,
    #[error("nothing has been rendered")]
    NothingRendered,
    #[error("surface holds generation {live}, expected {expected}")]
    StaleGeneration { expected: u64, live: u64 },
}

/// How an edit was classified
#[derive(Debug, Clone, PartialEq)]
pub enum EditClass {
    HeaderRename { old_name: String, new_name: String },
    SequenceColumn,
    NumericValue(f64),
}

/// Which route satisfied an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Renamed,
    Ignored,
    PatchedSeries,
    Reapplied,
}

/// Classify an edit, in order: header, sequence column, non-numeric, numeric
pub fn classify(event: &CellEditEvent, sequence_label: &str) -> Result<EditClass, ReconcileError> {
    // 1. Header rename
    if event.is_header_edit() {
        let old_name = event
            .old_column_name
            .as_deref()
            .filter(|old| *old != event.new_value)
            .ok_or(ReconcileError::AmbiguousHeaderRename)?;
        return Ok(EditClass::HeaderRename {
            old_name: old_name.to_string(),
            new_name: event.new_value.clone(),
        });
    }

    // 2. Sequence column never feeds a series
    if event.resolved_column_name.contains(sequence_label) {
        return Ok(EditClass::SequenceColumn);
    }

    // 3/4. Data value
    parse_finite_str(&event.new_value)
        .map(EditClass::NumericValue)
        .ok_or_else(|| ReconcileError::InvalidNumericValue(event.new_value.clone()))
}

// =============================================================================
// Pure patch functions
// =============================================================================

/// Rename every scatter series drawn from `old_column`.
/// Returns the renamed descriptor and the (old, new) series names that changed.
pub fn apply_rename(
    descriptor: &ChartDescriptor,
    old_column: &str,
    new_column: &str,
) -> Option<(ChartDescriptor, Vec<(String, String)>)> {
    let mut next = descriptor.clone();
    let mut renamed = Vec::new();

    for series in &mut next.series {
        let Some(scatter) = series.as_scatter_mut() else { continue };
        if scatter.column_label() != old_column {
            continue;
        }
        let new_name = scatter_series_name(new_column);
        renamed.push((scatter.name.clone(), new_name.clone()));
        scatter.name = new_name;
        scatter.column = new_column.to_string();
        for point in &mut scatter.data {
            point.column_label = new_column.to_string();
        }
    }

    if renamed.is_empty() {
        return None;
    }

    for entry in &mut next.legend.data {
        if let Some((_, new_name)) = renamed.iter().find(|(old, _)| old == entry) {
            *entry = new_name.clone();
        }
    }
    Some((next, renamed))
}

/// Set the value of the point drawn from `raw_row` in every scatter series of `column`.
///
/// The x coordinate is carried over untouched; jitter is never recomputed.
/// Returns the patched descriptor and the indices of the changed series.
pub fn apply_value_patch(
    descriptor: &ChartDescriptor,
    column: &str,
    raw_row: usize,
    raw_value: &str,
    value: f64,
) -> Result<(ChartDescriptor, Vec<usize>), ReconcileError> {
    let mut next = descriptor.clone();
    let mut matched_series = false;
    let mut touched = Vec::new();

    for (idx, series) in next.series.iter_mut().enumerate() {
        let Some(scatter) = series.as_scatter_mut() else { continue };
        if scatter.column_label() != column {
            continue;
        }
        matched_series = true;

        let Some(point_idx) = scatter.point_index_for_row(raw_row) else { continue };
        let point = &mut scatter.data[point_idx];
        point.coordinates[1] = value;
        point.numeric_value = value;
        point.raw_value = RawValue::Text(raw_value.to_string());
        touched.push(idx);
    }

    if !matched_series {
        return Err(ReconcileError::NoMatchingSeries(column.to_string()));
    }
    if touched.is_empty() {
        return Err(ReconcileError::NoMatchingDataPoint {
            column: column.to_string(),
            row: raw_row,
        });
    }
    Ok((next, touched))
}

// =============================================================================
// Reconciler
// =============================================================================

/// Applies single-cell edits to a rendered chart without rebuilding it
#[derive(Debug, Clone)]
pub struct UpdateReconciler {
    sequence_label: String,
    generation: u64,
}

impl Default for UpdateReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SEQUENCE_LABEL)
    }
}

impl UpdateReconciler {
    pub fn new(sequence_label: impl Into<String>) -> Self {
        Self {
            sequence_label: sequence_label.into(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Install a freshly built descriptor under a new generation
    pub fn install<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        mut descriptor: ChartDescriptor,
    ) -> Result<u64, SurfaceError> {
        let generation = self.generation + 1;
        descriptor.generation = generation;
        surface.apply_descriptor(&descriptor, ApplyMode::Animated)?;
        self.generation = generation;
        debug!(generation, "installed chart");
        Ok(generation)
    }

    /// Reconcile one edit against the surface. On error the surface is unchanged.
    pub fn reconcile<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        event: &CellEditEvent,
    ) -> Result<Reconciled, ReconcileError> {
        let class = classify(event, &self.sequence_label)?;
        debug!(
            row = event.row_index,
            column = %event.resolved_column_name,
            ?class,
            "classified edit"
        );

        if class == EditClass::SequenceColumn {
            return Ok(Reconciled::Ignored);
        }

        let current = surface.current_state().ok_or(ReconcileError::NothingRendered)?;
        if current.generation != self.generation {
            return Err(ReconcileError::StaleGeneration {
                expected: self.generation,
                live: current.generation,
            });
        }

        match class {
            EditClass::HeaderRename { old_name, new_name } => {
                self.rename(surface, &current, &old_name, &new_name)
            }
            EditClass::NumericValue(value) => self.patch_value(surface, &current, event, value),
            EditClass::SequenceColumn => Ok(Reconciled::Ignored),
        }
    }

    /// Boolean boundary: true when the edit is reflected on the surface, false when
    /// the caller must rebuild
    pub fn update_precisely<S: RenderSurface + ?Sized>(&self, surface: &mut S, event: &CellEditEvent) -> bool {
        match self.reconcile(surface, event) {
            Ok(outcome) => {
                debug!(?outcome, "edit reconciled");
                true
            }
            Err(err) => {
                debug!(error = %err, "edit needs a full rebuild");
                false
            }
        }
    }

    fn rename<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        current: &ChartDescriptor,
        old_column: &str,
        new_column: &str,
    ) -> Result<Reconciled, ReconcileError> {
        let (_, renamed) = apply_rename(current, old_column, new_column)
            .ok_or_else(|| ReconcileError::NoMatchingSeries(old_column.to_string()))?;

        if let Err(err) = surface.rename_series(old_column, new_column) {
            warn!(error = %err, "rename rejected by surface");
            restore(surface, current);
            return Err(err.into());
        }
        debug!(?renamed, "renamed series");
        Ok(Reconciled::Renamed)
    }

    fn patch_value<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        current: &ChartDescriptor,
        event: &CellEditEvent,
        value: f64,
    ) -> Result<Reconciled, ReconcileError> {
        let (next, touched) = apply_value_patch(
            current,
            &event.resolved_column_name,
            event.row_index,
            &event.new_value,
            value,
        )?;

        // Strategy (a): localized patch of each affected series
        let mut patched = Vec::with_capacity(touched.len());
        let mut localized = true;
        for &idx in &touched {
            let data = next.series[idx].as_scatter().map(|s| s.data.clone());
            let patch = SeriesPatch { name: None, data };
            match surface.patch_series(idx, &patch) {
                Ok(()) => patched.push(idx),
                Err(err) => {
                    warn!(series = idx, error = %err, "localized patch failed");
                    localized = false;
                    break;
                }
            }
        }
        if localized {
            return Ok(Reconciled::PatchedSeries);
        }

        // Strategy (b): full silent reapply of the patched descriptor
        match surface.apply_descriptor(&next, ApplyMode::Silent) {
            Ok(()) => Ok(Reconciled::Reapplied),
            Err(err) => {
                warn!(error = %err, "silent reapply failed");
                if !patched.is_empty() {
                    restore(surface, current);
                }
                Err(err.into())
            }
        }
    }
}

/// Put the pre-edit chart back after a partially applied update
fn restore<S: RenderSurface + ?Sized>(surface: &mut S, snapshot: &ChartDescriptor) {
    if let Err(err) = surface.apply_descriptor(snapshot, ApplyMode::Silent) {
        warn!(error = %err, "could not restore chart after failed update");
    }
}

use crate::ir::ChartDescriptor;
use crate::reconcile::{ApplyMode, RenderSurface, SeriesPatch, SurfaceError};

/// Render surface that only keeps the live chart in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Option<ChartDescriptor>,
    applies: usize,
    patches: usize,
    last_mode: Option<ApplyMode>,
}

impl MemorySurface {
    pub fn state(&self) -> Option<&ChartDescriptor> {
        self.state.as_ref()
    }

    /// Number of accepted full applies
    pub fn apply_count(&self) -> usize {
        self.applies
    }

    /// Number of accepted localized patches
    pub fn patch_count(&self) -> usize {
        self.patches
    }

    pub fn last_mode(&self) -> Option<ApplyMode> {
        self.last_mode
    }
}

impl RenderSurface for MemorySurface {
    fn apply_descriptor(&mut self, descriptor: &ChartDescriptor, mode: ApplyMode) -> Result<(), SurfaceError> {
        self.state = Some(descriptor.clone());
        self.applies += 1;
        self.last_mode = Some(mode);
        Ok(())
    }

    fn current_state(&self) -> Option<ChartDescriptor> {
        self.state.clone()
    }

    fn patch_series(&mut self, series_index: usize, patch: &SeriesPatch) -> Result<(), SurfaceError> {
        let state = self.state.as_mut().ok_or(SurfaceError::Empty)?;
        let series = state
            .series
            .get_mut(series_index)
            .ok_or(SurfaceError::SeriesOutOfRange(series_index))?;

        // Validate before touching anything so a rejected patch is a no-op
        let mut patched = series.clone();
        if !patch.apply_to(&mut patched) {
            return Err(SurfaceError::NotScatter(series_index));
        }
        *series = patched;
        self.patches += 1;
        Ok(())
    }
}

//! # Impact catalog
//!
//! An [`ImpactCatalog`] gathers the sample sets of a population of events (one set per
//! segment, all from the same detector), ordered by impact GPS time. It offers the per-event
//! statistics used to compare events: credible intervals, spread, and median-sorted views.

use serde::Serialize;
use tracing::info;

use crate::frames::attitude::AttitudeSource;
use crate::frames::ephemeris::SolarEphemeris;
use crate::impact_errors::ImpactError;
use crate::locator::{ImpactLocator, ImpactSummary};
use crate::samples::{ChainParam, SampleSet};

/// Credible interval and spread of one parameter for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventInterval {
    pub gps: f64,
    pub down: f64,
    pub median: f64,
    pub up: f64,
    pub std_dev: f64,
}

/// Time-ordered collection of sample sets.
#[derive(Debug, Clone, Default)]
pub struct ImpactCatalog {
    sets: Vec<SampleSet>,
}

impl ImpactCatalog {
    /// Build a catalog from sample sets in any order.
    ///
    /// Arguments
    /// -----------------
    /// * `sets`: one sample set per event.
    /// * `valid_only`: drop the sets flagged invalid by the veto catalog.
    pub fn new(sets: impl IntoIterator<Item = SampleSet>, valid_only: bool) -> Self {
        let mut dropped = 0usize;
        let mut sets: Vec<SampleSet> = sets
            .into_iter()
            .filter(|s| {
                let keep = !valid_only || s.is_valid();
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .collect();
        sets.sort_by(|a, b| a.gps().total_cmp(&b.gps()));

        info!(events = sets.len(), vetoed = dropped, "impact catalog assembled");
        ImpactCatalog { sets }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[SampleSet] {
        &self.sets
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleSet> {
        self.sets.iter()
    }

    /// Run the localization pipeline on every event.
    pub fn localize_all<A: AttitudeSource, E: SolarEphemeris>(
        &mut self,
        locator: &ImpactLocator<A, E>,
    ) -> Result<(), ImpactError> {
        for set in self.sets.iter_mut() {
            locator.localize(set)?;
        }
        info!(events = self.sets.len(), "catalog localized");
        Ok(())
    }

    /// Summary of every localized event, in time order.
    pub fn summaries<A: AttitudeSource, E: SolarEphemeris>(
        &self,
        locator: &ImpactLocator<A, E>,
    ) -> Result<Vec<ImpactSummary>, ImpactError> {
        self.sets.iter().map(|s| locator.summarize(s)).collect()
    }

    /// Events sorted by increasing median of `param` (ties keep time order).
    pub fn sorted_by_median(&self, param: ChainParam) -> Result<Vec<&SampleSet>, ImpactError> {
        let mut keyed = self
            .sets
            .iter()
            .map(|s| Ok((s.median(param)?, s)))
            .collect::<Result<Vec<_>, ImpactError>>()?;
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(keyed.into_iter().map(|(_, s)| s).collect())
    }

    /// Credible interval and standard deviation of `param` for each event of `events`.
    pub fn credible_intervals<'a>(
        events: impl IntoIterator<Item = &'a SampleSet>,
        param: ChainParam,
        credible: f64,
    ) -> Result<Vec<EventInterval>, ImpactError> {
        events
            .into_iter()
            .map(|s| {
                let ci = s.credible_interval(param, credible)?;
                Ok(EventInterval {
                    gps: s.gps(),
                    down: ci.down,
                    median: ci.median,
                    up: ci.up,
                    std_dev: s.std_dev(param)?,
                })
            })
            .collect()
    }
}

//! Interactive diameter-conversion workflow.
//!
//! ```text
//! Idle ─▶ PreviewRequested ─▶ PreviewReady ─▶ ConfirmRequested ─▶ Applied
//!   └──────────────────────────▲    │                │
//!                                   └──▶ Cancelled ◀─┘
//! reset: any state with converted traits ─▶ Idle
//! ```
//!
//! Only [`ConversionWorkflow::apply`] produces rewritten records; every other
//! transition works on a preview.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aggregate::{compare_cross_sections, CrossSectionComparison, CrossSectionSelection};
use super::conversion::{
    apply_diameter_conversion, preview_changes, reset_diameter_conversion, select_mechanical_traits, ConversionChange,
    ConversionPlan, ConversionResult,
};
use crate::errors::{MechError, MechResult};
use crate::records::{ExperimentRecord, TraitRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    PreviewRequested,
    PreviewReady,
    ConfirmRequested,
    Applied,
    Cancelled,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::PreviewRequested => "PreviewRequested",
            WorkflowState::PreviewReady => "PreviewReady",
            WorkflowState::ConfirmRequested => "ConfirmRequested",
            WorkflowState::Applied => "Applied",
            WorkflowState::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// A computed preview awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConversion {
    pub comparison: CrossSectionComparison,
    pub plan: ConversionPlan,
    /// Experiment groups whose mechanical traits will be rescaled
    pub groups: BTreeSet<String>,
    pub changes: Vec<ConversionChange>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionWorkflow {
    state: WorkflowState,
    pending: Option<PendingConversion>,
}

impl ConversionWorkflow {
    pub fn new() -> Self {
        ConversionWorkflow::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingConversion> {
        self.pending.as_ref()
    }

    fn transition(&mut self, to: WorkflowState) {
        debug!(from = %self.state, to = %to, "Conversion workflow transition");
        self.state = to;
    }

    fn refuse<T>(&self, action: &str) -> MechResult<T> {
        Err(MechError::invalid_transition(self.state.to_string(), action))
    }

    /// Start a new preview.
    pub fn request_preview(&mut self) -> MechResult<()> {
        match self.state {
            WorkflowState::Idle | WorkflowState::Applied | WorkflowState::Cancelled => {
                self.pending = None;
                self.transition(WorkflowState::PreviewRequested);
                Ok(())
            }
            _ => self.refuse("request a preview"),
        }
    }

    /// Compute the comparison and the changes it would make.
    ///
    /// Allowed from `Idle` directly, and from `PreviewReady` to recompute
    /// after the selection changed.
    pub fn build_preview(
        &mut self,
        records: &[TraitRecord],
        selection: &CrossSectionSelection,
        groups: &BTreeSet<String>,
    ) -> MechResult<&PendingConversion> {
        match self.state {
            WorkflowState::Idle | WorkflowState::PreviewRequested | WorkflowState::PreviewReady => {}
            _ => return self.refuse("build a preview"),
        }

        let comparison = compare_cross_sections(records, selection).ok_or_else(|| {
            MechError::calculation_failed("cross-section comparison", "No diameter traits with a measurement")
        })?;
        let plan = ConversionPlan::from_comparison(&comparison, selection);
        let changes = preview_changes(&select_mechanical_traits(records, groups), plan.ratio);

        self.transition(WorkflowState::PreviewReady);
        Ok(self.pending.insert(PendingConversion {
            comparison,
            plan,
            groups: groups.clone(),
            changes,
        }))
    }

    /// Ask for confirmation; the comparison column must not be empty.
    pub fn request_confirm(&mut self) -> MechResult<&PendingConversion> {
        if self.state != WorkflowState::PreviewReady {
            return self.refuse("confirm");
        }
        let has_comparison = self
            .pending
            .as_ref()
            .is_some_and(|p| !p.plan.new_diameters.is_empty());
        if !has_comparison {
            return Err(MechError::invalid_input(
                "compared",
                "[]",
                "Select at least one diameter trait to compare against",
            ));
        }
        self.transition(WorkflowState::ConfirmRequested);
        self.pending
            .as_ref()
            .ok_or_else(|| MechError::Internal { message: "pending conversion vanished".to_string() })
    }

    /// Commit the confirmed conversion.
    pub fn apply(
        &mut self,
        records: &[TraitRecord],
        experiments: &[ExperimentRecord],
        now: DateTime<Utc>,
    ) -> MechResult<ConversionResult> {
        if self.state != WorkflowState::ConfirmRequested {
            return self.refuse("apply");
        }
        let Some(pending) = self.pending.as_ref() else {
            return self.refuse("apply");
        };
        let selected = select_mechanical_traits(records, &pending.groups);
        let result = apply_diameter_conversion(&selected, experiments, &pending.plan, now)?;
        self.transition(WorkflowState::Applied);
        Ok(result)
    }

    pub fn cancel(&mut self) -> MechResult<()> {
        match self.state {
            WorkflowState::PreviewRequested | WorkflowState::PreviewReady | WorkflowState::ConfirmRequested => {
                self.pending = None;
                self.transition(WorkflowState::Cancelled);
                Ok(())
            }
            _ => self.refuse("cancel"),
        }
    }

    /// Restore every converted trait among `records` and return to `Idle`.
    pub fn reset(
        &mut self,
        records: &[TraitRecord],
        experiments: &[ExperimentRecord],
        now: DateTime<Utc>,
    ) -> MechResult<ConversionResult> {
        let converted: Vec<&TraitRecord> = records.iter().filter(|r| r.diameter_conversion.is_some()).collect();
        if converted.is_empty() {
            return self.refuse("reset without a prior conversion");
        }
        let result = reset_diameter_conversion(&converted, experiments, now);
        self.pending = None;
        self.transition(WorkflowState::Idle);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::conversion::UNGROUPED;
    use crate::trait_types::DIAMETER;

    fn records() -> Vec<TraitRecord> {
        vec![
            TraitRecord::new("d1", DIAMETER, 4.0, "µm").with_nfibres("1"),
            TraitRecord::new("d2", DIAMETER, 2.0, "µm").with_nfibres("1"),
            TraitRecord::new("s1", "stressAtBreak", 1.0, "GPa"),
        ]
    }

    fn selection() -> CrossSectionSelection {
        let mut selection = CrossSectionSelection::initial(&records());
        selection.included = ["d1".to_string()].into_iter().collect();
        selection.compared = ["d2".to_string()].into_iter().collect();
        selection
    }

    fn groups() -> BTreeSet<String> {
        [UNGROUPED.to_string()].into_iter().collect()
    }

    #[test]
    fn test_full_commit_path() {
        let mut workflow = ConversionWorkflow::new();
        workflow.request_preview().unwrap();
        assert_eq!(workflow.state(), WorkflowState::PreviewRequested);

        let pending = workflow.build_preview(&records(), &selection(), &groups()).unwrap();
        assert!((pending.plan.ratio - 4.0).abs() < 1e-9);
        assert_eq!(pending.changes.len(), 1);

        workflow.request_confirm().unwrap();
        let result = workflow.apply(&records(), &[], Utc::now()).unwrap();
        assert_eq!(workflow.state(), WorkflowState::Applied);
        assert!((result.traits[0].measurement.unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_preview_then_cancel() {
        let mut workflow = ConversionWorkflow::new();
        workflow.build_preview(&records(), &selection(), &groups()).unwrap();
        assert_eq!(workflow.state(), WorkflowState::PreviewReady);
        workflow.cancel().unwrap();
        assert_eq!(workflow.state(), WorkflowState::Cancelled);
        assert!(workflow.pending().is_none());
    }

    #[test]
    fn test_illegal_transitions() {
        let mut workflow = ConversionWorkflow::new();
        let err = workflow.apply(&records(), &[], Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot apply while Idle");
        assert!(workflow.request_confirm().is_err());
        assert!(workflow.cancel().is_err());
    }

    #[test]
    fn test_confirm_requires_comparison() {
        let mut workflow = ConversionWorkflow::new();
        let empty = CrossSectionSelection::initial(&records());
        workflow.build_preview(&records(), &empty, &groups()).unwrap();
        let err = workflow.request_confirm().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert_eq!(workflow.state(), WorkflowState::PreviewReady);
    }

    #[test]
    fn test_reset_restores_and_returns_to_idle() {
        let mut workflow = ConversionWorkflow::new();
        workflow.build_preview(&records(), &selection(), &groups()).unwrap();
        workflow.request_confirm().unwrap();
        let applied = workflow.apply(&records(), &[], Utc::now()).unwrap();

        let reset = workflow.reset(&applied.traits, &[], Utc::now()).unwrap();
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert_eq!(reset.traits[0].measurement, Some(1.0));

        assert!(workflow.reset(&records(), &[], Utc::now()).is_err());
    }
}

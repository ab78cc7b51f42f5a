//! Cycle stages and their transitions.
//!
//! `transition` is pure: the controller performs a stage's I/O, reports what
//! happened as a [`StageEvent`] and asks for the next stage.

use std::fmt;

use crate::error::EngineError;
use crate::request::Action;

/// Sub-stages of the reconciliation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Fetch the next remote page.
    FetchPage,
    /// Match the fetched page against the local store and create/update.
    ReconcilePage,
    /// Create or update dependents declared by the fetched resources.
    Dependents,
    /// Second-round provider lookups.
    Enrich,
    /// One page of the staleness sweep.
    Sweep,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::FetchPage => "fetch-page",
            PipelineStage::ReconcilePage => "reconcile-page",
            PipelineStage::Dependents => "dependents",
            PipelineStage::Enrich => "enrich",
            PipelineStage::Sweep => "sweep",
        };
        f.write_str(name)
    }
}

/// Sub-dispatch of the enumerating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumerating {
    Start,
    Refresh(PipelineStage),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Enumerating(Enumerating),
    Finished,
    Error,
}

impl Stage {
    /// First stage for a requested action.
    ///
    /// STOP needs no credentials and goes straight to its handler.
    pub fn initial(action: &Action) -> Result<Stage, EngineError> {
        match action {
            Action::Start | Action::Refresh => Ok(Stage::Authenticating),
            Action::Stop => Ok(Stage::Enumerating(Enumerating::Stop)),
            Action::Unknown(raw) => Err(EngineError::UnknownAction(raw.clone())),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Finished | Stage::Error)
    }

    /// Pipeline sub-stage, if any. Registry ownership is checked before each one.
    pub fn pipeline(&self) -> Option<PipelineStage> {
        match self {
            Stage::Enumerating(Enumerating::Refresh(stage)) => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Authenticating => write!(f, "authenticating"),
            Stage::Enumerating(Enumerating::Start) => write!(f, "enumerating(start)"),
            Stage::Enumerating(Enumerating::Refresh(stage)) => {
                write!(f, "enumerating(refresh:{stage})")
            }
            Stage::Enumerating(Enumerating::Stop) => write!(f, "enumerating(stop)"),
            Stage::Finished => write!(f, "finished"),
            Stage::Error => write!(f, "error"),
        }
    }
}

/// What a stage's I/O produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Authenticated,
    /// The key was registered for this cycle.
    Registered,
    /// STOP handled, or the key was found unregistered at a boundary.
    Stopped,
    PageFetched { first: bool, empty: bool, has_more: bool },
    PageReconciled { more_pages: bool },
    DependentsDone,
    EnrichmentDone,
    SweepPageDone { more_pages: bool },
    Failed,
}

/// Computes the next stage. Combinations outside the graph are programmer
/// errors and surface as `EngineError::UnknownStage`.
pub fn transition(stage: Stage, event: StageEvent) -> Result<Stage, EngineError> {
    use Enumerating::{Refresh, Start};
    use PipelineStage::*;

    let next = match (stage, event) {
        (stage, StageEvent::Failed) if !stage.is_terminal() => Stage::Error,
        (stage, StageEvent::Stopped) if !stage.is_terminal() => Stage::Finished,

        (Stage::Authenticating, StageEvent::Authenticated) => Stage::Enumerating(Start),
        (Stage::Enumerating(Start), StageEvent::Registered) => {
            Stage::Enumerating(Refresh(FetchPage))
        }

        (
            Stage::Enumerating(Refresh(FetchPage)),
            StageEvent::PageFetched {
                first,
                empty,
                has_more,
            },
        ) => {
            if first && empty && !has_more {
                Stage::Enumerating(Refresh(Sweep))
            } else {
                Stage::Enumerating(Refresh(ReconcilePage))
            }
        }
        (Stage::Enumerating(Refresh(ReconcilePage)), StageEvent::PageReconciled { more_pages }) => {
            if more_pages {
                Stage::Enumerating(Refresh(FetchPage))
            } else {
                Stage::Enumerating(Refresh(Dependents))
            }
        }
        (Stage::Enumerating(Refresh(Dependents)), StageEvent::DependentsDone) => {
            Stage::Enumerating(Refresh(Enrich))
        }
        (Stage::Enumerating(Refresh(Enrich)), StageEvent::EnrichmentDone) => {
            Stage::Enumerating(Refresh(Sweep))
        }
        (Stage::Enumerating(Refresh(Sweep)), StageEvent::SweepPageDone { more_pages }) => {
            if more_pages {
                Stage::Enumerating(Refresh(Sweep))
            } else {
                Stage::Finished
            }
        }

        (stage, event) => {
            return Err(EngineError::unknown_stage(format!(
                "no transition from {stage} on {event:?}"
            )));
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh(stage: PipelineStage) -> Stage {
        Stage::Enumerating(Enumerating::Refresh(stage))
    }

    #[test]
    fn test_initial_stage_per_action() {
        assert_eq!(Stage::initial(&Action::Start).unwrap(), Stage::Authenticating);
        assert_eq!(Stage::initial(&Action::Refresh).unwrap(), Stage::Authenticating);
        assert_eq!(
            Stage::initial(&Action::Stop).unwrap(),
            Stage::Enumerating(Enumerating::Stop)
        );
        assert!(matches!(
            Stage::initial(&Action::Unknown("pause".into())),
            Err(EngineError::UnknownAction(raw)) if raw == "pause"
        ));
    }

    #[test]
    fn test_full_pipeline_path() {
        let mut stage = Stage::Authenticating;
        let events = [
            StageEvent::Authenticated,
            StageEvent::Registered,
            StageEvent::PageFetched { first: true, empty: false, has_more: true },
            StageEvent::PageReconciled { more_pages: true },
            StageEvent::PageFetched { first: false, empty: false, has_more: false },
            StageEvent::PageReconciled { more_pages: false },
            StageEvent::DependentsDone,
            StageEvent::EnrichmentDone,
            StageEvent::SweepPageDone { more_pages: true },
            StageEvent::SweepPageDone { more_pages: false },
        ];
        for event in events {
            stage = transition(stage, event).unwrap();
        }
        assert_eq!(stage, Stage::Finished);
    }

    #[test]
    fn test_empty_first_page_skips_to_sweep() {
        let next = transition(
            refresh(PipelineStage::FetchPage),
            StageEvent::PageFetched { first: true, empty: true, has_more: false },
        )
        .unwrap();
        assert_eq!(next, refresh(PipelineStage::Sweep));

        // An empty first page with a continuation keeps paginating.
        let next = transition(
            refresh(PipelineStage::FetchPage),
            StageEvent::PageFetched { first: true, empty: true, has_more: true },
        )
        .unwrap();
        assert_eq!(next, refresh(PipelineStage::ReconcilePage));

        // A later empty page is reconciled as a no-op.
        let next = transition(
            refresh(PipelineStage::FetchPage),
            StageEvent::PageFetched { first: false, empty: true, has_more: false },
        )
        .unwrap();
        assert_eq!(next, refresh(PipelineStage::ReconcilePage));
    }

    #[test]
    fn test_stop_and_failure_from_any_live_stage() {
        for stage in [
            Stage::Authenticating,
            Stage::Enumerating(Enumerating::Stop),
            refresh(PipelineStage::Enrich),
        ] {
            assert_eq!(transition(stage, StageEvent::Stopped).unwrap(), Stage::Finished);
            assert_eq!(transition(stage, StageEvent::Failed).unwrap(), Stage::Error);
        }
    }

    #[test]
    fn test_invalid_transition_is_unknown_stage() {
        let err = transition(Stage::Finished, StageEvent::DependentsDone).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStage(_)));
        assert!(transition(Stage::Error, StageEvent::Failed).is_err());
        assert!(transition(refresh(PipelineStage::Sweep), StageEvent::Registered).is_err());
    }
}

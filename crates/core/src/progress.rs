//! Decides the next conversational action for a record.
//!
//! Pure and side-effect-free; the orchestrator re-evaluates it after every
//! mutation, which is what lets the conversation resume correctly after an
//! out-of-order edit.

use serde::{Deserialize, Serialize};

use crate::domain::consultation::{ConsultationRecord, ConsultationStatus};
use crate::registry::{self, FieldId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Ask for the next unmet required field.
    AskField { field: FieldId },
    /// All required fields satisfied, confirmation pending.
    ShowSummaryAndConfirm,
    /// Confirmed and not yet calculated.
    ReadyToCalculate,
    /// Already calculated; return the stored result, do not recompute.
    AlreadyCompleted,
}

pub fn next_action(record: &ConsultationRecord) -> Action {
    if record.status == ConsultationStatus::Completed {
        return Action::AlreadyCompleted;
    }
    if record.data_confirmed {
        return Action::ReadyToCalculate;
    }
    match registry::missing_fields(record).first() {
        Some(field) => Action::AskField { field: *field },
        None => Action::ShowSummaryAndConfirm,
    }
}

//! Drives one conversational turn against a consultation record.
//!
//! This is the only module allowed to invoke the calculator: the
//! `ReadyToCalculate` gate lives here, so callers upstream (agent, server)
//! never have to reason about whether a record is complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculator::{self, CalculationResult};
use crate::domain::consultation::{ConsultationRecord, ConsultationStatus};
use crate::errors::DomainError;
use crate::intents::{self, FieldRejection, UpdateIntent};
use crate::progress::{self, Action};
use crate::registry::FieldId;

/// Everything a turn produced. `action` is what the conversation should do
/// next; `result` is set exactly once, on the turn that completed the
/// record. Turns against an already completed record get `AlreadyCompleted`
/// and the stored figures remain on the record itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub action: Action,
    pub corrected_fields: Vec<FieldId>,
    pub rejected: Vec<FieldRejection>,
    pub out_of_order_confirmation: bool,
    pub result: Option<CalculationResult>,
}

/// Apply one turn's intents, advance the record, and calculate when the
/// confirmation gate opens.
pub fn handle_turn(
    record: &mut ConsultationRecord,
    turn_intents: &[UpdateIntent],
    now: DateTime<Utc>,
) -> Result<TurnOutcome, DomainError> {
    let applied = intents::apply(record, turn_intents);
    record.updated_at = now;

    let mut action = progress::next_action(record);
    let mut result = None;

    if action == Action::ReadyToCalculate {
        let calculated = calculator::calculate(record)?;
        record.grant_min = Some(calculated.grant_min);
        record.grant_max = Some(calculated.grant_max);
        record.recommended_plans = calculated.recommended_plans.clone();
        record.status = ConsultationStatus::Completed;
        result = Some(calculated);
        action = progress::next_action(record);
    }

    Ok(TurnOutcome {
        action,
        corrected_fields: applied.corrected_fields,
        rejected: applied.rejected,
        out_of_order_confirmation: applied.out_of_order_confirmation,
        result,
    })
}

//! Applies externally-extracted field updates to a consultation record.
//!
//! Intents arrive as a closed tagged union: the extractor validates the
//! loose model output at its own boundary, so nothing stringly-typed reaches
//! this module. Rejections here are range checks only, and they are
//! per-intent: one bad value never aborts the rest of the batch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::consultation::{
    ConsultationRecord, ConsultationStatus, MarketingChannel, ProjectType,
};
use crate::registry::{self, FieldId};

/// A single typed field update. The variant set mirrors the field registry
/// exactly, minus the derived fields, which no intent may touch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    ProjectType(ProjectType),
    Budget(i64),
    People(i64),
    Capital(i64),
    Revenue(i64),
    GrowthRevenue(i64),
    HasCertification(bool),
    HasGovAward(bool),
    IsMit(bool),
    HasIndustryAcademia(bool),
    HasFactoryRegistration(bool),
    MarketingChannels(BTreeSet<MarketingChannel>),
}

impl FieldUpdate {
    pub fn field(&self) -> FieldId {
        match self {
            Self::ProjectType(_) => FieldId::ProjectType,
            Self::Budget(_) => FieldId::Budget,
            Self::People(_) => FieldId::People,
            Self::Capital(_) => FieldId::Capital,
            Self::Revenue(_) => FieldId::Revenue,
            Self::GrowthRevenue(_) => FieldId::GrowthRevenue,
            Self::HasCertification(_) => FieldId::HasCertification,
            Self::HasGovAward(_) => FieldId::HasGovAward,
            Self::IsMit(_) => FieldId::IsMit,
            Self::HasIndustryAcademia(_) => FieldId::HasIndustryAcademia,
            Self::HasFactoryRegistration(_) => FieldId::HasFactoryRegistration,
            Self::MarketingChannels(_) => FieldId::MarketingChannels,
        }
    }

    fn is_bonus_flag(&self) -> bool {
        matches!(
            self,
            Self::HasCertification(_)
                | Self::HasGovAward(_)
                | Self::IsMit(_)
                | Self::HasIndustryAcademia(_)
                | Self::HasFactoryRegistration(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateIntent {
    SetField(FieldUpdate),
    Confirm { confirmed: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NegativeAmount,
    NonPositiveHeadcount,
    EmptyChannelSelection,
    RecordCompleted,
}

/// A per-field validation rejection: the offending intent was dropped and
/// the caller is expected to re-prompt for this field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRejection {
    pub field: FieldId,
    pub reason: RejectReason,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Fields whose prior non-null value was changed (corrections, not first
    /// entries). Drives confirmation phrasing outside the core.
    pub corrected_fields: Vec<FieldId>,
    pub rejected: Vec<FieldRejection>,
    /// A confirm intent arrived while required fields were still missing.
    pub out_of_order_confirmation: bool,
}

/// Apply an ordered batch of intents to the record.
///
/// Status bookkeeping happens per intent, not per batch, so a batch that
/// fills the last missing field and confirms in the same turn is accepted.
/// Any field update while the record awaits confirmation clears the stale
/// confirmation and re-runs the registry check after the edit.
pub fn apply(record: &mut ConsultationRecord, intents: &[UpdateIntent]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for intent in intents {
        match intent {
            UpdateIntent::Confirm { confirmed } => {
                if !*confirmed {
                    continue;
                }
                match record.status {
                    ConsultationStatus::AwaitingConfirmation => record.data_confirmed = true,
                    ConsultationStatus::Collecting => outcome.out_of_order_confirmation = true,
                    ConsultationStatus::Completed => {}
                }
            }
            UpdateIntent::SetField(update) => {
                if record.status == ConsultationStatus::Completed {
                    outcome.rejected.push(FieldRejection {
                        field: update.field(),
                        reason: RejectReason::RecordCompleted,
                    });
                    continue;
                }
                if let Err(reason) = validate(update) {
                    outcome
                        .rejected
                        .push(FieldRejection { field: update.field(), reason });
                    continue;
                }

                // An edit during confirmation re-triggers the gate.
                if record.status == ConsultationStatus::AwaitingConfirmation {
                    record.data_confirmed = false;
                    record.status = ConsultationStatus::Collecting;
                }

                let corrected = set_field(record, update);
                if corrected && !outcome.corrected_fields.contains(&update.field()) {
                    outcome.corrected_fields.push(update.field());
                }

                if record.status == ConsultationStatus::Collecting
                    && registry::missing_fields(record).is_empty()
                {
                    record.status = ConsultationStatus::AwaitingConfirmation;
                }
            }
        }
    }

    outcome
}

fn validate(update: &FieldUpdate) -> Result<(), RejectReason> {
    match update {
        FieldUpdate::Budget(value)
        | FieldUpdate::Capital(value)
        | FieldUpdate::Revenue(value)
        | FieldUpdate::GrowthRevenue(value) => {
            if *value < 0 {
                return Err(RejectReason::NegativeAmount);
            }
        }
        FieldUpdate::People(value) => {
            if *value <= 0 {
                return Err(RejectReason::NonPositiveHeadcount);
            }
        }
        FieldUpdate::MarketingChannels(channels) => {
            if channels.is_empty() {
                return Err(RejectReason::EmptyChannelSelection);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Write the value, reporting whether this changed a prior non-null value.
fn set_field(record: &mut ConsultationRecord, update: &FieldUpdate) -> bool {
    fn replace<T: PartialEq + Copy>(slot: &mut Option<T>, value: T) -> bool {
        let corrected = matches!(slot, Some(prior) if *prior != value);
        *slot = Some(value);
        corrected
    }

    let corrected = match update {
        FieldUpdate::ProjectType(value) => replace(&mut record.project_type, *value),
        FieldUpdate::Budget(value) => replace(&mut record.budget, *value),
        FieldUpdate::People(value) => replace(&mut record.people, *value),
        FieldUpdate::Capital(value) => replace(&mut record.capital, *value),
        FieldUpdate::Revenue(value) => replace(&mut record.revenue, *value),
        FieldUpdate::GrowthRevenue(value) => replace(&mut record.growth_revenue, *value),
        FieldUpdate::HasCertification(value) => replace(&mut record.has_certification, *value),
        FieldUpdate::HasGovAward(value) => replace(&mut record.has_gov_award, *value),
        FieldUpdate::IsMit(value) => replace(&mut record.is_mit, *value),
        FieldUpdate::HasIndustryAcademia(value) => {
            replace(&mut record.has_industry_academia, *value)
        }
        FieldUpdate::HasFactoryRegistration(value) => {
            replace(&mut record.has_factory_registration, *value)
        }
        FieldUpdate::MarketingChannels(channels) => {
            let corrected =
                !record.marketing_channels.is_empty() && record.marketing_channels != *channels;
            record.marketing_channels = channels.clone();
            corrected
        }
    };

    if update.is_bonus_flag() {
        record.recompute_bonus();
    }

    corrected
}

//! Selects the assistant's reply text for each turn outcome.
//!
//! Pure presentation: which field to ask, whether to summarize, and whether
//! to confirm are all decided by the core; this module only renders.

use grantline_core::calculator::CalculationResult;
use grantline_core::domain::consultation::{
    ConsultationRecord, MarketingChannel, PlanId, ProjectType,
};
use grantline_core::intents::{FieldRejection, RejectReason};
use grantline_core::orchestrator::TurnOutcome;
use grantline_core::progress::Action;
use grantline_core::registry::FieldId;

pub struct MessageComposer;

fn format_amount(value: i64) -> String {
    let raw = value.abs().to_string();
    let mut formatted = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }
    if value < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

fn field_label(field: FieldId) -> &'static str {
    match field {
        FieldId::ProjectType => "project type",
        FieldId::Budget => "planned budget",
        FieldId::People => "insured headcount",
        FieldId::Capital => "paid-in capital",
        FieldId::Revenue => "annual revenue",
        FieldId::HasCertification => "third-party certification",
        FieldId::HasGovAward => "government award",
        FieldId::IsMit => "MIT manufacturing",
        FieldId::HasIndustryAcademia => "industry-academia collaboration",
        FieldId::HasFactoryRegistration => "factory registration",
        FieldId::MarketingChannels => "marketing channels",
        FieldId::GrowthRevenue => "projected revenue growth",
    }
}

impl MessageComposer {
    pub fn welcome() -> String {
        "Welcome! I can estimate the government subsidy range your company may \
         qualify for. I will ask a few questions about your project and company; \
         you can correct any answer at any time. Let's begin: is your project \
         focused on research and development, or on marketing?"
            .to_string()
    }

    pub fn question(field: FieldId) -> &'static str {
        match field {
            FieldId::ProjectType => {
                "Is your project focused on research and development, or on marketing?"
            }
            FieldId::Budget => {
                "What is the planned budget for this project? (You can answer in ten-thousands.)"
            }
            FieldId::People => "How many insured employees does your company have?",
            FieldId::Capital => "What is your company's paid-in capital?",
            FieldId::Revenue => "What is your company's approximate annual revenue?",
            FieldId::HasCertification => {
                "Has your product or service obtained third-party certification? (yes/no)"
            }
            FieldId::HasGovAward => "Has your company received a government award? (yes/no)",
            FieldId::IsMit => "Is your product MIT-certified (made in Taiwan)? (yes/no)",
            FieldId::HasIndustryAcademia => {
                "Does your company have an industry-academia collaboration? (yes/no)"
            }
            FieldId::HasFactoryRegistration => {
                "Does your company hold a factory registration certificate? (yes/no)"
            }
            FieldId::MarketingChannels => {
                "Is your marketing aimed at the domestic market, export markets, or both?"
            }
            FieldId::GrowthRevenue => {
                "How much additional revenue do you expect the marketing activity to bring?"
            }
        }
    }

    pub fn summary(record: &ConsultationRecord) -> String {
        let mut lines = vec!["Here is everything collected so far:".to_string()];

        if let Some(project_type) = record.project_type {
            let label = match project_type {
                ProjectType::ResearchAndDevelopment => "research and development",
                ProjectType::Marketing => "marketing",
            };
            lines.push(format!("- Project type: {label}"));
        }
        if let Some(budget) = record.budget {
            lines.push(format!("- Planned budget: {}", format_amount(budget)));
        }
        if let Some(people) = record.people {
            lines.push(format!("- Insured headcount: {people}"));
        }
        if let Some(capital) = record.capital {
            lines.push(format!("- Paid-in capital: {}", format_amount(capital)));
        }
        if let Some(revenue) = record.revenue {
            lines.push(format!("- Annual revenue: {}", format_amount(revenue)));
        }

        let bonus = if record.bonus_details.is_empty() {
            "none".to_string()
        } else {
            record.bonus_details.iter().map(|item| item.label()).collect::<Vec<_>>().join(", ")
        };
        lines.push(format!("- Bonus items ({}): {bonus}", record.bonus_count));

        if !record.marketing_channels.is_empty() {
            let channels = record
                .marketing_channels
                .iter()
                .map(|channel| match channel {
                    MarketingChannel::Domestic => "domestic",
                    MarketingChannel::Export => "export",
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("- Marketing channels: {channels}"));
        }
        if let Some(growth_revenue) = record.growth_revenue {
            lines.push(format!("- Projected revenue growth: {}", format_amount(growth_revenue)));
        }

        lines.push(
            "Is everything correct? Reply \"confirmed\" to calculate your subsidy range, or \
             tell me what to change."
                .to_string(),
        );
        lines.join("\n")
    }

    pub fn result(result: &CalculationResult) -> String {
        let plans = if result.recommended_plans.is_empty() {
            "none of the tracked programs match this profile".to_string()
        } else {
            result
                .recommended_plans
                .iter()
                .map(PlanId::display_name)
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Based on your answers, the estimated subsidy range is {} to {}.\n\
             Recommended programs: {}.\n\
             This consultation is now complete. Start a new session to run another estimate.",
            format_amount(result.grant_min),
            format_amount(result.grant_max),
            plans,
        )
    }

    fn stored_result(record: &ConsultationRecord) -> String {
        match (record.grant_min, record.grant_max) {
            (Some(grant_min), Some(grant_max)) => {
                let plans = if record.recommended_plans.is_empty() {
                    "none".to_string()
                } else {
                    record
                        .recommended_plans
                        .iter()
                        .map(PlanId::display_name)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    "This consultation is already complete. The estimated range was {} to {} \
                     (recommended programs: {}). Start a new session to run another estimate.",
                    format_amount(grant_min),
                    format_amount(grant_max),
                    plans,
                )
            }
            _ => "This consultation is already complete. Start a new session to run another \
                  estimate."
                .to_string(),
        }
    }

    fn rejection_note(rejection: &FieldRejection) -> String {
        let label = field_label(rejection.field);
        match rejection.reason {
            RejectReason::NegativeAmount => {
                format!("The {label} cannot be negative; I kept the previous value.")
            }
            RejectReason::NonPositiveHeadcount => {
                format!("The {label} must be at least 1; I kept the previous value.")
            }
            RejectReason::EmptyChannelSelection => {
                format!("At least one {label} option is needed; I kept the previous value.")
            }
            RejectReason::RecordCompleted => {
                format!("The {label} cannot change after the calculation is finalized.")
            }
        }
    }

    /// Render the assistant reply for one completed turn.
    pub fn compose(record: &ConsultationRecord, outcome: &TurnOutcome) -> String {
        let mut parts: Vec<String> = Vec::new();

        for rejection in &outcome.rejected {
            parts.push(Self::rejection_note(rejection));
        }

        if !outcome.corrected_fields.is_empty() {
            let labels = outcome
                .corrected_fields
                .iter()
                .map(|field| field_label(*field))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("Got it, I updated the {labels}."));
        }

        if outcome.out_of_order_confirmation {
            parts.push(
                "We are not ready to confirm yet; a few details are still missing.".to_string(),
            );
        }

        if let Some(result) = &outcome.result {
            parts.push(Self::result(result));
            return parts.join("\n");
        }

        match outcome.action {
            Action::AskField { field } => parts.push(Self::question(field).to_string()),
            Action::ShowSummaryAndConfirm => parts.push(Self::summary(record)),
            // The orchestrator resolves this before composing; kept for
            // completeness if a caller composes from a raw action.
            Action::ReadyToCalculate => parts.push(Self::summary(record)),
            Action::AlreadyCompleted => parts.push(Self::stored_result(record)),
        }

        parts.join("\n")
    }
}

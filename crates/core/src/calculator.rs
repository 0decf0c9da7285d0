//! The grant formula: a pure function from a complete record to a grant
//! range plus recommended programs.
//!
//! The revenue-bonus step intentionally overwrites (not adds): when both the
//! flat-bonus condition and the employee-grant-multiple condition hold, the
//! second wins. That matches the production rule set; do not "fix" it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::consultation::{BonusItem, ConsultationRecord, MarketingChannel, PlanId, ProjectType};
use crate::errors::DomainError;
use crate::registry;

const EMPLOYEE_GRANT_PER_PERSON: i64 = 150_000;
const EMPLOYEE_GRANT_CAP: i64 = 3_000_000;
const REVENUE_BONUS_THRESHOLD: i64 = 10_000_000;
const REVENUE_BONUS_FLAT: i64 = 500_000;
const UPPER_LIMIT_CAP: i64 = 4_500_000;

/// Per-item bonus amounts, positional with `BonusItem::ALL`.
const BONUS_ITEM_AMOUNTS: [i64; 5] = [100_000, 200_000, 50_000, 50_000, 50_000];

const CITD_THRESHOLD: i64 = 1_500_000;
const CENTRAL_SBIR_THRESHOLD: i64 = 2_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationBreakdown {
    pub grant_employee: i64,
    pub grant_revenue_bonus: i64,
    pub bonus_amount: i64,
    pub upper_limit: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub grant_min: i64,
    pub grant_max: i64,
    pub recommended_plans: Vec<PlanId>,
    pub breakdown: CalculationBreakdown,
}

/// Round half up to a whole amount. The input is an i64 amount scaled down
/// by a factor <= 1, so the conversion back cannot overflow.
fn round_half_up(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

fn pct(numerator: i64, scale: u32) -> Decimal {
    Decimal::new(numerator, scale)
}

/// Compute the grant range and recommendations for a complete record.
///
/// Must only be invoked when the progress selector reports
/// `ReadyToCalculate`; a record with unmet required fields is an
/// orchestration bug and fails with `IncompleteData`.
pub fn calculate(record: &ConsultationRecord) -> Result<CalculationResult, DomainError> {
    let missing = registry::missing_fields(record);
    if !missing.is_empty() {
        return Err(DomainError::IncompleteData { missing });
    }

    // missing_fields() guarantees these are present.
    let (project_type, budget, people, revenue) = match (
        record.project_type,
        record.budget,
        record.people,
        record.revenue,
    ) {
        (Some(project_type), Some(budget), Some(people), Some(revenue)) => {
            (project_type, budget, people, revenue)
        }
        _ => {
            return Err(DomainError::IncompleteData { missing: registry::missing_fields(record) })
        }
    };

    let grant_employee = people.saturating_mul(EMPLOYEE_GRANT_PER_PERSON).min(EMPLOYEE_GRANT_CAP);

    let mut grant_revenue_bonus = 0;
    if revenue >= REVENUE_BONUS_THRESHOLD {
        grant_revenue_bonus = REVENUE_BONUS_FLAT;
    }
    if revenue >= grant_employee * 5 {
        // Sequential overwrite, floored toward zero.
        grant_revenue_bonus = (Decimal::from(budget) * pct(1, 1))
            .trunc()
            .to_i64()
            .unwrap_or(i64::MAX);
    }

    let bonus_amount = bonus_amount(record);

    let grant_max_uncapped = grant_employee + grant_revenue_bonus + bonus_amount;
    let upper_limit = UPPER_LIMIT_CAP.min(round_half_up(Decimal::from(revenue) * pct(2, 1)));
    let grant_max = grant_max_uncapped.min(upper_limit);
    let grant_min = round_half_up(Decimal::from(grant_max) * pct(75, 2));

    let recommended_plans = recommended_plans(record, project_type, grant_max);

    Ok(CalculationResult {
        grant_min,
        grant_max,
        recommended_plans,
        breakdown: CalculationBreakdown {
            grant_employee,
            grant_revenue_bonus,
            bonus_amount,
            upper_limit,
        },
    })
}

fn bonus_amount(record: &ConsultationRecord) -> i64 {
    let raw: i64 = BonusItem::ALL
        .into_iter()
        .zip(BONUS_ITEM_AMOUNTS)
        .filter(|(item, _)| record.bonus_flag(*item) == Some(true))
        .map(|(_, amount)| amount)
        .sum();

    let multiplier = match record.bonus_count {
        5 => pct(8, 1),
        4 => pct(9, 1),
        _ => Decimal::ONE,
    };
    round_half_up(Decimal::from(raw) * multiplier)
}

fn recommended_plans(
    record: &ConsultationRecord,
    project_type: ProjectType,
    grant_max: i64,
) -> Vec<PlanId> {
    let threshold = Decimal::from(grant_max) * pct(8, 1);
    let mut plans = Vec::new();

    match project_type {
        ProjectType::ResearchAndDevelopment => {
            plans.push(PlanId::LocalSbir);
            if threshold >= Decimal::from(CITD_THRESHOLD) {
                plans.push(PlanId::Citd);
            }
            if threshold >= Decimal::from(CENTRAL_SBIR_THRESHOLD) {
                plans.push(PlanId::CentralSbir);
            }
        }
        ProjectType::Marketing => {
            if record.marketing_channels.contains(&MarketingChannel::Export) {
                plans.push(PlanId::ExportMarketDev);
            }
            if record.marketing_channels.contains(&MarketingChannel::Domestic) {
                plans.push(PlanId::DomesticMarketPromo);
            }
        }
    }

    plans
}

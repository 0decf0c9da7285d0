//! Flat tabular projection of a consultation record.
//!
//! Keys are stable snake_case identifiers, one row per public field. The
//! server renders these rows as CSV; nothing here knows about files or
//! encodings.

use serde::{Deserialize, Serialize};

use crate::domain::consultation::{BonusItem, ConsultationRecord};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub key: &'static str,
    pub value: String,
}

fn row(key: &'static str, value: impl Into<String>) -> ExportRow {
    ExportRow { key, value: value.into() }
}

fn amount(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => String::new(),
    }
}

/// Every public field of the record, in a fixed order. Unset optionals
/// export as empty strings so the column set never varies by record state.
pub fn export_rows(record: &ConsultationRecord) -> Vec<ExportRow> {
    let bonus_details = record
        .bonus_details
        .iter()
        .map(BonusItem::label)
        .collect::<Vec<_>>()
        .join(", ");
    let marketing_channels = record
        .marketing_channels
        .iter()
        .map(|channel| channel.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let recommended_plans = record
        .recommended_plans
        .iter()
        .map(|plan| plan.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        row("consultation_id", record.id.0.clone()),
        row("session_id", record.session_id.0.clone()),
        row("status", record.status.as_str()),
        row("project_type", record.project_type.map(|p| p.as_str()).unwrap_or_default()),
        row("budget", amount(record.budget)),
        row("people", amount(record.people)),
        row("capital", amount(record.capital)),
        row("revenue", amount(record.revenue)),
        row("has_certification", flag(record.has_certification)),
        row("has_gov_award", flag(record.has_gov_award)),
        row("is_mit", flag(record.is_mit)),
        row("has_industry_academia", flag(record.has_industry_academia)),
        row("has_factory_registration", flag(record.has_factory_registration)),
        row("bonus_count", record.bonus_count.to_string()),
        row("bonus_details", bonus_details),
        row("marketing_channels", marketing_channels),
        row("growth_revenue", amount(record.growth_revenue)),
        row("data_confirmed", if record.data_confirmed { "yes" } else { "no" }),
        row("grant_min", amount(record.grant_min)),
        row("grant_max", amount(record.grant_max)),
        row("recommended_plans", recommended_plans),
        row("created_at", record.created_at.to_rfc3339()),
        row("updated_at", record.updated_at.to_rfc3339()),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::export_rows;
    use crate::domain::consultation::{
        ConsultationId, ConsultationRecord, ConsultationStatus, MarketingChannel, PlanId,
        ProjectType,
    };
    use crate::domain::session::SessionId;
    use crate::registry::{self, FieldId};

    fn record() -> ConsultationRecord {
        ConsultationRecord::new(
            ConsultationId("c-1".to_string()),
            SessionId("s-1".to_string()),
            Utc::now(),
        )
    }

    fn value_of<'a>(rows: &'a [super::ExportRow], key: &str) -> &'a str {
        rows.iter().find(|row| row.key == key).map(|row| row.value.as_str()).unwrap_or("absent")
    }

    #[test]
    fn every_registry_field_has_an_export_row() {
        let rows = export_rows(&record());
        for field in registry::required_fields(Some(ProjectType::Marketing)) {
            assert!(
                rows.iter().any(|row| row.key == field.as_str()),
                "no export row for {field:?}"
            );
        }
    }

    #[test]
    fn unset_optionals_export_as_empty_strings() {
        let rows = export_rows(&record());
        assert_eq!(value_of(&rows, "project_type"), "");
        assert_eq!(value_of(&rows, "budget"), "");
        assert_eq!(value_of(&rows, "has_certification"), "");
        assert_eq!(value_of(&rows, "grant_min"), "");
        assert_eq!(value_of(&rows, "marketing_channels"), "");
        // Derived and lifecycle fields always have a value.
        assert_eq!(value_of(&rows, "bonus_count"), "0");
        assert_eq!(value_of(&rows, "status"), "COLLECTING");
        assert_eq!(value_of(&rows, "data_confirmed"), "no");
    }

    #[test]
    fn completed_record_exports_all_values() {
        let mut record = record();
        record.project_type = Some(ProjectType::Marketing);
        record.budget = Some(3_000_000);
        record.people = Some(15);
        record.capital = Some(5_000_000);
        record.revenue = Some(20_000_000);
        record.growth_revenue = Some(4_000_000);
        record.has_certification = Some(true);
        record.has_gov_award = Some(false);
        record.is_mit = Some(true);
        record.has_industry_academia = Some(false);
        record.has_factory_registration = Some(false);
        record.marketing_channels =
            BTreeSet::from([MarketingChannel::Domestic, MarketingChannel::Export]);
        record.recompute_bonus();
        record.data_confirmed = true;
        record.status = ConsultationStatus::Completed;
        record.grant_min = Some(1_500_000);
        record.grant_max = Some(2_000_000);
        record.recommended_plans = vec![PlanId::ExportMarketDev, PlanId::DomesticMarketPromo];

        let rows = export_rows(&record);
        assert_eq!(value_of(&rows, "project_type"), "MARKETING");
        assert_eq!(value_of(&rows, "has_certification"), "yes");
        assert_eq!(value_of(&rows, "has_gov_award"), "no");
        assert_eq!(value_of(&rows, "bonus_count"), "2");
        assert_eq!(
            value_of(&rows, "bonus_details"),
            "third-party product/service certification, MIT-certified manufacturing"
        );
        assert_eq!(value_of(&rows, "marketing_channels"), "DOMESTIC, EXPORT");
        assert_eq!(
            value_of(&rows, "recommended_plans"),
            "EXPORT_MARKET_DEV, DOMESTIC_MARKET_PROMO"
        );
        assert_eq!(value_of(&rows, "grant_max"), "2000000");

        // Spot-check FieldId coverage stays exhaustive if the registry grows.
        assert!(rows.iter().any(|row| row.key == FieldId::GrowthRevenue.as_str()));
    }
}

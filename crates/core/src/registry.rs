//! Static description of the fields a consultation must collect.
//!
//! The registry owns the canonical question order and the completion
//! predicate per field. It is a pure lookup: no side effects, no state.

use serde::{Deserialize, Serialize};

use crate::domain::consultation::{ConsultationRecord, ProjectType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    ProjectType,
    Budget,
    People,
    Capital,
    Revenue,
    HasCertification,
    HasGovAward,
    IsMit,
    HasIndustryAcademia,
    HasFactoryRegistration,
    MarketingChannels,
    GrowthRevenue,
}

impl FieldId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectType => "project_type",
            Self::Budget => "budget",
            Self::People => "people",
            Self::Capital => "capital",
            Self::Revenue => "revenue",
            Self::HasCertification => "has_certification",
            Self::HasGovAward => "has_gov_award",
            Self::IsMit => "is_mit",
            Self::HasIndustryAcademia => "has_industry_academia",
            Self::HasFactoryRegistration => "has_factory_registration",
            Self::MarketingChannels => "marketing_channels",
            Self::GrowthRevenue => "growth_revenue",
        }
    }
}

/// Fields every consultation needs, in the order they are asked.
const COMMON_ORDER: [FieldId; 10] = [
    FieldId::ProjectType,
    FieldId::Budget,
    FieldId::People,
    FieldId::Capital,
    FieldId::Revenue,
    FieldId::HasCertification,
    FieldId::HasGovAward,
    FieldId::IsMit,
    FieldId::HasIndustryAcademia,
    FieldId::HasFactoryRegistration,
];

/// Tail appended for marketing projects only.
const MARKETING_TAIL: [FieldId; 2] = [FieldId::MarketingChannels, FieldId::GrowthRevenue];

/// Ordered required fields for a given project type. Until the type is
/// chosen the type-dependent tail is unknown, so only the common prefix
/// applies (and `project_type` itself leads it).
pub fn required_fields(project_type: Option<ProjectType>) -> Vec<FieldId> {
    let mut fields = COMMON_ORDER.to_vec();
    if project_type == Some(ProjectType::Marketing) {
        fields.extend(MARKETING_TAIL);
    }
    fields
}

fn is_satisfied(record: &ConsultationRecord, field: FieldId) -> bool {
    match field {
        FieldId::ProjectType => record.project_type.is_some(),
        FieldId::Budget => record.budget.is_some(),
        FieldId::People => record.people.is_some(),
        FieldId::Capital => record.capital.is_some(),
        FieldId::Revenue => record.revenue.is_some(),
        FieldId::HasCertification => record.has_certification.is_some(),
        FieldId::HasGovAward => record.has_gov_award.is_some(),
        FieldId::IsMit => record.is_mit.is_some(),
        FieldId::HasIndustryAcademia => record.has_industry_academia.is_some(),
        FieldId::HasFactoryRegistration => record.has_factory_registration.is_some(),
        FieldId::MarketingChannels => !record.marketing_channels.is_empty(),
        FieldId::GrowthRevenue => record.growth_revenue.is_some(),
    }
}

/// Required fields not yet satisfied, in canonical ask order.
pub fn missing_fields(record: &ConsultationRecord) -> Vec<FieldId> {
    required_fields(record.project_type)
        .into_iter()
        .filter(|field| !is_satisfied(record, *field))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::{missing_fields, required_fields, FieldId};
    use crate::domain::consultation::{
        ConsultationId, ConsultationRecord, MarketingChannel, ProjectType,
    };
    use crate::domain::session::SessionId;

    fn record() -> ConsultationRecord {
        ConsultationRecord::new(
            ConsultationId("c-1".to_string()),
            SessionId("s-1".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn project_type_is_always_asked_first() {
        let record = record();
        assert_eq!(missing_fields(&record).first(), Some(&FieldId::ProjectType));
    }

    #[test]
    fn marketing_projects_require_the_extended_tail() {
        let rd = required_fields(Some(ProjectType::ResearchAndDevelopment));
        let marketing = required_fields(Some(ProjectType::Marketing));

        assert_eq!(rd.len(), 10);
        assert_eq!(marketing.len(), 12);
        assert_eq!(
            &marketing[10..],
            &[FieldId::MarketingChannels, FieldId::GrowthRevenue]
        );
    }

    #[test]
    fn satisfied_fields_drop_out_in_order() {
        let mut record = record();
        record.project_type = Some(ProjectType::ResearchAndDevelopment);
        record.budget = Some(5_000_000);

        let missing = missing_fields(&record);
        assert_eq!(missing.first(), Some(&FieldId::People));
        assert!(!missing.contains(&FieldId::Budget));
        assert!(!missing.contains(&FieldId::MarketingChannels));
    }

    #[test]
    fn empty_channel_set_counts_as_missing() {
        let mut record = record();
        record.project_type = Some(ProjectType::Marketing);
        record.budget = Some(1);
        record.people = Some(1);
        record.capital = Some(1);
        record.revenue = Some(1);
        record.has_certification = Some(false);
        record.has_gov_award = Some(false);
        record.is_mit = Some(false);
        record.has_industry_academia = Some(false);
        record.has_factory_registration = Some(false);

        assert_eq!(
            missing_fields(&record),
            vec![FieldId::MarketingChannels, FieldId::GrowthRevenue]
        );

        record.marketing_channels = BTreeSet::from([MarketingChannel::Export]);
        record.growth_revenue = Some(0);
        assert!(missing_fields(&record).is_empty());
    }
}

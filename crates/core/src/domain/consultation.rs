use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::SessionId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsultationId(pub String);

impl ConsultationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    ResearchAndDevelopment,
    Marketing,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResearchAndDevelopment => "RESEARCH_AND_DEVELOPMENT",
            Self::Marketing => "MARKETING",
        }
    }
}

impl std::str::FromStr for ProjectType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "RESEARCH_AND_DEVELOPMENT" => Ok(Self::ResearchAndDevelopment),
            "MARKETING" => Ok(Self::Marketing),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown project type `{other}`")))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketingChannel {
    Domestic,
    Export,
}

impl MarketingChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "DOMESTIC",
            Self::Export => "EXPORT",
        }
    }
}

impl std::str::FromStr for MarketingChannel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DOMESTIC" => Ok(Self::Domestic),
            "EXPORT" => Ok(Self::Export),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown marketing channel `{other}`")))
            }
        }
    }
}

/// The five fixed eligibility flags that feed the bonus step of the grant
/// formula. Order matters: per-item amounts are mapped positionally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BonusItem {
    Certification,
    GovAward,
    Mit,
    IndustryAcademia,
    FactoryRegistration,
}

impl BonusItem {
    pub const ALL: [BonusItem; 5] = [
        BonusItem::Certification,
        BonusItem::GovAward,
        BonusItem::Mit,
        BonusItem::IndustryAcademia,
        BonusItem::FactoryRegistration,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Certification => "third-party product/service certification",
            Self::GovAward => "government award",
            Self::Mit => "MIT-certified manufacturing",
            Self::IndustryAcademia => "industry-academia collaboration",
            Self::FactoryRegistration => "factory registration",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    Collecting,
    AwaitingConfirmation,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "COLLECTING",
            Self::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for ConsultationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "COLLECTING" => Ok(Self::Collecting),
            "AWAITING_CONFIRMATION" => Ok(Self::AwaitingConfirmation),
            "COMPLETED" => Ok(Self::Completed),
            other => {
                Err(DomainError::InvariantViolation(format!("unknown consultation status `{other}`")))
            }
        }
    }
}

/// Government programs the engine can recommend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanId {
    LocalSbir,
    Citd,
    CentralSbir,
    ExportMarketDev,
    DomesticMarketPromo,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalSbir => "LOCAL_SBIR",
            Self::Citd => "CITD",
            Self::CentralSbir => "CENTRAL_SBIR",
            Self::ExportMarketDev => "EXPORT_MARKET_DEV",
            Self::DomesticMarketPromo => "DOMESTIC_MARKET_PROMO",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LocalSbir => "Local SBIR",
            Self::Citd => "CITD",
            Self::CentralSbir => "Central SBIR",
            Self::ExportMarketDev => "Export Market Development Program",
            Self::DomesticMarketPromo => "Domestic Market Promotion Program",
        }
    }
}

impl std::str::FromStr for PlanId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOCAL_SBIR" => Ok(Self::LocalSbir),
            "CITD" => Ok(Self::Citd),
            "CENTRAL_SBIR" => Ok(Self::CentralSbir),
            "EXPORT_MARKET_DEV" => Ok(Self::ExportMarketDev),
            "DOMESTIC_MARKET_PROMO" => Ok(Self::DomesticMarketPromo),
            other => Err(DomainError::InvariantViolation(format!("unknown plan id `{other}`"))),
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subsidy inquiry: everything collected over a conversation plus the
/// calculation results once the data set is confirmed.
///
/// Amounts are integers in the base currency unit. Unit conversion from the
/// "ten-thousand" figures users speak in happens at the extractor boundary;
/// by the time a value lands here it is already normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: ConsultationId,
    pub session_id: SessionId,
    pub project_type: Option<ProjectType>,
    pub budget: Option<i64>,
    pub people: Option<i64>,
    pub capital: Option<i64>,
    pub revenue: Option<i64>,
    pub growth_revenue: Option<i64>,
    pub has_certification: Option<bool>,
    pub has_gov_award: Option<bool>,
    pub is_mit: Option<bool>,
    pub has_industry_academia: Option<bool>,
    pub has_factory_registration: Option<bool>,
    /// Derived: count of bonus flags answered `true`. Never set by an intent.
    pub bonus_count: u8,
    /// Derived: the bonus items whose flags are `true`, in positional order.
    pub bonus_details: Vec<BonusItem>,
    pub marketing_channels: BTreeSet<MarketingChannel>,
    pub data_confirmed: bool,
    pub grant_min: Option<i64>,
    pub grant_max: Option<i64>,
    pub recommended_plans: Vec<PlanId>,
    pub status: ConsultationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationRecord {
    pub fn new(id: ConsultationId, session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            session_id,
            project_type: None,
            budget: None,
            people: None,
            capital: None,
            revenue: None,
            growth_revenue: None,
            has_certification: None,
            has_gov_award: None,
            is_mit: None,
            has_industry_academia: None,
            has_factory_registration: None,
            bonus_count: 0,
            bonus_details: Vec::new(),
            marketing_channels: BTreeSet::new(),
            data_confirmed: false,
            grant_min: None,
            grant_max: None,
            recommended_plans: Vec::new(),
            status: ConsultationStatus::Collecting,
            created_at: now,
            updated_at: now,
        }
    }

    /// New-session-with-memory: copy every non-derived answer from a prior
    /// record, but never the confirmation flag, results, or status.
    pub fn carried_over_from(
        source: &ConsultationRecord,
        id: ConsultationId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::new(id, session_id, now);
        record.project_type = source.project_type;
        record.budget = source.budget;
        record.people = source.people;
        record.capital = source.capital;
        record.revenue = source.revenue;
        record.growth_revenue = source.growth_revenue;
        record.has_certification = source.has_certification;
        record.has_gov_award = source.has_gov_award;
        record.is_mit = source.is_mit;
        record.has_industry_academia = source.has_industry_academia;
        record.has_factory_registration = source.has_factory_registration;
        record.marketing_channels = source.marketing_channels.clone();
        record.recompute_bonus();
        record
    }

    pub fn bonus_flag(&self, item: BonusItem) -> Option<bool> {
        match item {
            BonusItem::Certification => self.has_certification,
            BonusItem::GovAward => self.has_gov_award,
            BonusItem::Mit => self.is_mit,
            BonusItem::IndustryAcademia => self.has_industry_academia,
            BonusItem::FactoryRegistration => self.has_factory_registration,
        }
    }

    /// Re-derive `bonus_count` and `bonus_details` from the five flags.
    /// Must be called after every mutation of a bonus flag.
    pub fn recompute_bonus(&mut self) {
        let details: Vec<BonusItem> = BonusItem::ALL
            .into_iter()
            .filter(|item| self.bonus_flag(*item) == Some(true))
            .collect();
        self.bonus_count = details.len() as u8;
        self.bonus_details = details;
    }
}

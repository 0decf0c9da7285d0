pub mod calculator;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod intents;
pub mod orchestrator;
pub mod progress;
pub mod registry;

pub use calculator::{calculate, CalculationBreakdown, CalculationResult};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::consultation::{
    BonusItem, ConsultationId, ConsultationRecord, ConsultationStatus, MarketingChannel, PlanId,
    ProjectType,
};
pub use domain::session::{
    ChatMessage, ChatSession, MessageId, MessageRole, SessionId, SessionStatus, User, UserId,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use export::{export_rows, ExportRow};
pub use intents::{ApplyOutcome, FieldRejection, FieldUpdate, RejectReason, UpdateIntent};
pub use orchestrator::{handle_turn, TurnOutcome};
pub use progress::{next_action, Action};
pub use registry::{missing_fields, required_fields, FieldId};

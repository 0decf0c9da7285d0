use async_trait::async_trait;
use thiserror::Error;

use grantline_core::domain::consultation::{ConsultationId, ConsultationRecord};
use grantline_core::domain::session::{ChatMessage, ChatSession, SessionId, User, UserId};

pub mod consultation;
pub mod memory;
pub mod session;

pub use consultation::SqlConsultationRepository;
pub use memory::{
    InMemoryConsultationRepository, InMemoryMessageRepository, InMemorySessionRepository,
    InMemoryUserRepository,
};
pub use session::{SqlMessageRepository, SqlSessionRepository, SqlUserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError>;
    async fn find_latest_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ChatSession>, RepositoryError>;
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ChatSession>, RepositoryError>;
    async fn save(&self, session: ChatSession) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
    async fn append(&self, message: ChatMessage) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ConsultationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConsultationId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError>;
    async fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError>;
    async fn save(&self, record: ConsultationRecord) -> Result<(), RepositoryError>;
}

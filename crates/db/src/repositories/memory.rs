use std::collections::HashMap;

use tokio::sync::RwLock;

use grantline_core::domain::consultation::{ConsultationId, ConsultationRecord};
use grantline_core::domain::session::{ChatMessage, ChatSession, SessionId, User, UserId};

use super::{
    ConsultationRepository, MessageRepository, RepositoryError, SessionRepository, UserRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id.0).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn find_latest_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|session| session.user_id == *user_id)
            .max_by_key(|session| (session.created_at, session.id.0.clone()))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ChatSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<ChatSession> =
            sessions.values().filter(|session| session.user_id == *user_id).cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
        Ok(result)
    }

    async fn save(&self, session: ChatSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.0.clone(), session);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<ChatMessage>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|m| m.session_id == *session_id).cloned().collect())
    }

    async fn append(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.push(message);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryConsultationRepository {
    records: RwLock<HashMap<String, ConsultationRecord>>,
}

#[async_trait::async_trait]
impl ConsultationRepository for InMemoryConsultationRepository {
    async fn find_by_id(
        &self,
        id: &ConsultationId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.values().find(|record| record.session_id == *session_id).cloned())
    }

    async fn save(&self, record: ConsultationRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.id.0.clone(), record);
        Ok(())
    }
}

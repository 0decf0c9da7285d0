use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};

use grantline_core::domain::consultation::{
    ConsultationId, ConsultationRecord, ConsultationStatus, MarketingChannel, PlanId, ProjectType,
};
use grantline_core::domain::session::{
    ChatMessage, ChatSession, MessageRole, SessionId, User, UserId,
};
use grantline_db::repositories::{
    ConsultationRepository, MessageRepository, SessionRepository, SqlConsultationRepository,
    SqlMessageRepository, SqlSessionRepository, SqlUserRepository, UserRepository,
};
use grantline_db::{connect_with_settings, migrations, DbPool};

async fn test_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
}

async fn seed_user_and_session(pool: &DbPool) -> (UserId, SessionId) {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("timestamp");
    let user = User::new(UserId("u-1".to_string()), "alice", "user", now);
    SqlUserRepository::new(pool.clone()).save(user.clone()).await.expect("save user");

    let session = ChatSession::new(SessionId("s-1".to_string()), user.id.clone(), now);
    SqlSessionRepository::new(pool.clone()).save(session.clone()).await.expect("save session");

    (user.id, session.id)
}

#[tokio::test]
async fn completed_consultation_round_trips_exactly() {
    let pool = test_pool().await;
    let (_, session_id) = seed_user_and_session(&pool).await;

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).single().expect("timestamp");
    let mut record =
        ConsultationRecord::new(ConsultationId("c-1".to_string()), session_id, now);
    record.project_type = Some(ProjectType::Marketing);
    record.budget = Some(5_000_000);
    record.people = Some(20);
    record.capital = Some(10_000_000);
    record.revenue = Some(50_000_000);
    record.growth_revenue = Some(8_000_000);
    record.has_certification = Some(true);
    record.has_gov_award = Some(false);
    record.is_mit = Some(true);
    record.has_industry_academia = Some(true);
    record.has_factory_registration = Some(false);
    record.marketing_channels =
        BTreeSet::from([MarketingChannel::Domestic, MarketingChannel::Export]);
    record.recompute_bonus();
    record.data_confirmed = true;
    record.status = ConsultationStatus::Completed;
    record.grant_min = Some(2_775_000);
    record.grant_max = Some(3_700_000);
    record.recommended_plans = vec![PlanId::ExportMarketDev, PlanId::DomesticMarketPromo];

    let repo = SqlConsultationRepository::new(pool.clone());
    repo.save(record.clone()).await.expect("save record");

    let loaded = repo.find_by_id(&record.id).await.expect("load record");
    assert_eq!(loaded, Some(record.clone()));

    let by_session = repo.find_by_session(&record.session_id).await.expect("load by session");
    assert_eq!(by_session, Some(record));
}

#[tokio::test]
async fn partially_collected_consultation_round_trips() {
    let pool = test_pool().await;
    let (_, session_id) = seed_user_and_session(&pool).await;

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 10, 0).single().expect("timestamp");
    let mut record =
        ConsultationRecord::new(ConsultationId("c-2".to_string()), session_id, now);
    record.project_type = Some(ProjectType::ResearchAndDevelopment);
    record.budget = Some(1_000_000);
    record.has_certification = Some(true);
    record.recompute_bonus();

    let repo = SqlConsultationRepository::new(pool.clone());
    repo.save(record.clone()).await.expect("save record");

    let loaded = repo.find_by_id(&record.id).await.expect("load record");
    assert_eq!(loaded, Some(record));
}

#[tokio::test]
async fn saving_twice_updates_in_place() {
    let pool = test_pool().await;
    let (_, session_id) = seed_user_and_session(&pool).await;

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 15, 0).single().expect("timestamp");
    let mut record =
        ConsultationRecord::new(ConsultationId("c-3".to_string()), session_id, now);
    let repo = SqlConsultationRepository::new(pool.clone());
    repo.save(record.clone()).await.expect("first save");

    record.budget = Some(7_000_000);
    record.updated_at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 20, 0).single().expect("timestamp");
    repo.save(record.clone()).await.expect("second save");

    let loaded = repo.find_by_id(&record.id).await.expect("load record");
    assert_eq!(loaded, Some(record));
}

#[tokio::test]
async fn session_listing_and_transcript_round_trip() {
    let pool = test_pool().await;
    let (user_id, session_id) = seed_user_and_session(&pool).await;

    let sessions = SqlSessionRepository::new(pool.clone());
    let later = Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).single().expect("timestamp");
    let second = ChatSession::new(SessionId("s-2".to_string()), user_id.clone(), later);
    sessions.save(second.clone()).await.expect("save second session");

    let latest = sessions.find_latest_for_user(&user_id).await.expect("latest");
    assert_eq!(latest.map(|s| s.id), Some(second.id.clone()));

    let listed = sessions.list_for_user(&user_id).await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);

    let messages = SqlMessageRepository::new(pool.clone());
    let t0 = Utc.with_ymd_and_hms(2025, 3, 2, 10, 1, 0).single().expect("timestamp");
    let t1 = Utc.with_ymd_and_hms(2025, 3, 2, 10, 2, 0).single().expect("timestamp");
    messages
        .append(ChatMessage::new(session_id.clone(), MessageRole::User, "hello", t0))
        .await
        .expect("append user message");
    messages
        .append(ChatMessage::new(
            session_id.clone(),
            MessageRole::Assistant,
            "welcome",
            t1,
        ))
        .await
        .expect("append assistant message");

    let transcript = messages.list_for_session(&session_id).await.expect("transcript");
    let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hello", "welcome"]);
    assert_eq!(transcript[0].role, MessageRole::User);
    assert_eq!(transcript[1].role, MessageRole::Assistant);
}

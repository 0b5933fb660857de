use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::CourseSession,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: CourseSession) -> AppResult<CourseSession>;
    async fn lookup(&self, session_id: &str) -> AppResult<Option<CourseSession>>;
    /// Returns whether a session was removed.
    async fn delete(&self, session_id: &str) -> AppResult<bool>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, CourseSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: CourseSession) -> AppResult<CourseSession> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(AppError::AlreadyExists(format!(
                "Session '{}' already exists",
                session.session_id
            )));
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    async fn lookup(&self, session_id: &str) -> AppResult<Option<CourseSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> AppResult<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

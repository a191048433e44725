use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub questions_total: u32,
    pub questions_correct: u32,
}

impl Store {
    pub fn start_session(&self) -> Result<TrainingSession, StoreError> {
        let session = TrainingSession {
            id: self.next_id()?,
            started_at: Utc::now(),
            ended_at: None,
            questions_total: 0,
            questions_correct: 0,
        };
        let key = keys::session_key(session.id);
        self.sessions
            .insert(key.as_bytes(), Self::serialize(&session)?)?;
        Ok(session)
    }

    pub fn end_session(&self, session_id: i64, total: u32, correct: u32) -> Result<(), StoreError> {
        let key = keys::session_key(session_id);
        let raw = self
            .sessions
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::not_found("session", &key))?;
        let mut session: TrainingSession = Self::deserialize(&raw)?;
        session.ended_at = Some(Utc::now());
        session.questions_total = total;
        session.questions_correct = correct;
        self.sessions
            .insert(key.as_bytes(), Self::serialize(&session)?)?;
        Ok(())
    }

    pub fn get_session(&self, session_id: i64) -> Result<Option<TrainingSession>, StoreError> {
        let key = keys::session_key(session_id);
        match self.sessions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Newest sessions first.
    pub fn get_session_history(&self, limit: usize) -> Result<Vec<TrainingSession>, StoreError> {
        let mut out = Vec::new();
        for item in self.sessions.iter().rev() {
            let (_, v) = item?;
            out.push(Self::deserialize::<TrainingSession>(&v)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    pub fn count_sessions(&self) -> Result<u64, StoreError> {
        Ok(self.sessions.len() as u64)
    }
}

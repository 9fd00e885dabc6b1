use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use crate::RequestId;

/// How correlation ids are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdStyle {
    #[default]
    Sequential,
    Uuid,
}

/// Generates ids for outgoing requests.
///
/// Every request runs in its own process, so ids only have to be readable
/// in logs. Uniqueness across requests is not required.
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicI64,
    style: IdStyle,
}

impl IdGenerator {
    pub fn new(style: IdStyle) -> Self {
        Self::with_start_value(style, 1)
    }

    /// Create a generator whose first sequential id is `start_value`
    pub fn with_start_value(style: IdStyle, start_value: i64) -> Self {
        Self {
            counter: AtomicI64::new(start_value),
            style,
        }
    }

    pub fn new_sequential() -> Self {
        Self::new(IdStyle::Sequential)
    }

    pub fn new_uuid() -> Self {
        Self::new(IdStyle::Uuid)
    }

    pub fn next_id(&self) -> RequestId {
        match self.style {
            IdStyle::Uuid => RequestId::String(Uuid::new_v4().to_string()),
            IdStyle::Sequential => RequestId::Number(self.counter.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new_sequential()
    }
}

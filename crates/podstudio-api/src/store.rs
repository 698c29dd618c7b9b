//! In-memory record store
//!
//! Users get auto-increment numeric ids and a uniqueness constraint on
//! `email`. Podcasts and episodes get UUIDs. Nothing is persisted.

use chrono::{DateTime, Utc};
use podstudio_forms::{catalog, FormDefinition, ResourceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

/// Record collections served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Podcast,
    Episode,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::User, ResourceKind::Podcast, ResourceKind::Episode];

    /// Id of the catalog form whose schema guards this collection
    pub fn form_id(&self) -> &'static str {
        match self {
            ResourceKind::User => "registration",
            ResourceKind::Podcast => "podcast",
            ResourceKind::Episode => "episode",
        }
    }

    /// URL segment under `/api`
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::User => "users",
            ResourceKind::Podcast => "podcasts",
            ResourceKind::Episode => "episodes",
        }
    }

    pub fn definition(&self) -> FormDefinition {
        match self {
            ResourceKind::User => catalog::registration(),
            ResourceKind::Podcast => catalog::podcast(),
            ResourceKind::Episode => catalog::episode(),
        }
    }

}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::User => write!(f, "user"),
            ResourceKind::Podcast => write!(f, "podcast"),
            ResourceKind::Episode => write!(f, "episode"),
        }
    }
}

/// Store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },
}

/// One stored record
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Response body: the stored fields plus `id` and timestamps
    pub fn to_json(&self) -> Value {
        let mut body = match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let id = match self.kind {
            ResourceKind::User => self
                .id
                .as_str()
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(self.id.as_str())),
            _ => Value::from(self.id.as_str()),
        };
        body.insert("id".to_string(), id);
        body.insert("createdAt".to_string(), Value::from(self.created_at.to_rfc3339()));
        body.insert("updatedAt".to_string(), Value::from(self.updated_at.to_rfc3339()));
        Value::Object(body)
    }
}

/// Filter and window for [`Store::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Keep only records whose `status` field equals this value
    pub status: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

impl ListQuery {
    pub const MAX_LIMIT: usize = 100;
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            skip: 0,
            limit: Self::MAX_LIMIT,
        }
    }
}

struct Stored {
    seq: u64,
    record: Record,
}

#[derive(Default)]
struct Tables {
    next_user_id: u64,
    next_seq: u64,
    records: BTreeMap<(ResourceKind, String), Stored>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<&str>) -> bool {
        self.records.values().any(|stored| {
            let r = &stored.record;
            r.kind == ResourceKind::User
                && Some(r.id.as_str()) != except
                && r.data.get("email").and_then(Value::as_str) == Some(email)
        })
    }
}

/// Shared in-memory store
#[derive(Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, kind: ResourceKind, data: Value) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;

        let id = match kind {
            ResourceKind::User => {
                if let Some(email) = data.get("email").and_then(Value::as_str) {
                    if tables.email_taken(email, None) {
                        return Err(StoreError::DuplicateEmail);
                    }
                }
                tables.next_user_id += 1;
                ResourceId::from(tables.next_user_id)
            }
            _ => ResourceId::new(uuid::Uuid::new_v4().to_string()),
        };

        let now = Utc::now();
        let record = Record {
            id: id.clone(),
            kind,
            data,
            created_at: now,
            updated_at: now,
        };
        tables.next_seq += 1;
        let seq = tables.next_seq;
        tables.records.insert(
            (kind, id.as_str().to_string()),
            Stored {
                seq,
                record: record.clone(),
            },
        );

        tracing::debug!(kind = %kind, id = %id, "Record inserted");
        Ok(record)
    }

    /// Replace the data of an existing record
    ///
    /// An unknown id is reported as `NotFound` before the body is looked at.
    pub async fn replace(&self, kind: ResourceKind, id: &str, data: Value) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (kind, id.to_string());

        if !tables.records.contains_key(&key) {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        if kind == ResourceKind::User {
            if let Some(email) = data.get("email").and_then(Value::as_str) {
                if tables.email_taken(email, Some(id)) {
                    return Err(StoreError::DuplicateEmail);
                }
            }
        }

        let record = tables
            .records
            .get_mut(&key)
            .map(|stored| &mut stored.record)
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        record.data = data;
        record.updated_at = Utc::now();

        tracing::debug!(kind = %kind, id, "Record replaced");
        Ok(record.clone())
    }

    pub async fn get(&self, kind: ResourceKind, id: &str) -> Result<Record, StoreError> {
        self.tables
            .read()
            .await
            .records
            .get(&(kind, id.to_string()))
            .map(|stored| stored.record.clone())
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    /// Records of `kind` in insertion order, filtered and windowed by `query`
    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Vec<Record> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Stored> = tables
            .records
            .range((kind, String::new())..)
            .take_while(|((k, _), _)| *k == kind)
            .map(|(_, stored)| stored)
            .filter(|stored| match &query.status {
                Some(status) => {
                    stored.record.data.get("status").and_then(Value::as_str) == Some(status.as_str())
                }
                None => true,
            })
            .collect();
        matching.sort_by_key(|stored| stored.seq);

        matching
            .into_iter()
            .skip(query.skip)
            .take(query.limit.min(ListQuery::MAX_LIMIT))
            .map(|stored| stored.record.clone())
            .collect()
    }

    /// Delete a record, returning what was stored
    pub async fn remove(&self, kind: ResourceKind, id: &str) -> Result<Record, StoreError> {
        let removed = self
            .tables
            .write()
            .await
            .records
            .remove(&(kind, id.to_string()))
            .map(|stored| stored.record)
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        tracing::debug!(kind = %kind, id, "Record removed");
        Ok(removed)
    }

    pub async fn count(&self, kind: ResourceKind) -> usize {
        self.tables
            .read()
            .await
            .records
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_user_ids_increment_and_emails_are_unique() {
        let store = Store::new();
        let first = store
            .insert(ResourceKind::User, json!({"email": "alex@example.com"}))
            .await
            .unwrap();
        let second = store
            .insert(ResourceKind::User, json!({"email": "maria@example.com"}))
            .await
            .unwrap();
        assert_eq!(first.id.as_str(), "1");
        assert_eq!(second.id.as_str(), "2");

        let err = store
            .insert(ResourceKind::User, json!({"email": "alex@example.com"}))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateEmail);
        assert_eq!(store.count(ResourceKind::User).await, 2);
    }

    #[tokio::test]
    async fn test_replace_keeps_own_email() {
        let store = Store::new();
        store
            .insert(ResourceKind::User, json!({"email": "alex@example.com", "name": "Alex"}))
            .await
            .unwrap();
        store
            .insert(ResourceKind::User, json!({"email": "maria@example.com"}))
            .await
            .unwrap();

        let updated = store
            .replace(ResourceKind::User, "1", json!({"email": "alex@example.com", "name": "Alexander"}))
            .await
            .unwrap();
        assert_eq!(updated.data["name"], "Alexander");

        let err = store
            .replace(ResourceKind::User, "1", json!({"email": "maria@example.com"}))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateEmail);
    }

    #[tokio::test]
    async fn test_podcasts_use_uuids_and_missing_ids_are_not_found() {
        let store = Store::new();
        let record = store
            .insert(ResourceKind::Podcast, json!({"title": "Tech Talks"}))
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(record.id.as_str()).is_ok());

        let err = store.get(ResourceKind::Podcast, "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "podcast 'missing' not found");
        assert!(store.get(ResourceKind::Episode, record.id.as_str()).await.is_err());
    }

    #[test]
    fn test_record_json_carries_numeric_user_id() {
        let now = Utc::now();
        let record = Record {
            id: ResourceId::from(3u64),
            kind: ResourceKind::User,
            data: json!({"name": "Alex"}),
            created_at: now,
            updated_at: now,
        };
        let body = record.to_json();
        assert_eq!(body["id"], json!(3));
        assert_eq!(body["name"], "Alex");
    }

    #[tokio::test]
    async fn test_replace_unknown_id_is_not_found_even_with_taken_email() {
        let store = Store::new();
        store
            .insert(ResourceKind::User, json!({"email": "alex@example.com"}))
            .await
            .unwrap();

        let err = store
            .replace(ResourceKind::User, "99", json!({"email": "alex@example.com"}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: ResourceKind::User,
                id: "99".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order_and_filters_status() {
        let store = Store::new();
        for (title, status) in [("One", "draft"), ("Two", "published"), ("Three", "draft")] {
            store
                .insert(ResourceKind::Episode, json!({"title": title, "status": status}))
                .await
                .unwrap();
        }
        store
            .insert(ResourceKind::Podcast, json!({"title": "Elsewhere"}))
            .await
            .unwrap();

        let titles = |records: Vec<Record>| -> Vec<String> {
            records
                .into_iter()
                .map(|r| r.data["title"].as_str().unwrap().to_string())
                .collect()
        };

        let all = store.list(ResourceKind::Episode, &ListQuery::default()).await;
        assert_eq!(titles(all), ["One", "Two", "Three"]);

        let drafts = ListQuery {
            status: Some("draft".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(store.list(ResourceKind::Episode, &drafts).await), ["One", "Three"]);

        let window = ListQuery {
            skip: 1,
            limit: 1,
            ..Default::default()
        };
        assert_eq!(titles(store.list(ResourceKind::Episode, &window).await), ["Two"]);
    }

    #[tokio::test]
    async fn test_remove_deletes_once() {
        let store = Store::new();
        let record = store
            .insert(ResourceKind::Podcast, json!({"title": "Tech Talks"}))
            .await
            .unwrap();

        let removed = store.remove(ResourceKind::Podcast, record.id.as_str()).await.unwrap();
        assert_eq!(removed.id, record.id);
        assert_eq!(store.count(ResourceKind::Podcast).await, 0);
        assert!(matches!(
            store.remove(ResourceKind::Podcast, record.id.as_str()).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_kind_routing() {
        assert_eq!(ResourceKind::User.collection(), "users");
        assert_eq!(ResourceKind::Episode.form_id(), "episode");
    }
}

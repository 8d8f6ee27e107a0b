//! Stored response CRUD within a generation.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Response type as the fetch layer classified it.
///
/// Only `Basic` responses are eligible for background revalidation writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin, fully readable.
    Basic,
    /// Cross-origin but readable (e.g. after a redirect off-origin).
    Cors,
    /// Cross-origin and unreadable.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// Immutable snapshot of a successful response at the time it was stored.
///
/// Carries no expiry: staleness is only ever decided by whether a newer
/// fetch replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheDb {
    /// Insert or replace the entry for `key_hash` in generation `tag`.
    ///
    /// The generation must already exist; a write into a deleted
    /// generation fails with `Error::GenerationMissing` instead of bringing
    /// it back. Last write wins.
    pub async fn put_entry(&self, tag: &str, key_hash: &str, response: &StoredResponse) -> Result<(), Error> {
        let tag = tag.to_string();
        let key_hash = key_hash.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE tag = ?1)",
                    params![&tag],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(Error::GenerationMissing(tag));
                }
                conn.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, status,
                        response_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &tag,
                        &key_hash,
                        &response.method,
                        &response.url,
                        response.status,
                        response.response_type.as_str(),
                        &headers_json,
                        &response.body,
                        &response.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `key_hash` in generation `tag`.
    ///
    /// Returns None if either the generation or the entry is missing.
    pub async fn match_entry(&self, tag: &str, key_hash: &str) -> Result<Option<StoredResponse>, Error> {
        let tag = tag.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, method, status, response_type, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![tag, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((url, method, status, response_type, headers_json, body, stored_at)) => {
                        Ok(Some(StoredResponse {
                            url,
                            method,
                            status,
                            response_type: ResponseType::parse(&response_type)?,
                            headers: serde_json::from_str(&headers_json)?,
                            body,
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in generation `tag`.
    pub async fn count_entries(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

//! Request/response entries stored inside partitions.
//!
//! Entries are keyed by [`compute_cache_key`] over the normalized request.
//! A `put` for an existing key replaces the stored response and moves it to
//! the end of the partition's storage order.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response ready to be written into a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// An entry as read back from a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub partition: String,
    pub key: String,
    pub stored_at: String,
    pub response: StoredResponse,
}

struct EncodedEntry {
    key: String,
    method: String,
    url: String,
    status_code: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EncodedEntry {
    fn encode(response: StoredResponse) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&response.headers)?;
        Ok(Self {
            key: compute_cache_key(&response.method, &response.url),
            method: response.method.to_ascii_uppercase(),
            url: response.url,
            status_code: response.status_code,
            headers_json,
            body: response.body,
        })
    }
}

/// Write one entry, creating the partition on first use.
fn insert_entry(
    conn: &rusqlite::Connection, partition: &str, entry: &EncodedEntry, now: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, now],
    )?;
    conn.execute(
        "INSERT INTO entries (
            partition, key_hash, method, url, status_code, headers_json, body, stored_at, seq
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, (SELECT COALESCE(MAX(seq), 0) + 1 FROM entries))
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at,
            seq = excluded.seq",
        params![
            partition,
            &entry.key,
            &entry.method,
            &entry.url,
            entry.status_code,
            &entry.headers_json,
            &entry.body,
            now,
        ],
    )?;
    Ok(())
}

struct RawEntry {
    partition: String,
    key: String,
    method: String,
    url: String,
    status_code: u16,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

const SELECT_ENTRY: &str = "SELECT partition, key_hash, method, url, status_code, headers_json, body, stored_at
    FROM entries";

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        partition: row.get(0)?,
        key: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        status_code: row.get(4)?,
        headers_json: row.get(5)?,
        body: row.get(6)?,
        stored_at: row.get(7)?,
    })
}

impl RawEntry {
    fn decode(self) -> Result<CacheEntry, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        Ok(CacheEntry {
            partition: self.partition,
            key: self.key,
            stored_at: self.stored_at,
            response: StoredResponse {
                method: self.method,
                url: self.url,
                status_code: self.status_code,
                headers,
                body: self.body,
            },
        })
    }
}

impl CacheDb {
    /// Store a response, replacing any entry for the same request.
    ///
    /// The partition is created if it does not exist yet.
    pub async fn put_entry(&self, partition: &str, response: StoredResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let entry = EncodedEntry::encode(response)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_entry(&tx, &partition, &entry, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of responses atomically: either all land or none do.
    pub async fn put_entries(&self, partition: &str, responses: Vec<StoredResponse>) -> Result<usize, Error> {
        let partition = partition.to_string();
        let entries = responses
            .into_iter()
            .map(EncodedEntry::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                for entry in &entries {
                    insert_entry(&tx, &partition, entry, &now)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for a request in one partition.
    ///
    /// A missing partition is a miss, not an error, and is not created.
    pub async fn match_entry(&self, partition: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_ENTRY} WHERE partition = ?1 AND key_hash = ?2"))?;
                match stmt.query_row(params![partition, key], read_raw) {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request across all partitions, oldest partition first.
    pub async fn match_any(&self, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let key = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.partition, e.key_hash, e.method, e.url, e.status_code, e.headers_json, e.body, e.stored_at
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.rowid ASC
                     LIMIT 1",
                )?;
                match stmt.query_row(params![key], read_raw) {
                    Ok(raw) => raw.decode().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of the entries in a partition, in storage order.
    pub async fn entry_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY seq ASC")?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

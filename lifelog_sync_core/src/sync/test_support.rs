#![cfg(test)]

use crate::sync::traits::{Filestore, PageRequest, PageTransport};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Builds a response envelope holding records `first_id..first_id + count`.
pub(crate) fn envelope(first_id: usize, count: usize, next_cursor: Option<&str>) -> serde_json::Value {
    let records: Vec<serde_json::Value> = (first_id..first_id + count)
        .map(|id| serde_json::json!({ "id": id }))
        .collect();
    serde_json::json!({
        "data": { "lifelogs": records },
        "meta": { "lifelogs": { "nextCursor": next_cursor, "count": count } },
    })
}

/// Envelopes for consecutive pages of the given sizes, cursors `c1`, `c2`, ...
/// and a null cursor on the last page.
pub(crate) fn pages(sizes: &[usize]) -> Vec<Result<serde_json::Value>> {
    let mut next_id = 0;
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            let cursor = (i + 1 < sizes.len()).then(|| format!("c{}", i + 1));
            let body = envelope(next_id, size, cursor.as_deref());
            next_id += size;
            Ok(body)
        })
        .collect()
}

pub(crate) fn unavailable() -> Result<serde_json::Value> {
    Err(Error::HttpStatus {
        status: 503,
        body: "service unavailable".to_string(),
    })
}

/// Replays scripted responses in order and records every request it sees.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<serde_json::Value>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<serde_json::Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageTransport for ScriptedTransport {
    async fn get_page(&self, request: &PageRequest) -> Result<serde_json::Value> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::BackendMessage("script exhausted".to_string())))
    }
}

/// In-memory filestore; writes to keys containing any of `fail_on` fail.
#[derive(Default)]
pub(crate) struct MemoryFilestore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_on: HashSet<String>,
}

impl MemoryFilestore {
    pub(crate) fn failing_on(fragments: &[&str]) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            fail_on: fragments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Record ids in key order, i.e. chunk order.
    pub(crate) fn stored_ids(&self) -> Vec<u64> {
        let objects = self.objects.lock().unwrap();
        objects
            .values()
            .flat_map(|body| {
                let items: Vec<serde_json::Value> = serde_json::from_slice(body).unwrap();
                items
                    .into_iter()
                    .map(|item| item["id"].as_u64().unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Raw object bodies in key order.
    pub(crate) fn bodies(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .values()
            .map(|body| String::from_utf8(body.to_vec()).unwrap())
            .collect()
    }

    pub(crate) fn chunk_sizes(&self) -> Vec<usize> {
        let objects = self.objects.lock().unwrap();
        objects
            .values()
            .map(|body| {
                serde_json::from_slice::<Vec<serde_json::Value>>(body)
                    .unwrap()
                    .len()
            })
            .collect()
    }
}

#[async_trait]
impl Filestore for MemoryFilestore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        if self.fail_on.iter().any(|frag| key.contains(frag.as_str())) {
            return Err(Error::BackendMessage(format!("injected write failure for {key}")));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

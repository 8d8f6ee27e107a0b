//! Scripted in-process network for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use edge_cache_core::{CacheDb, Error, GenerationManager, ResponseType};
use reqwest::{StatusCode, header};

use crate::fetch::{CacheMode, FetchResponse, Network};
use crate::request::EdgeRequest;

#[derive(Clone)]
enum Script {
    Respond { status: u16, body: &'static str, response_type: ResponseType },
    Fail,
}

/// Holds fetches until opened; once open it stays open.
pub(crate) struct Gate(tokio::sync::watch::Sender<bool>);

impl Gate {
    pub(crate) fn open(&self) {
        self.0.send_replace(true);
    }
}

/// Answers fetches from a per-URL script; unscripted URLs are offline.
#[derive(Default)]
pub(crate) struct MockNetwork {
    scripts: Mutex<HashMap<String, Script>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: &'static str) {
        self.set(url, Script::Respond { status, body, response_type: ResponseType::Basic });
    }

    pub(crate) fn respond_cross_origin(&self, url: &str, status: u16, body: &'static str) {
        self.set(url, Script::Respond { status, body, response_type: ResponseType::Cors });
    }

    pub(crate) fn fail(&self, url: &str) {
        self.set(url, Script::Fail);
    }

    /// Hold fetches of `url` until the returned gate is opened.
    pub(crate) fn gate(&self, url: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate(tokio::sync::watch::Sender::new(false)));
        self.gates.lock().unwrap().insert(url.to_string(), gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<(String, CacheMode)> {
        self.calls.lock().unwrap().clone()
    }

    fn set(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &EdgeRequest, mode: CacheMode) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push((url.clone(), mode));

        let gate = self.gates.lock().unwrap().get(&url).cloned();
        if let Some(gate) = gate {
            let mut open = gate.0.subscribe();
            let _ = open.wait_for(|open| *open).await;
        }

        let script = self.scripts.lock().unwrap().get(&url).cloned();
        match script {
            Some(Script::Respond { status, body, response_type }) => {
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
                Ok(FetchResponse {
                    url: request.url.clone(),
                    final_url: request.url.clone(),
                    status: StatusCode::from_u16(status).unwrap(),
                    response_type,
                    headers,
                    bytes: Bytes::from_static(body.as_bytes()),
                    fetch_ms: 1,
                })
            }
            Some(Script::Fail) | None => Err(Error::NetworkFailed(format!("{url}: offline"))),
        }
    }
}

/// In-memory manager whose generation has already been created.
pub(crate) async fn manager(tag: &str) -> Arc<GenerationManager> {
    let db = CacheDb::open_in_memory().await.unwrap();
    let manager = GenerationManager::new(db, tag);
    manager.create_generation(tag).await.unwrap();
    Arc::new(manager)
}

//! Open consumers and the generation each one is served by.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

/// An open consumer of the application's origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    /// Generation serving this client; None when uncontrolled.
    pub controller: Option<String>,
}

/// Pending client set.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<String, ClientInfo>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a client. Re-registering an id replaces it.
    pub async fn open(&self, id: &str, url: &str, controller: Option<String>) {
        let info = ClientInfo { id: id.to_string(), url: url.to_string(), controller };
        self.clients.write().await.insert(id.to_string(), info);
    }

    /// Forget a client. Returns what was tracked for it.
    pub async fn close(&self, id: &str) -> Option<ClientInfo> {
        self.clients.write().await.remove(id)
    }

    /// Clients served by some generation other than `tag`.
    pub async fn held_by_other(&self, tag: &str) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.controller.as_deref().is_some_and(|t| t != tag))
            .count()
    }

    /// Rebind every open client to `tag`. Returns how many changed hands.
    pub async fn claim(&self, tag: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for client in clients.values_mut() {
            if client.controller.as_deref() != Some(tag) {
                client.controller = Some(tag.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    /// Snapshot of every open client, ordered by id.
    pub async fn list(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<ClientInfo> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        clients
    }
}

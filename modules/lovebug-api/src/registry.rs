use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{info, warn};

use lovebug_common::{Report, UpdateMessage};
use lovebug_ingest::traits::UpdatePublisher;

pub type ChannelId = u64;

struct ChannelEntry {
    sender: UnboundedSender<String>,
    client_id: Option<String>,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Owns the set of live WebSocket channels and their metadata.
///
/// Channels are keyed by a stable id assigned at registration, not by the
/// connection handle, so metadata survives independently of the socket's
/// lifetime. Every mutation is one critical section with no await inside —
/// interleaved tasks never observe a half-updated set.
///
/// Invariant: a channel that has failed a send is pruned at the point of
/// failure, never left in the active set.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    channels: Mutex<HashMap<ChannelId, ChannelEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Add a channel to the active set. Returns its stable id.
    pub async fn register(
        &self,
        sender: UnboundedSender<String>,
        client_id: Option<String>,
    ) -> ChannelId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let label = client_id.clone().unwrap_or_else(|| "anonymous".to_string());
        self.channels.lock().await.insert(
            id,
            ChannelEntry {
                sender,
                client_id,
                connected_at: now,
                last_activity: now,
            },
        );
        info!(channel_id = id, client_id = %label, "WebSocket client registered");
        id
    }

    /// Remove a channel. Idempotent: removing an absent id is a no-op.
    pub async fn unregister(&self, id: ChannelId) {
        if let Some(entry) = self.channels.lock().await.remove(&id) {
            let label = entry.client_id.unwrap_or_else(|| "anonymous".to_string());
            let now = Utc::now();
            info!(
                channel_id = id,
                client_id = %label,
                connected_secs = (now - entry.connected_at).num_seconds(),
                idle_secs = (now - entry.last_activity).num_seconds(),
                "WebSocket client unregistered"
            );
        }
    }

    /// Current active member count.
    pub async fn count(&self) -> usize {
        self.channels.lock().await.len()
    }

    /// Snapshot of identified members. Anonymous channels are excluded.
    pub async fn client_ids(&self) -> Vec<String> {
        self.channels
            .lock()
            .await
            .values()
            .filter_map(|e| e.client_id.clone())
            .collect()
    }

    /// Bump a channel's last-activity timestamp.
    pub async fn touch(&self, id: ChannelId) {
        if let Some(entry) = self.channels.lock().await.get_mut(&id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Send to one channel. Returns false for an unknown id. On send
    /// failure the channel is pruned immediately.
    pub async fn send_personal(&self, id: ChannelId, message: &UpdateMessage) -> bool {
        let frame = message.to_frame();
        let sent = match self.channels.lock().await.get(&id) {
            Some(entry) => entry.sender.send(frame).is_ok(),
            None => return false,
        };
        if !sent {
            warn!(channel_id = id, "Personal send failed, pruning channel");
            self.unregister(id).await;
        }
        sent
    }

    /// Send to the earliest-registered channel under `client_id`. Returns
    /// whether a matching channel was found and a send attempted.
    pub async fn send_to(&self, client_id: &str, message: &UpdateMessage) -> bool {
        let target = self
            .channels
            .lock()
            .await
            .iter()
            .filter(|(_, e)| e.client_id.as_deref() == Some(client_id))
            .map(|(id, _)| *id)
            .min();

        match target {
            Some(id) => {
                self.send_personal(id, message).await;
                true
            }
            None => false,
        }
    }

    /// Fan out one message to every registered channel. Returns how many
    /// received it.
    ///
    /// The message is serialized once and the member set is iterated as a
    /// snapshot, so mutations triggered mid-pass (new connections, failures)
    /// never invalidate the iteration. Failed channels are collected and
    /// unregistered only after the full pass; one bad channel never blocks
    /// delivery to the rest. At-most-once, best-effort, unordered.
    pub async fn broadcast(&self, message: &UpdateMessage) -> usize {
        let snapshot: Vec<(ChannelId, UnboundedSender<String>)> = {
            let channels = self.channels.lock().await;
            // Empty registry: skip serialization entirely.
            if channels.is_empty() {
                return 0;
            }
            channels
                .iter()
                .map(|(id, entry)| (*id, entry.sender.clone()))
                .collect()
        };

        let frame = message.to_frame();
        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in snapshot {
            if sender.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                failed.push(id);
            }
        }

        for id in failed {
            warn!(channel_id = id, "Broadcast send failed, pruning channel");
            self.unregister(id).await;
        }

        delivered
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdatePublisher for ConnectionRegistry {
    async fn publish(&self, reports: &[Report]) -> usize {
        self.broadcast(&UpdateMessage::lovebug_update(reports)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn connect(
        registry: &ConnectionRegistry,
        client_id: Option<&str>,
    ) -> (ChannelId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx, client_id.map(str::to_string)).await;
        (id, rx)
    }

    #[tokio::test]
    async fn count_tracks_register_and_unregister() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.count().await, 0);

        let (a, _rx_a) = connect(&registry, None).await;
        let (b, _rx_b) = connect(&registry, Some("bob")).await;
        assert_eq!(registry.count().await, 2);

        registry.unregister(a).await;
        assert_eq!(registry.count().await, 1);

        // Idempotent: removing again is a no-op, not an error.
        registry.unregister(a).await;
        assert_eq!(registry.count().await, 1);

        registry.unregister(b).await;
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn client_ids_exclude_anonymous_members() {
        let registry = ConnectionRegistry::new();
        let (_a, _rx_a) = connect(&registry, Some("alice")).await;
        let (_b, _rx_b) = connect(&registry, None).await;

        let ids = registry.client_ids().await;
        assert_eq!(ids, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn broadcast_to_empty_registry_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let delivered = registry
            .broadcast(&UpdateMessage::lovebug_update(&[]))
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn broadcast_delivers_to_survivors_and_prunes_failures() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = connect(&registry, Some("a")).await;
        let (_b, rx_b) = connect(&registry, Some("b")).await;
        let (_c, mut rx_c) = connect(&registry, Some("c")).await;

        // B's pump is gone: its sends will fail.
        drop(rx_b);

        let delivered = registry
            .broadcast(&UpdateMessage::lovebug_update(&[]))
            .await;
        assert_eq!(delivered, 2);
        assert_eq!(registry.count().await, 2, "failed channel is pruned");
        assert!(!registry.client_ids().await.contains(&"b".to_string()));

        assert!(rx_a.recv().await.is_some());
        assert!(rx_c.recv().await.is_some());
    }

    #[tokio::test]
    async fn broadcast_sends_the_exact_envelope_to_everyone() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = connect(&registry, None).await;
        let (_b, mut rx_b) = connect(&registry, None).await;

        registry
            .broadcast(&UpdateMessage::lovebug_update(&[]))
            .await;

        let expected = r#"{"type":"lovebug_update","data":[]}"#;
        assert_eq!(rx_a.recv().await.unwrap(), expected);
        assert_eq!(rx_b.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn send_to_unknown_client_returns_false() {
        let registry = ConnectionRegistry::new();
        let (_a, mut rx_a) = connect(&registry, Some("alice")).await;

        let found = registry
            .send_to("nobody", &UpdateMessage::pong("hi"))
            .await;
        assert!(!found);
        // No stray sends happened.
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_picks_earliest_registered_match() {
        let registry = ConnectionRegistry::new();
        let (_first, mut rx_first) = connect(&registry, Some("alice")).await;
        let (_second, mut rx_second) = connect(&registry, Some("alice")).await;

        let found = registry.send_to("alice", &UpdateMessage::pong("hi")).await;
        assert!(found);
        assert!(rx_first.recv().await.is_some());
        assert!(rx_second.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_personal_send_prunes_the_channel() {
        let registry = ConnectionRegistry::new();
        let (id, rx) = connect(&registry, Some("alice")).await;
        drop(rx);

        let sent = registry.send_personal(id, &UpdateMessage::pong("hi")).await;
        assert!(!sent);
        assert_eq!(registry.count().await, 0);

        // Unknown id after pruning: still false, still a no-op.
        assert!(!registry.send_personal(id, &UpdateMessage::pong("hi")).await);
    }

    #[tokio::test]
    async fn publisher_wraps_batch_in_update_envelope() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_a, mut rx_a) = connect(&registry, None).await;

        let notified = registry.publish(&[]).await;
        assert_eq!(notified, 1);
        let frame = rx_a.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "lovebug_update");
    }
}

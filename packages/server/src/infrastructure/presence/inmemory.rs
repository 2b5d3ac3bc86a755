//! InMemory Presence Registry 実装
//!
//! identity ごとに `Mutex<PresenceEntry>` を持ち、接続・切断を identity 単位で直列化する。
//! 異なる identity の操作は互いにブロックしない。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    ConnectOutcome, ConnectionId, Identity, LiveHandle, Participant, PresenceRegistry,
    PusherChannel, Role, RoomId, Timestamp,
};

/// identity ごとのプレゼンス
struct PresenceEntry {
    participant: Participant,
    /// 接続中のみ Some
    channel: Option<PusherChannel>,
}

type PresenceSlot = Arc<Mutex<PresenceEntry>>;

/// インメモリ Presence Registry 実装
#[derive(Default)]
pub struct InMemoryPresenceRegistry {
    entries: RwLock<HashMap<Identity, PresenceSlot>>,
}

impl InMemoryPresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, identity: &Identity) -> Option<PresenceSlot> {
        self.entries.read().await.get(identity).cloned()
    }

    async fn slot_or_insert(&self, identity: &Identity, role: Role, at: Timestamp) -> PresenceSlot {
        if let Some(slot) = self.slot(identity).await {
            return slot;
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(identity.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(PresenceEntry {
                    participant: Participant::new(identity.clone(), role, at),
                    channel: None,
                }))
            })
            .clone()
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn connect(
        &self,
        identity: Identity,
        role: Role,
        channel: PusherChannel,
        at: Timestamp,
    ) -> ConnectOutcome {
        let slot = self.slot_or_insert(&identity, role, at).await;
        let mut entry = slot.lock().await;

        if entry.participant.role != role {
            tracing::warn!(
                "'{}' reconnected as {} (was {}), overwriting role",
                identity,
                role,
                entry.participant.role
            );
            entry.participant.role = role;
        }

        let connection_id = ConnectionId::generate();
        let superseded = entry.channel.replace(channel);
        if let Some(previous) = entry.participant.connection_id {
            tracing::info!(
                "Connection {} of '{}' superseded by {}",
                previous,
                identity,
                connection_id
            );
        }
        entry.participant.connection_id = Some(connection_id);
        entry.participant.connected_at = Some(at);
        entry.participant.last_seen_at = at;

        ConnectOutcome {
            participant: entry.participant.clone(),
            connection_id,
            superseded,
        }
    }

    async fn disconnect(
        &self,
        identity: &Identity,
        connection_id: ConnectionId,
        at: Timestamp,
    ) -> Option<Participant> {
        let slot = self.slot(identity).await?;
        let mut entry = slot.lock().await;

        if entry.participant.connection_id != Some(connection_id) {
            tracing::debug!(
                "Ignoring disconnect of stale connection {} for '{}'",
                connection_id,
                identity
            );
            return None;
        }

        entry.channel = None;
        entry.participant.connection_id = None;
        entry.participant.connected_at = None;
        entry.participant.last_seen_at = at;
        Some(entry.participant.clone())
    }

    async fn lookup(&self, identity: &Identity) -> Option<LiveHandle> {
        let slot = self.slot(identity).await?;
        let entry = slot.lock().await;
        match (&entry.channel, entry.participant.connection_id) {
            (Some(channel), Some(connection_id)) => Some(LiveHandle {
                connection_id,
                role: entry.participant.role,
                channel: channel.clone(),
            }),
            _ => None,
        }
    }

    async fn participant(&self, identity: &Identity) -> Option<Participant> {
        let slot = self.slot(identity).await?;
        let entry = slot.lock().await;
        Some(entry.participant.clone())
    }

    async fn set_current_room(&self, identity: &Identity, room_id: RoomId) {
        if let Some(slot) = self.slot(identity).await {
            slot.lock().await.participant.current_room = Some(room_id);
        }
    }

    async fn connected(&self, role: Role) -> Vec<Identity> {
        let slots: Vec<PresenceSlot> = self.entries.read().await.values().cloned().collect();

        let mut identities = Vec::new();
        for slot in slots {
            let entry = slot.lock().await;
            if entry.participant.role == role && entry.channel.is_some() {
                identities.push(entry.participant.identity.clone());
            }
        }
        identities.sort();
        identities
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tindera_core::OrderSession;

pub type SessionSlot = Arc<tokio::sync::Mutex<Option<OrderSession>>>;

/// Per-chat session slots. The outer map hands out one async mutex per chat;
/// holding that lock for the whole of an inbound event (persistence and
/// broadcast included) serializes a chat's events, so a double-tapped confirm
/// waits and then finds the session already gone. Different chats never
/// contend. Slots are never expired (see DESIGN.md).
#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, chat_id: &str) -> SessionSlot {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(chat_id.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use tindera_core::Step;

    use super::*;

    #[tokio::test]
    async fn slots_are_shared_per_chat() {
        let registry = SessionRegistry::new();
        {
            let slot = registry.slot("1");
            let mut guard = slot.lock().await;
            *guard = Some(OrderSession::new());
        }

        let slot = registry.slot("1");
        let guard = slot.lock().await;
        assert_eq!(guard.as_ref().unwrap().step, Step::Shopping);

        let other = registry.slot("2");
        assert!(other.lock().await.is_none());
    }

    #[tokio::test]
    async fn same_chat_events_serialize_on_the_slot_lock() {
        let registry = Arc::new(SessionRegistry::new());
        let slot = registry.slot("1");
        let held = slot.lock().await;

        let registry2 = Arc::clone(&registry);
        let contender = tokio::spawn(async move {
            let slot = registry2.slot("1");
            let _guard = slot.lock().await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
    }
}

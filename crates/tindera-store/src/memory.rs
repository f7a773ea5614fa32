use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tindera_core::{
    Message, NewMessage, NewOrder, NewTimelineEvent, Order, OrderPatch, OrderStatus, TimelineEvent,
};
use uuid::Uuid;

use crate::Storage;

#[derive(Default)]
pub struct MemStorage {
    orders: RwLock<HashMap<Uuid, Order>>,
    messages: RwLock<HashMap<Uuid, Message>>,
    timeline_events: RwLock<HashMap<Uuid, TimelineEvent>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn order(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn order_by_chat(&self, chat_id: &str) -> anyhow::Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|order| order.chat_id == chat_id)
            .max_by_key(|order| order.created_at)
            .cloned())
    }

    async fn orders(&self) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn orders_by_status(&self, status: OrderStatus) -> anyhow::Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|order| order.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn create_order(&self, order: NewOrder) -> anyhow::Result<Order> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            chat_id: order.chat_id,
            username: order.username,
            customer_name: order.customer_name,
            phone: order.phone,
            address: order.address,
            items: order.items,
            total: order.total,
            delivery_slot: order.delivery_slot,
            status: order.status,
            payment_proof: None,
            qr_code_sent: false,
            created_at: now,
            updated_at: now,
        };
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, id: Uuid, patch: OrderPatch) -> anyhow::Result<Option<Order>> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            order.status = status;
        }
        if let Some(payment_proof) = patch.payment_proof {
            order.payment_proof = Some(payment_proof);
        }
        if let Some(qr_code_sent) = patch.qr_code_sent {
            order.qr_code_sent = qr_code_sent;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn delete_order(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut orders = self.orders.write().await;
        if orders.remove(&id).is_none() {
            return Ok(false);
        }
        let mut messages = self.messages.write().await;
        messages.retain(|_, message| message.order_id != id);
        let mut events = self.timeline_events.write().await;
        events.retain(|_, event| event.order_id != id);
        Ok(true)
    }

    async fn messages(&self, order_id: Uuid) -> anyhow::Result<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut matching: Vec<Message> = messages
            .values()
            .filter(|message| message.order_id == order_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn create_message(&self, message: NewMessage) -> anyhow::Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            order_id: message.order_id,
            sender: message.sender,
            body: message.body,
            created_at: Utc::now(),
        };
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn timeline(&self, order_id: Uuid) -> anyhow::Result<Vec<TimelineEvent>> {
        let events = self.timeline_events.read().await;
        let mut matching: Vec<TimelineEvent> = events
            .values()
            .filter(|event| event.order_id == order_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn create_timeline_event(
        &self,
        event: NewTimelineEvent,
    ) -> anyhow::Result<TimelineEvent> {
        let event = TimelineEvent {
            id: Uuid::new_v4(),
            order_id: event.order_id,
            event: event.event,
            created_at: Utc::now(),
        };
        let mut events = self.timeline_events.write().await;
        events.insert(event.id, event.clone());
        Ok(event)
    }
}

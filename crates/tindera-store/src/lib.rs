pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use tindera_core::{
    Message, NewMessage, NewOrder, NewTimelineEvent, Order, OrderPatch, OrderStatus, TimelineEvent,
};
use uuid::Uuid;

pub use memory::MemStorage;
pub use postgres::PgStorage;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn order(&self, id: Uuid) -> anyhow::Result<Option<Order>>;
    /// The most recently created order for a chat, if any.
    async fn order_by_chat(&self, chat_id: &str) -> anyhow::Result<Option<Order>>;
    async fn orders(&self) -> anyhow::Result<Vec<Order>>;
    async fn orders_by_status(&self, status: OrderStatus) -> anyhow::Result<Vec<Order>>;
    async fn create_order(&self, order: NewOrder) -> anyhow::Result<Order>;
    async fn update_order(&self, id: Uuid, patch: OrderPatch) -> anyhow::Result<Option<Order>>;
    async fn delete_order(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn messages(&self, order_id: Uuid) -> anyhow::Result<Vec<Message>>;
    async fn create_message(&self, message: NewMessage) -> anyhow::Result<Message>;

    async fn timeline(&self, order_id: Uuid) -> anyhow::Result<Vec<TimelineEvent>>;
    async fn create_timeline_event(
        &self,
        event: NewTimelineEvent,
    ) -> anyhow::Result<TimelineEvent>;
}

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tindera_core::{
    Message, NewMessage, NewOrder, NewTimelineEvent, Order, OrderPatch, OrderStatus, Sender,
    TimelineEvent,
};
use uuid::Uuid;

use crate::Storage;

const ORDER_COLUMNS: &str = "id, chat_id, username, customer_name, phone, address, items, total, \
     delivery_slot, status, payment_proof, qr_code_sent, created_at, updated_at";

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn order_from_row(row: &PgRow) -> anyhow::Result<Order> {
    let status: String = row.try_get("status")?;
    let items: serde_json::Value = row.try_get("items")?;

    Ok(Order {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        username: row.try_get("username")?,
        customer_name: row.try_get("customer_name")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        items: serde_json::from_value(items)?,
        total: row.try_get("total")?,
        delivery_slot: row.try_get("delivery_slot")?,
        status: status.parse::<OrderStatus>()?,
        payment_proof: row.try_get("payment_proof")?,
        qr_code_sent: row.try_get("qr_code_sent")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> anyhow::Result<Message> {
    let sender: String = row.try_get("sender")?;
    let sender = match sender.as_str() {
        "operator" => Sender::Operator,
        "customer" => Sender::Customer,
        other => anyhow::bail!("unknown message sender: {other}"),
    };

    Ok(Message {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        sender,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}

fn timeline_event_from_row(row: &PgRow) -> anyhow::Result<TimelineEvent> {
    Ok(TimelineEvent {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        event: row.try_get("event")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Storage for PgStorage {
    async fn order(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn order_by_chat(&self, chat_id: &str) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE chat_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn orders(&self) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn orders_by_status(&self, status: OrderStatus) -> anyhow::Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn create_order(&self, order: NewOrder) -> anyhow::Result<Order> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (
                id, chat_id, username, customer_name, phone, address, items, total,
                delivery_slot, status, payment_proof, qr_code_sent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, FALSE, $11, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&order.chat_id)
        .bind(&order.username)
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.total)
        .bind(&order.delivery_slot)
        .bind(order.status.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        order_from_row(&row)
    }

    async fn update_order(&self, id: Uuid, patch: OrderPatch) -> anyhow::Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                payment_proof = COALESCE($3, payment_proof),
                qr_code_sent = COALESCE($4, qr_code_sent),
                updated_at = $5
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.status.map(OrderStatus::as_str))
        .bind(patch.payment_proof)
        .bind(patch.qr_code_sent)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn delete_order(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn messages(&self, order_id: Uuid) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, order_id, sender, body, created_at FROM messages \
             WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn create_message(&self, message: NewMessage) -> anyhow::Result<Message> {
        let row = sqlx::query(
            r#"
            INSERT INTO messages (id, order_id, sender, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, sender, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.order_id)
        .bind(message.sender.as_str())
        .bind(&message.body)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        message_from_row(&row)
    }

    async fn timeline(&self, order_id: Uuid) -> anyhow::Result<Vec<TimelineEvent>> {
        let rows = sqlx::query(
            "SELECT id, order_id, event, created_at FROM timeline_events \
             WHERE order_id = $1 ORDER BY created_at ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(timeline_event_from_row).collect()
    }

    async fn create_timeline_event(
        &self,
        event: NewTimelineEvent,
    ) -> anyhow::Result<TimelineEvent> {
        let row = sqlx::query(
            r#"
            INSERT INTO timeline_events (id, order_id, event, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, event, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.order_id)
        .bind(&event.event)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        timeline_event_from_row(&row)
    }
}

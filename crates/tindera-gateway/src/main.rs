use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{
        Multipart, Path, Query, State, WebSocketUpgrade,
        ws::{self, WebSocket},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use tindera_bot::{Action, Chat, ChatTransport, Command, Controller, InboundEvent, NoopTransport};
use tindera_core::{
    BusEvent, Catalog, Message, NewMessage, NewTimelineEvent, Order, OrderPatch, OrderStatus,
    Sender, TimelineEvent, available_slots, format_centavos, manila_now, manila_offset,
};
use tindera_platform::{
    EventBus, OperatorMessageRequest, OrderPatchRequest, ServiceConfig, SlotsResponse,
    StatsResponse, connect_database,
};
use tindera_store::{MemStorage, PgStorage, Storage};

const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct AppState {
    storage: Arc<dyn Storage>,
    bus: EventBus,
    transport: Arc<dyn ChatTransport>,
    controller: Arc<Controller>,
    upload_dir: String,
}

#[derive(Debug, Deserialize)]
struct OrdersQuery {
    status: Option<String>,
}

/// One inbound chat update, already flattened by the webhook proxy.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookUpdate {
    chat_id: String,
    username: Option<String>,
    first_name: Option<String>,
    text: Option<String>,
    callback: Option<CallbackPayload>,
    photo_file_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackPayload {
    token: String,
    message_id: Option<i64>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tindera_gateway=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            let pool = connect_database(url).await?;
            let storage = PgStorage::new(pool);
            storage.run_migrations().await?;
            Arc::new(storage)
        }
        None => {
            warn!("DATABASE_URL not set, orders will not survive a restart");
            Arc::new(MemStorage::new())
        }
    };

    if config.bot_token.is_some() {
        warn!("BOT_TOKEN is set but no chat adapter is built in, using the logging transport");
    }
    let transport: Arc<dyn ChatTransport> = Arc::new(NoopTransport);

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let bus = EventBus::new();
    let controller = Arc::new(Controller::new(
        Catalog::standard(),
        storage.clone(),
        bus.clone(),
        transport.clone(),
        config.upload_dir.clone(),
    ));

    let state = AppState {
        storage,
        bus,
        transport,
        controller,
        upload_dir: config.upload_dir.clone(),
    };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/orders", get(list_orders))
        .route(
            "/api/orders/{id}",
            get(get_order).patch(patch_order).delete(delete_order),
        )
        .route(
            "/api/orders/{id}/messages",
            get(list_messages).post(create_message),
        )
        .route("/api/orders/{id}/qr", post(send_payment_qr))
        .route("/api/orders/{id}/timeline", get(get_timeline))
        .route("/api/stats", get(get_stats))
        .route("/api/slots", get(get_slots))
        .route("/uploads/{file}", get(serve_upload))
        .route("/ws", get(ws_upgrade))
        .route("/webhook", post(receive_webhook))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>, (StatusCode, String)> {
    let orders = match query.status {
        Some(raw) => {
            let status = OrderStatus::from_str(&raw).map_err(invalid_request)?;
            state
                .storage
                .orders_by_status(status)
                .await
                .map_err(internal_error)?
        }
        None => state.storage.orders().await.map_err(internal_error)?,
    };
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, (StatusCode, String)> {
    let order = state
        .storage
        .order(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(order_not_found)?;
    Ok(Json(order))
}

async fn patch_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderPatchRequest>,
) -> Result<Json<Order>, (StatusCode, String)> {
    let status = payload
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()
        .map_err(invalid_request)?;

    let patch = OrderPatch {
        status,
        payment_proof: payload.payment_proof,
        qr_code_sent: payload.qr_code_sent,
    };
    let order = state
        .storage
        .update_order(id, patch)
        .await
        .map_err(internal_error)?
        .ok_or_else(order_not_found)?;

    if let Some(status) = status {
        state
            .storage
            .create_timeline_event(NewTimelineEvent {
                order_id: id,
                event: status.as_str().to_string(),
            })
            .await
            .map_err(internal_error)?;
    }

    state.bus.publish(BusEvent::OrderUpdated {
        order: order.clone(),
    });
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = state
        .storage
        .delete_order(id)
        .await
        .map_err(internal_error)?;
    if !deleted {
        return Err(order_not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let messages = state.storage.messages(id).await.map_err(internal_error)?;
    Ok(Json(messages))
}

async fn create_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OperatorMessageRequest>,
) -> Result<Json<Message>, (StatusCode, String)> {
    let body = payload.message.trim().to_string();
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }
    let order = state
        .storage
        .order(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(order_not_found)?;

    let message = state
        .storage
        .create_message(NewMessage {
            order_id: id,
            sender: Sender::Operator,
            body: body.clone(),
        })
        .await
        .map_err(internal_error)?;

    let text = format!("💬 Message from the store:\n\n{body}");
    tokio::time::timeout(
        TRANSPORT_TIMEOUT,
        state.transport.send_text(&order.chat_id, &text, &[]),
    )
    .await
    .map_err(|_| {
        (
            StatusCode::GATEWAY_TIMEOUT,
            "timeout delivering message to customer".to_string(),
        )
    })?
    .map_err(internal_error)?;

    state.bus.publish(BusEvent::MessageCreated {
        message: message.clone(),
    });
    Ok(Json(message))
}

async fn send_payment_qr(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_request)? {
        if field.name() == Some("qr") {
            let ext = field
                .file_name()
                .and_then(|name| PathBuf::from(name).extension()?.to_str().map(str::to_string))
                .unwrap_or_else(|| "jpg".to_string());
            let bytes = field.bytes().await.map_err(invalid_request)?;
            upload = Some((ext, bytes.to_vec()));
        }
    }
    let Some((ext, bytes)) = upload else {
        return Err((
            StatusCode::BAD_REQUEST,
            "QR code image is required".to_string(),
        ));
    };

    let order = state
        .storage
        .order(id)
        .await
        .map_err(internal_error)?
        .ok_or_else(order_not_found)?;

    let filename = format!("qr-{}-{}.{}", id, Utc::now().timestamp_millis(), ext);
    let path = PathBuf::from(&state.upload_dir).join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(internal_error)?;

    let caption = format!(
        "Payment QR Code for Order #{}\nTotal: {}\n\nPlease scan to pay, then send a photo of your payment proof.",
        order.id,
        format_centavos(order.total)
    );
    match tokio::time::timeout(
        TRANSPORT_TIMEOUT,
        state.transport.send_photo(&order.chat_id, &path, &caption),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(internal_error(err));
        }
        Err(_) => {
            let _ = tokio::fs::remove_file(&path).await;
            return Err((
                StatusCode::GATEWAY_TIMEOUT,
                "timeout sending QR code to customer".to_string(),
            ));
        }
    }

    state
        .storage
        .update_order(
            id,
            OrderPatch {
                qr_code_sent: Some(true),
                ..OrderPatch::default()
            },
        )
        .await
        .map_err(internal_error)?;

    state.bus.publish(BusEvent::QrCodeSent { order_id: id });
    Ok(Json(json!({
        "success": true,
        "message": "QR code sent to customer",
    })))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEvent>>, (StatusCode, String)> {
    let events = state.storage.timeline(id).await.map_err(internal_error)?;
    Ok(Json(events))
}

async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let orders = state.storage.orders().await.map_err(internal_error)?;
    Ok(Json(compute_stats(&orders, manila_now())))
}

async fn get_slots() -> Json<SlotsResponse> {
    Json(SlotsResponse {
        slots: available_slots(manila_now()),
    })
}

async fn serve_upload(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    if !safe_upload_name(&file) {
        return Err((StatusCode::BAD_REQUEST, "invalid file name".to_string()));
    }
    let path = PathBuf::from(&state.upload_dir).join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok((
            [
                (header::CONTENT_TYPE, content_type_for(&file)),
                (header::CACHE_CONTROL, "public, max-age=86400"),
            ],
            bytes,
        )
            .into_response()),
        Err(_) => Err((StatusCode::NOT_FOUND, "file not found".to_string())),
    }
}

fn content_type_for(name: &str) -> &'static str {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let events = state.bus.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

async fn forward_events(socket: WebSocket, mut events: broadcast::Receiver<BusEvent>) {
    let (mut outbound, mut inbound) = socket.split();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(payload) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if outbound.send(ws::Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("dashboard socket lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            // Dashboards only listen; draining keeps pings and close frames flowing.
            message = inbound.next() => match message {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}

async fn receive_webhook(
    State(state): State<AppState>,
    Json(update): Json<WebhookUpdate>,
) -> Result<StatusCode, (StatusCode, String)> {
    let chat = Chat {
        id: update.chat_id.clone(),
        username: update.username.clone(),
        first_name: update.first_name.clone(),
    };
    let event = decode_update(&update).map_err(|err| (StatusCode::BAD_REQUEST, err))?;
    state.controller.handle(&chat, event).await;
    Ok(StatusCode::ACCEPTED)
}

fn decode_update(update: &WebhookUpdate) -> Result<InboundEvent, String> {
    if let Some(callback) = &update.callback {
        let action = Action::decode(&callback.token)
            .ok_or_else(|| format!("unknown action token: {}", callback.token))?;
        return Ok(InboundEvent::Action {
            action,
            message_id: callback.message_id,
        });
    }
    if let Some(file_id) = &update.photo_file_id {
        return Ok(InboundEvent::Photo {
            file_id: file_id.clone(),
        });
    }
    if let Some(text) = &update.text {
        if let Some(command) = Command::parse(text) {
            return Ok(InboundEvent::Command(command));
        }
        return Ok(InboundEvent::Text(text.clone()));
    }
    Err("update carries no text, callback, or photo".to_string())
}

fn compute_stats(orders: &[Order], now: DateTime<FixedOffset>) -> StatsResponse {
    let today = now.date_naive();
    let mut stats = StatsResponse {
        active_orders: 0,
        pending_payments: 0,
        completed_today: 0,
        revenue: 0,
    };
    for order in orders {
        if !order.status.is_terminal() {
            stats.active_orders += 1;
        }
        if order.status == OrderStatus::Pending {
            stats.pending_payments += 1;
        }
        if order.status == OrderStatus::Delivered
            && order.created_at.with_timezone(&manila_offset()).date_naive() == today
        {
            stats.completed_today += 1;
            stats.revenue += order.total;
        }
    }
    stats
}

fn safe_upload_name(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

fn order_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "order not found".to_string())
}

fn invalid_request<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    error!("request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn order_with(status: OrderStatus, created_at: DateTime<Utc>, total: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            chat_id: "1001".to_string(),
            username: "maria".to_string(),
            customer_name: "Maria Santos".to_string(),
            phone: "09171234567".to_string(),
            address: "123 Mabini St, Quezon City".to_string(),
            items: vec!["1x Classic Milk Tea".to_string()],
            total,
            delivery_slot: "6:30 PM".to_string(),
            status,
            payment_proof: None,
            qr_code_sent: false,
            created_at,
            updated_at: created_at,
        }
    }

    fn manila(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        manila_offset()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
    }

    #[test]
    fn stats_count_active_pending_and_todays_revenue() {
        let now = manila(2026, 8, 31, 18, 0);
        let today = now.with_timezone(&Utc);
        let yesterday = today - chrono::Duration::days(1);

        let orders = vec![
            order_with(OrderStatus::Pending, today, 12000),
            order_with(OrderStatus::Preparing, today, 18000),
            order_with(OrderStatus::Delivered, today, 30000),
            order_with(OrderStatus::Delivered, yesterday, 50000),
            order_with(OrderStatus::Cancelled, today, 9000),
        ];
        let stats = compute_stats(&orders, now);

        assert_eq!(stats.active_orders, 2);
        assert_eq!(stats.pending_payments, 1);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.revenue, 30000);
    }

    #[test]
    fn stats_use_manila_day_boundaries() {
        // 7 AM Manila on the 31st is still the 30th in UTC; counting by the
        // UTC date would miss this order.
        let created = manila(2026, 8, 31, 7, 0).with_timezone(&Utc);
        let orders = vec![order_with(OrderStatus::Delivered, created, 20000)];

        let same_day = compute_stats(&orders, manila(2026, 8, 31, 18, 0));
        assert_eq!(same_day.completed_today, 1);
        assert_eq!(same_day.revenue, 20000);

        let next_day = compute_stats(&orders, manila(2026, 9, 1, 9, 0));
        assert_eq!(next_day.completed_today, 0);
    }

    #[test]
    fn webhook_updates_decode_by_precedence() {
        let update = WebhookUpdate {
            chat_id: "1001".to_string(),
            username: None,
            first_name: None,
            text: Some("hello".to_string()),
            callback: Some(CallbackPayload {
                token: "view_cart".to_string(),
                message_id: Some(42),
            }),
            photo_file_id: None,
        };
        match decode_update(&update).unwrap() {
            InboundEvent::Action {
                action: Action::ViewCart,
                message_id: Some(42),
            } => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn webhook_text_decodes_to_command_or_text() {
        let mut update = WebhookUpdate {
            chat_id: "1001".to_string(),
            username: None,
            first_name: None,
            text: Some("/start".to_string()),
            callback: None,
            photo_file_id: None,
        };
        assert!(matches!(
            decode_update(&update).unwrap(),
            InboundEvent::Command(Command::Start)
        ));

        update.text = Some("where is my order".to_string());
        assert!(matches!(
            decode_update(&update).unwrap(),
            InboundEvent::Text(_)
        ));
    }

    #[test]
    fn empty_webhook_updates_are_rejected() {
        let update = WebhookUpdate {
            chat_id: "1001".to_string(),
            username: None,
            first_name: None,
            text: None,
            callback: None,
            photo_file_id: None,
        };
        assert!(decode_update(&update).is_err());

        let unknown_token = WebhookUpdate {
            chat_id: "1001".to_string(),
            username: None,
            first_name: None,
            text: None,
            callback: Some(CallbackPayload {
                token: "does_not_exist".to_string(),
                message_id: None,
            }),
            photo_file_id: None,
        };
        assert!(decode_update(&unknown_token).is_err());
    }

    #[test]
    fn upload_content_type_follows_extension() {
        assert_eq!(content_type_for("qr-abc-123.png"), "image/png");
        assert_eq!(content_type_for("qr-abc-123.PNG"), "image/png");
        assert_eq!(content_type_for("proof.webp"), "image/webp");
        assert_eq!(content_type_for("proof.gif"), "image/gif");
        assert_eq!(content_type_for("payment-proof-abc-123.jpg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "image/jpeg");
    }

    #[test]
    fn upload_names_reject_traversal() {
        assert!(safe_upload_name("payment-proof-abc-123.jpg"));
        assert!(!safe_upload_name("../secrets.txt"));
        assert!(!safe_upload_name("a/b.jpg"));
        assert!(!safe_upload_name("a\\b.jpg"));
        assert!(!safe_upload_name(""));
    }
}

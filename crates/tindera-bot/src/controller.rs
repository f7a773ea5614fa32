use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use rand::seq::SliceRandom;
use tindera_core::{
    BusEvent, Catalog, DomainError, NewMessage, NewOrder, NewTimelineEvent, Order, OrderPatch,
    OrderSession, OrderStatus, Sender, Step, available_slots, manila_now,
};
use tindera_platform::EventBus;
use tindera_store::Storage;
use tracing::{error, info};

use crate::actions::{Action, Command, InboundEvent, parse_quick_order};
use crate::registry::SessionRegistry;
use crate::render;
use crate::transport::{Button, ChatTransport};

#[derive(Debug, Clone)]
pub struct Chat {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

pub struct Controller {
    catalog: Catalog,
    storage: Arc<dyn Storage>,
    bus: EventBus,
    transport: Arc<dyn ChatTransport>,
    registry: SessionRegistry,
    upload_dir: PathBuf,
}

impl Controller {
    pub fn new(
        catalog: Catalog,
        storage: Arc<dyn Storage>,
        bus: EventBus,
        transport: Arc<dyn ChatTransport>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            storage,
            bus,
            transport,
            registry: SessionRegistry::new(),
            upload_dir: upload_dir.into(),
        }
    }

    /// Entry point for one inbound chat event. Failures are logged and
    /// answered with a generic apology; they never escape to the caller, so
    /// one chat's trouble cannot take down another's.
    pub async fn handle(&self, chat: &Chat, event: InboundEvent) {
        if let Err(err) = self.dispatch(chat, event).await {
            error!(chat_id = %chat.id, "failed to handle chat event: {err:#}");
            let _ = self
                .transport
                .send_text(&chat.id, render::APOLOGY, &[])
                .await;
        }
    }

    async fn dispatch(&self, chat: &Chat, event: InboundEvent) -> anyhow::Result<()> {
        // One lock per chat, held across every side effect of the event.
        let slot = self.registry.slot(&chat.id);
        let mut session = slot.lock().await;

        match event {
            InboundEvent::Command(Command::Start) => {
                let cart_lines = session.as_ref().map_or(0, |s| s.lines.len());
                self.send(
                    chat,
                    &render::welcome(chat.first_name.as_deref()),
                    &render::category_keyboard(&self.catalog, cart_lines),
                )
                .await
            }
            InboundEvent::Command(Command::Menu) => {
                let cart_lines = session.as_ref().map_or(0, |s| s.lines.len());
                self.send(
                    chat,
                    render::MENU_HEADER,
                    &render::category_keyboard(&self.catalog, cart_lines),
                )
                .await
            }
            InboundEvent::Command(Command::Cart) => match session.as_ref() {
                Some(s) if !s.lines.is_empty() => {
                    let (text, keyboard) = render::cart_view(s);
                    self.send(chat, &text, &keyboard).await
                }
                _ => self.send(chat, render::EMPTY_CART, &[]).await,
            },
            InboundEvent::Action { action, message_id } => {
                self.handle_action(chat, &mut session, action, message_id)
                    .await
            }
            InboundEvent::Text(text) => self.handle_text(chat, &mut session, &text).await,
            InboundEvent::Photo { file_id } => self.handle_photo(chat, &file_id).await,
        }
    }

    async fn handle_action(
        &self,
        chat: &Chat,
        session: &mut Option<OrderSession>,
        action: Action,
        message_id: Option<i64>,
    ) -> anyhow::Result<()> {
        match action {
            Action::Category(key) => match self.catalog.category(&key) {
                Some(category) => {
                    let (text, keyboard) = render::category_view(category);
                    self.reply(chat, message_id, &text, &keyboard).await
                }
                None => self.reply(chat, message_id, "Category not found.", &[]).await,
            },
            Action::Item(number) => {
                let Some(item) = self.catalog.lookup(number) else {
                    return self.reply(chat, message_id, render::INVALID_ITEM, &[]).await;
                };
                let state = session.get_or_insert_with(OrderSession::new);
                match state.add_item(item, 1) {
                    Ok(()) => {
                        self.reply(
                            chat,
                            message_id,
                            &render::item_added(item),
                            &render::after_add_keyboard(),
                        )
                        .await
                    }
                    Err(err) => self.reply_rejection(chat, message_id, &err).await,
                }
            }
            Action::IncrementLine(index) => {
                self.adjust_line(chat, session, message_id, index, true).await
            }
            Action::DecrementLine(index) => {
                self.adjust_line(chat, session, message_id, index, false).await
            }
            Action::ViewCart => match session.as_ref() {
                Some(s) if !s.lines.is_empty() => {
                    let (text, keyboard) = render::cart_view(s);
                    self.reply(chat, message_id, &text, &keyboard).await
                }
                _ => self.reply(chat, message_id, render::EMPTY_CART, &[]).await,
            },
            Action::ClearCart => {
                let Some(state) = session.as_mut() else {
                    return self.reply(chat, message_id, render::EMPTY_CART, &[]).await;
                };
                match state.clear_cart() {
                    Ok(()) => {
                        *session = None;
                        self.reply(chat, message_id, render::CART_CLEARED, &[]).await
                    }
                    Err(err) => self.reply_rejection(chat, message_id, &err).await,
                }
            }
            Action::ContinueShopping | Action::BackToCategories => {
                let cart_lines = session.as_ref().map_or(0, |s| s.lines.len());
                self.reply(
                    chat,
                    message_id,
                    render::MENU_HEADER,
                    &render::category_keyboard(&self.catalog, cart_lines),
                )
                .await
            }
            Action::StartCheckout => {
                let Some(state) = session.as_mut() else {
                    return self.reply(chat, message_id, render::EMPTY_CART, &[]).await;
                };
                match state.begin_checkout() {
                    Ok(()) => {
                        let text = render::checkout_intro(state);
                        self.reply(chat, message_id, &text, &[]).await
                    }
                    Err(err) => self.reply_rejection(chat, message_id, &err).await,
                }
            }
            Action::SelectSlot(index) => {
                let Some(state) = session.as_mut() else {
                    return self.reply(chat, message_id, render::SESSION_EXPIRED, &[]).await;
                };
                if state.step == Step::SelectingTimeslot && state.offered_slots.is_empty() {
                    return self.reoffer_slots(chat, state, message_id).await;
                }
                match state.select_slot(index) {
                    Ok(()) => {
                        let text = render::review(state);
                        self.reply(chat, message_id, &text, &render::confirm_keyboard())
                            .await
                    }
                    Err(err) => self.reply_rejection(chat, message_id, &err).await,
                }
            }
            Action::Confirm => self.handle_confirm(chat, session, message_id).await,
            Action::Cancel => {
                *session = None;
                self.reply(chat, message_id, render::ORDER_CANCELLED, &[]).await
            }
        }
    }

    async fn adjust_line(
        &self,
        chat: &Chat,
        session: &mut Option<OrderSession>,
        message_id: Option<i64>,
        index: usize,
        increment: bool,
    ) -> anyhow::Result<()> {
        let Some(state) = session.as_mut() else {
            return self.reply(chat, message_id, render::EMPTY_CART, &[]).await;
        };
        let result = if increment {
            state.increment_line(index)
        } else {
            state.decrement_line(index)
        };
        match result {
            Ok(()) if state.lines.is_empty() => {
                *session = None;
                self.reply(chat, message_id, render::CART_CLEARED, &[]).await
            }
            Ok(()) => {
                let (text, keyboard) = render::cart_view(state);
                self.reply(chat, message_id, &text, &keyboard).await
            }
            Err(err) => self.reply_rejection(chat, message_id, &err).await,
        }
    }

    async fn handle_text(
        &self,
        chat: &Chat,
        session: &mut Option<OrderSession>,
        text: &str,
    ) -> anyhow::Result<()> {
        let text = text.trim();

        if session.is_none() {
            if let Some(quick) = parse_quick_order(text) {
                let Some(item) = self.catalog.lookup(quick.number) else {
                    return self.send(chat, render::INVALID_ITEM, &[]).await;
                };
                let mut state = OrderSession::new();
                state
                    .add_item(item, quick.quantity)
                    .map_err(|err| anyhow::anyhow!(err))?;
                // Numeric quick orders jump straight into checkout.
                state
                    .begin_checkout()
                    .map_err(|err| anyhow::anyhow!(err))?;
                let summary = render::quick_order_summary(quick.quantity, item);
                *session = Some(state);
                return self.send(chat, &summary, &[]).await;
            }
            return self.handle_loose_text(chat, text).await;
        }

        let state = session.as_mut().context("session checked above")?;
        match state.step {
            Step::Shopping => {
                if let Some(quick) = parse_quick_order(text) {
                    let Some(item) = self.catalog.lookup(quick.number) else {
                        return self.send(chat, render::INVALID_ITEM, &[]).await;
                    };
                    match state.add_item(item, quick.quantity) {
                        Ok(()) => {
                            self.send(chat, &render::item_added(item), &render::after_add_keyboard())
                                .await
                        }
                        Err(err) => self.reply_rejection(chat, None, &err).await,
                    }
                } else {
                    self.send(chat, "Type /cart to review your cart or /menu to keep browsing!", &[])
                        .await
                }
            }
            Step::CollectingName => match state.submit_name(text) {
                Ok(()) => self.send(chat, render::PHONE_PROMPT, &[]).await,
                Err(err) => self.reply_rejection(chat, None, &err).await,
            },
            Step::CollectingPhone => match state.submit_phone(text) {
                Ok(()) => self.send(chat, render::ADDRESS_PROMPT, &[]).await,
                Err(err) => self.reply_rejection(chat, None, &err).await,
            },
            Step::CollectingAddress => match state.submit_address(text) {
                Ok(()) => {
                    let slots = available_slots(manila_now());
                    if slots.is_empty() {
                        state.offer_slots(Vec::new());
                        self.send(chat, render::SLOTS_CLOSED, &render::cancel_keyboard())
                            .await
                    } else {
                        let keyboard = render::slot_keyboard(&slots);
                        state.offer_slots(slots);
                        self.send(chat, render::SLOT_PROMPT, &keyboard).await
                    }
                }
                Err(err) => self.reply_rejection(chat, None, &err).await,
            },
            Step::SelectingTimeslot => {
                if state.offered_slots.is_empty() {
                    return self.reoffer_slots(chat, state, None).await;
                }
                // Typed fallback: slots are numbered from 1 in the prompt.
                let index = text
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1));
                match index {
                    Some(index) => match state.select_slot(index) {
                        Ok(()) => {
                            let review = render::review(state);
                            self.send(chat, &review, &render::confirm_keyboard()).await
                        }
                        Err(err) => self.reply_rejection(chat, None, &err).await,
                    },
                    None => self.send(chat, render::INVALID_SLOT, &[]).await,
                }
            }
            Step::Reviewing => {
                if text.eq_ignore_ascii_case("confirm") {
                    self.handle_confirm(chat, session, None).await
                } else if text.eq_ignore_ascii_case("cancel") {
                    *session = None;
                    self.send(chat, render::ORDER_CANCELLED, &[]).await
                } else {
                    self.send(chat, render::REVIEW_REPROMPT, &[]).await
                }
            }
        }
    }

    /// A session parked at slot selection with nothing on offer (slots were
    /// closed for the day) wakes up on the next input: recompute today's
    /// slots rather than rejecting against the stale empty list.
    async fn reoffer_slots(
        &self,
        chat: &Chat,
        state: &mut OrderSession,
        message_id: Option<i64>,
    ) -> anyhow::Result<()> {
        let slots = available_slots(manila_now());
        if slots.is_empty() {
            return self
                .reply(chat, message_id, render::SLOTS_CLOSED, &render::cancel_keyboard())
                .await;
        }
        let keyboard = render::slot_keyboard(&slots);
        state.offer_slots(slots);
        self.reply(chat, message_id, render::SLOT_PROMPT, &keyboard).await
    }

    /// Free text with no session: attach it to the chat's latest order as a
    /// customer message, then nudge toward the menu.
    async fn handle_loose_text(&self, chat: &Chat, text: &str) -> anyhow::Result<()> {
        if let Some(order) = self.storage.order_by_chat(&chat.id).await? {
            let message = self
                .storage
                .create_message(NewMessage {
                    order_id: order.id,
                    sender: Sender::Customer,
                    body: text.to_string(),
                })
                .await?;
            self.bus.publish(BusEvent::MessageCreated { message });
        }

        let nudge = render::NUDGES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(render::NUDGES[0]);
        self.send(chat, nudge, &[]).await
    }

    async fn handle_confirm(
        &self,
        chat: &Chat,
        session: &mut Option<OrderSession>,
        message_id: Option<i64>,
    ) -> anyhow::Result<()> {
        let Some(state) = session.as_ref() else {
            return self.reply(chat, message_id, render::SESSION_EXPIRED, &[]).await;
        };
        if state.step != Step::Reviewing {
            return self.reply_rejection(chat, message_id, &DomainError::WrongStep).await;
        }

        match self.persist_confirmation(chat, state).await {
            Ok(order) => {
                info!(chat_id = %chat.id, order_id = %order.id, "order confirmed");
                // The session is destroyed only after every write succeeded.
                *session = None;
                self.reply(chat, message_id, &render::order_confirmed(order.id), &[])
                    .await
            }
            Err(err) => {
                error!(chat_id = %chat.id, "order confirmation failed: {err:#}");
                self.reply(chat, message_id, render::RETRYABLE_SYSTEM_ERROR, &[])
                    .await
            }
        }
    }

    async fn persist_confirmation(
        &self,
        chat: &Chat,
        session: &OrderSession,
    ) -> anyhow::Result<Order> {
        let order = self
            .storage
            .create_order(NewOrder {
                chat_id: chat.id.clone(),
                username: chat.username.clone().unwrap_or_else(|| "unknown".to_string()),
                customer_name: session
                    .customer_name
                    .clone()
                    .context("confirmed session missing customer name")?,
                phone: session.phone.clone().context("confirmed session missing phone")?,
                address: session
                    .address
                    .clone()
                    .context("confirmed session missing address")?,
                items: session.line_summaries(),
                total: session.total,
                delivery_slot: session
                    .selected_slot
                    .clone()
                    .context("confirmed session missing delivery slot")?,
                status: OrderStatus::Pending,
            })
            .await?;

        if let Err(err) = self.record_confirmation(&order).await {
            // A half-recorded order must not survive; roll the row back and
            // let the customer retry with their cart intact.
            let _ = self.storage.delete_order(order.id).await;
            return Err(err);
        }

        self.bus.publish(BusEvent::OrderCreated { order: order.clone() });
        Ok(order)
    }

    async fn record_confirmation(&self, order: &Order) -> anyhow::Result<()> {
        self.storage
            .create_timeline_event(NewTimelineEvent {
                order_id: order.id,
                event: "confirmed".to_string(),
            })
            .await?;
        self.storage
            .create_message(NewMessage {
                order_id: order.id,
                sender: Sender::Customer,
                body: "Order confirmed via chat".to_string(),
            })
            .await?;
        Ok(())
    }

    async fn handle_photo(&self, chat: &Chat, file_id: &str) -> anyhow::Result<()> {
        let Some(order) = self.storage.order_by_chat(&chat.id).await? else {
            return self.send(chat, render::NO_ACTIVE_ORDER, &[]).await;
        };

        let bytes = self.transport.fetch_file(file_id).await?;
        let filename = format!(
            "payment-proof-{}-{}.jpg",
            order.id,
            Utc::now().timestamp_millis()
        );
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::write(self.upload_dir.join(&filename), &bytes).await?;
        let proof = format!("/uploads/{filename}");

        self.storage
            .update_order(
                order.id,
                OrderPatch {
                    status: Some(OrderStatus::Confirmed),
                    payment_proof: Some(proof.clone()),
                    qr_code_sent: None,
                },
            )
            .await?
            .context("order disappeared while attaching payment proof")?;
        self.storage
            .create_timeline_event(NewTimelineEvent {
                order_id: order.id,
                event: "payment_received".to_string(),
            })
            .await?;
        self.storage
            .create_message(NewMessage {
                order_id: order.id,
                sender: Sender::Customer,
                body: "Payment proof uploaded".to_string(),
            })
            .await?;
        self.bus.publish(BusEvent::PaymentProofReceived {
            order_id: order.id,
            payment_proof: proof,
        });

        self.send(chat, render::PROOF_RECEIVED, &[]).await
    }

    async fn reply_rejection(
        &self,
        chat: &Chat,
        message_id: Option<i64>,
        err: &DomainError,
    ) -> anyhow::Result<()> {
        self.reply(chat, message_id, &err.to_string(), &[]).await
    }

    async fn reply(
        &self,
        chat: &Chat,
        message_id: Option<i64>,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> anyhow::Result<()> {
        match message_id {
            Some(message_id) => {
                self.transport
                    .edit_message(&chat.id, message_id, text, buttons)
                    .await
            }
            None => self.transport.send_text(&chat.id, text, buttons).await,
        }
    }

    async fn send(&self, chat: &Chat, text: &str, buttons: &[Vec<Button>]) -> anyhow::Result<()> {
        self.transport.send_text(&chat.id, text, buttons).await
    }
}

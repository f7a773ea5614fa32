use tindera_core::{Catalog, CatalogCategory, CatalogItem, OrderSession, format_centavos};
use uuid::Uuid;

use crate::actions::Action;
use crate::transport::Button;

pub const APOLOGY: &str = "Oops! May technical issue. Please try again later!";
pub const RETRYABLE_SYSTEM_ERROR: &str =
    "Ay sorry! May error sa system. Your cart is safe, please try confirming again!";
pub const SESSION_EXPIRED: &str = "Session expired. Please start over with /menu.";
pub const EMPTY_CART: &str = "🛒 Your cart is empty!\n\nType /menu to browse our catalog.";
pub const CART_CLEARED: &str =
    "🗑️ Cart cleared! Ready for fresh shopping!\n\nType /menu to browse our catalog again.";
pub const ORDER_CANCELLED: &str =
    "Order cancelled! No worries, you can start again anytime. Type /menu when ready!";
pub const NAME_PROMPT: &str = "Para ma-proceed, please provide your full name:";
pub const PHONE_PROMPT: &str =
    "Salamat! Now, please share your phone number (+63 or 09xx format): 📱";
pub const ADDRESS_PROMPT: &str = "Perfect! Now please give us your complete delivery address: 🏠\n\
     (Include street, barangay, city para sure na mahanap kayo!)";
pub const SLOT_PROMPT: &str = "Almost done na! Choose your delivery time slot: ⏰";
pub const SLOTS_CLOSED: &str = "Ay naku, wala na kaming delivery slot for today. 😴\n\
     Your cart is saved, balik lang kayo bukas ng umaga to pick a slot!";
pub const REVIEW_REPROMPT: &str = "Please type \"CONFIRM\" to place the order or \"CANCEL\" to start over!";
pub const NO_ACTIVE_ORDER: &str = "No active order found. Please place an order first!";
pub const PROOF_RECEIVED: &str = "🎉 Payment proof received! Salamat po!\n\n\
     Your order is now being processed. We'll update you once it's ready for delivery!";
pub const INVALID_ITEM: &str = "Ay sorry! Invalid item number. Type /menu para makita ulit ang options!";
pub const INVALID_SLOT: &str = "Invalid time slot! Please choose from the available options.";

pub const NUDGES: &[&str] = &[
    "Hello po! Type /menu to see our offerings! 😋",
    "Kamusta! Ready na ba kayong mag-order? Type /menu!",
    "Hi there! Para makita ang menu, type /menu lang! ✨",
];

pub fn welcome(first_name: Option<&str>) -> String {
    let name = first_name.unwrap_or("suki");
    format!(
        "🌟 Kamusta, {name}! Welcome sa Tindera! 🌟\n\n\
         Gutom na ba? Choose a category para magsimula ng order! 😊"
    )
}

pub const MENU_HEADER: &str = "🔥 TINDERA MENU 🔥\n\nChoose a category to browse:";

pub fn category_keyboard(catalog: &Catalog, cart_lines: usize) -> Vec<Vec<Button>> {
    let mut rows: Vec<Vec<Button>> = catalog
        .categories()
        .iter()
        .map(|category| {
            vec![Button::new(
                category.title.clone(),
                Action::Category(category.key.clone()),
            )]
        })
        .collect();
    if cart_lines > 0 {
        rows.push(vec![Button::new(
            format!("🛒 View Cart ({cart_lines} items)"),
            Action::ViewCart,
        )]);
    }
    rows
}

pub fn category_view(category: &CatalogCategory) -> (String, Vec<Vec<Button>>) {
    let mut rows: Vec<Vec<Button>> = category
        .items
        .iter()
        .map(|item| {
            vec![Button::new(
                format!("{} - {}", item.name, format_centavos(item.price)),
                Action::Item(item.number),
            )]
        })
        .collect();
    rows.push(vec![Button::new(
        "⬅️ Back to Categories",
        Action::BackToCategories,
    )]);

    let text = format!("{}\n\nSelect an item to add to cart:", category.title);
    (text, rows)
}

pub fn item_added(item: &CatalogItem) -> String {
    let mut text = format!(
        "✅ Added to cart!\n\n{}\n{}",
        item.name,
        format_centavos(item.price)
    );
    if !item.variants.is_empty() {
        text.push_str(&format!("\n\nAvailable variants: {}", item.variants.join(", ")));
    }
    if let Some(promo) = &item.promo {
        text.push_str(&format!("\n🔥 {promo}"));
    }
    text
}

pub fn after_add_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![
            Button::new("🛒 View Cart", Action::ViewCart),
            Button::new("🛍️ Continue Shopping", Action::ContinueShopping),
        ],
        vec![Button::new("💳 Checkout", Action::StartCheckout)],
    ]
}

pub fn cart_view(session: &OrderSession) -> (String, Vec<Vec<Button>>) {
    let mut text = String::from("🛒 YOUR CART 🛒\n\n");
    for (index, line) in session.lines.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}x {}\n   {}\n\n",
            index + 1,
            line.quantity,
            line.name,
            format_centavos(line.subtotal())
        ));
    }
    text.push_str(&format!("Total: {}", format_centavos(session.total)));

    let mut rows = vec![vec![
        Button::new("🛍️ Continue Shopping", Action::ContinueShopping),
        Button::new("🗑️ Clear Cart", Action::ClearCart),
    ]];
    for (index, line) in session.lines.iter().enumerate() {
        rows.push(vec![
            Button::new(format!("➖ {}", line.name), Action::DecrementLine(index)),
            Button::new(format!("➕ {}", line.name), Action::IncrementLine(index)),
        ]);
    }
    rows.push(vec![Button::new("💳 Checkout", Action::StartCheckout)]);

    (text, rows)
}

pub fn checkout_intro(session: &OrderSession) -> String {
    format!(
        "💳 CHECKOUT 💳\n\nItems: {}\nTotal: {}\n\n{NAME_PROMPT}",
        session.lines.len(),
        format_centavos(session.total)
    )
}

pub fn quick_order_summary(quantity: u32, item: &CatalogItem) -> String {
    format!(
        "🎉 Ang ganda ng choice mo!\n\nYour Order:\n{}x {} - {}\n\n\
         Para ma-proceed natin, kailangan namin ng details mo!\n\
         Please tell us your full name: 😊",
        quantity,
        item.name,
        format_centavos(item.price * i64::from(quantity))
    )
}

pub fn slot_keyboard(slots: &[String]) -> Vec<Vec<Button>> {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| vec![Button::new(slot.clone(), Action::SelectSlot(index))])
        .collect()
}

pub fn review(session: &OrderSession) -> String {
    let items = session
        .lines
        .iter()
        .map(|line| {
            format!(
                "{}x {} - {}",
                line.quantity,
                line.name,
                format_centavos(line.subtotal())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🔍 ORDER REVIEW 🔍\n\nItems:\n{items}\n\nTotal: {}\n\n\
         Customer: {}\nPhone: {}\nAddress: {}\nDelivery Time: {}\n\nEverything looks good?",
        format_centavos(session.total),
        session.customer_name.as_deref().unwrap_or("-"),
        session.phone.as_deref().unwrap_or("-"),
        session.address.as_deref().unwrap_or("-"),
        session.selected_slot.as_deref().unwrap_or("-"),
    )
}

pub fn confirm_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new("✅ CONFIRM ORDER", Action::Confirm)],
        vec![Button::new("❌ CANCEL", Action::Cancel)],
    ]
}

pub fn cancel_keyboard() -> Vec<Vec<Button>> {
    vec![vec![Button::new("❌ CANCEL", Action::Cancel)]]
}

pub fn order_confirmed(order_id: Uuid) -> String {
    format!(
        "🎉 ORDER CONFIRMED! 🎉\n\nOrder ID: #{order_id}\n\n\
         Ang galing! Your order has been received!\n\n\
         Wait lang for our payment QR code - isesend namin shortly! \
         After payment, just upload your receipt dito sa chat! 📸\n\n\
         Maraming salamat for choosing us! 🌟"
    )
}

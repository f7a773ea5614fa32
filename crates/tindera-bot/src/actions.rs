use std::sync::LazyLock;

use regex::Regex;

static QUICK_ORDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)(?:\s*x(\d+))?$").expect("valid quick-order pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Cart,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "/start" => Some(Command::Start),
            "/menu" => Some(Command::Menu),
            "/cart" => Some(Command::Cart),
            _ => None,
        }
    }
}

/// Every button tap the bot understands, decoded from its token form once at
/// the transport boundary. The conversation logic only ever sees this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Category(String),
    Item(u32),
    IncrementLine(usize),
    DecrementLine(usize),
    ViewCart,
    ClearCart,
    ContinueShopping,
    BackToCategories,
    StartCheckout,
    SelectSlot(usize),
    Confirm,
    Cancel,
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Action::Category(key) => format!("category_{key}"),
            Action::Item(number) => format!("item_{number}"),
            Action::IncrementLine(index) => format!("add_{index}"),
            Action::DecrementLine(index) => format!("remove_{index}"),
            Action::ViewCart => "view_cart".to_string(),
            Action::ClearCart => "clear_cart".to_string(),
            Action::ContinueShopping => "continue_shopping".to_string(),
            Action::BackToCategories => "back_to_categories".to_string(),
            Action::StartCheckout => "start_checkout".to_string(),
            Action::SelectSlot(index) => format!("timeslot_{index}"),
            Action::Confirm => "confirm_order".to_string(),
            Action::Cancel => "cancel_order".to_string(),
        }
    }

    pub fn decode(token: &str) -> Option<Self> {
        if let Some(key) = token.strip_prefix("category_") {
            if key.is_empty() {
                return None;
            }
            return Some(Action::Category(key.to_string()));
        }
        if let Some(number) = token.strip_prefix("item_") {
            return number.parse().ok().map(Action::Item);
        }
        if let Some(index) = token.strip_prefix("add_") {
            return index.parse().ok().map(Action::IncrementLine);
        }
        if let Some(index) = token.strip_prefix("remove_") {
            return index.parse().ok().map(Action::DecrementLine);
        }
        if let Some(index) = token.strip_prefix("timeslot_") {
            return index.parse().ok().map(Action::SelectSlot);
        }
        match token {
            "view_cart" => Some(Action::ViewCart),
            "clear_cart" => Some(Action::ClearCart),
            "continue_shopping" => Some(Action::ContinueShopping),
            "back_to_categories" => Some(Action::BackToCategories),
            "start_checkout" => Some(Action::StartCheckout),
            "confirm_order" => Some(Action::Confirm),
            "cancel_order" => Some(Action::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(Command),
    Text(String),
    Action {
        action: Action,
        message_id: Option<i64>,
    },
    Photo {
        file_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickOrder {
    pub number: u32,
    pub quantity: u32,
}

/// The bare-number ordering protocol: `7` or `7 x2`, case-insensitive,
/// default quantity 1.
pub fn parse_quick_order(text: &str) -> Option<QuickOrder> {
    let captures = QUICK_ORDER_PATTERN.captures(text.trim())?;
    let number: u32 = captures.get(1)?.as_str().parse().ok()?;
    let quantity: u32 = match captures.get(2) {
        Some(quantity) => quantity.as_str().parse().ok()?,
        None => 1,
    };
    if quantity == 0 {
        return None;
    }
    Some(QuickOrder { number, quantity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_order_parsing_vectors() {
        assert_eq!(
            parse_quick_order("7"),
            Some(QuickOrder { number: 7, quantity: 1 })
        );
        assert_eq!(
            parse_quick_order("7 x2"),
            Some(QuickOrder { number: 7, quantity: 2 })
        );
        assert_eq!(
            parse_quick_order("7x2"),
            Some(QuickOrder { number: 7, quantity: 2 })
        );
        assert_eq!(
            parse_quick_order(" 12 X3 "),
            Some(QuickOrder { number: 12, quantity: 3 })
        );
        assert_eq!(parse_quick_order("menu"), None);
        assert_eq!(parse_quick_order("7 y2"), None);
        assert_eq!(parse_quick_order("7 x0"), None);
        assert_eq!(parse_quick_order(""), None);
    }

    #[test]
    fn action_tokens_round_trip() {
        let actions = [
            Action::Category("silog".into()),
            Action::Item(7),
            Action::IncrementLine(0),
            Action::DecrementLine(2),
            Action::ViewCart,
            Action::ClearCart,
            Action::ContinueShopping,
            Action::BackToCategories,
            Action::StartCheckout,
            Action::SelectSlot(3),
            Action::Confirm,
            Action::Cancel,
        ];
        for action in actions {
            assert_eq!(Action::decode(&action.encode()), Some(action));
        }
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(Action::decode("item_abc"), None);
        assert_eq!(Action::decode("category_"), None);
        assert_eq!(Action::decode("timeslot_-1"), None);
        assert_eq!(Action::decode("unknown"), None);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse(" /menu "), Some(Command::Menu));
        assert_eq!(Command::parse("/cart"), Some(Command::Cart));
        assert_eq!(Command::parse("/help"), None);
    }
}

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::CatalogItem;
use crate::errors::DomainError;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+63|0)9\d{9}$").expect("valid phone pattern"));

const MIN_NAME_LEN: usize = 2;
const MIN_ADDRESS_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Shopping,
    CollectingName,
    CollectingPhone,
    CollectingAddress,
    SelectingTimeslot,
    Reviewing,
}

#[derive(Debug, Clone)]
pub struct OrderSession {
    pub step: Step,
    pub lines: Vec<CartLine>,
    pub total: i64,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub offered_slots: Vec<String>,
    pub selected_slot: Option<String>,
}

impl Default for OrderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderSession {
    pub fn new() -> Self {
        Self {
            step: Step::Shopping,
            lines: Vec::new(),
            total: 0,
            customer_name: None,
            phone: None,
            address: None,
            offered_slots: Vec::new(),
            selected_slot: None,
        }
    }

    pub fn add_item(&mut self, item: &CatalogItem, quantity: u32) -> Result<(), DomainError> {
        if self.step != Step::Shopping {
            return Err(DomainError::WrongStep);
        }
        if quantity == 0 {
            return Err(DomainError::Validation("quantity must be at least 1".into()));
        }
        match self.lines.iter_mut().find(|line| line.name == item.name) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine {
                name: item.name.clone(),
                unit_price: item.price,
                quantity,
            }),
        }
        self.recompute_total();
        Ok(())
    }

    pub fn increment_line(&mut self, index: usize) -> Result<(), DomainError> {
        if self.step != Step::Shopping {
            return Err(DomainError::WrongStep);
        }
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| DomainError::NotFound("cart line".into()))?;
        line.quantity += 1;
        self.recompute_total();
        Ok(())
    }

    pub fn decrement_line(&mut self, index: usize) -> Result<(), DomainError> {
        if self.step != Step::Shopping {
            return Err(DomainError::WrongStep);
        }
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| DomainError::NotFound("cart line".into()))?;
        if line.quantity > 1 {
            line.quantity -= 1;
        } else {
            self.lines.remove(index);
        }
        self.recompute_total();
        Ok(())
    }

    pub fn clear_cart(&mut self) -> Result<(), DomainError> {
        if self.step != Step::Shopping {
            return Err(DomainError::WrongStep);
        }
        self.lines.clear();
        self.recompute_total();
        Ok(())
    }

    pub fn begin_checkout(&mut self) -> Result<(), DomainError> {
        if self.step != Step::Shopping {
            return Err(DomainError::WrongStep);
        }
        if self.lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        self.step = Step::CollectingName;
        Ok(())
    }

    pub fn submit_name(&mut self, text: &str) -> Result<(), DomainError> {
        if self.step != Step::CollectingName {
            return Err(DomainError::WrongStep);
        }
        let name = text.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(DomainError::Validation(
                "please provide your full name".into(),
            ));
        }
        self.customer_name = Some(name.to_string());
        self.step = Step::CollectingPhone;
        Ok(())
    }

    pub fn submit_phone(&mut self, text: &str) -> Result<(), DomainError> {
        if self.step != Step::CollectingPhone {
            return Err(DomainError::WrongStep);
        }
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if !PHONE_PATTERN.is_match(&compact) {
            return Err(DomainError::Validation(
                "please use the +63 9XX XXX XXXX or 09XX XXX XXXX format".into(),
            ));
        }
        self.phone = Some(text.trim().to_string());
        self.step = Step::CollectingAddress;
        Ok(())
    }

    pub fn submit_address(&mut self, text: &str) -> Result<(), DomainError> {
        if self.step != Step::CollectingAddress {
            return Err(DomainError::WrongStep);
        }
        let address = text.trim();
        if address.chars().count() < MIN_ADDRESS_LEN {
            return Err(DomainError::Validation(
                "please provide a more complete address".into(),
            ));
        }
        self.address = Some(address.to_string());
        self.step = Step::SelectingTimeslot;
        Ok(())
    }

    pub fn offer_slots(&mut self, slots: Vec<String>) {
        self.offered_slots = slots;
    }

    pub fn select_slot(&mut self, index: usize) -> Result<(), DomainError> {
        if self.step != Step::SelectingTimeslot {
            return Err(DomainError::WrongStep);
        }
        let slot = self
            .offered_slots
            .get(index)
            .ok_or(DomainError::InvalidSlot)?;
        self.selected_slot = Some(slot.clone());
        self.step = Step::Reviewing;
        Ok(())
    }

    pub fn line_summaries(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| format!("{}x {}", line.quantity, line.name))
            .collect()
    }

    fn recompute_total(&mut self) {
        self.total = self.lines.iter().map(CartLine::subtotal).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::standard()
    }

    fn session_with_items() -> OrderSession {
        let catalog = catalog();
        let mut session = OrderSession::new();
        session.add_item(catalog.lookup(1).unwrap(), 2).unwrap();
        session.add_item(catalog.lookup(3).unwrap(), 1).unwrap();
        session
    }

    fn recomputed(session: &OrderSession) -> i64 {
        session.lines.iter().map(CartLine::subtotal).sum()
    }

    #[test]
    fn total_matches_sum_after_every_mutation() {
        let catalog = catalog();
        let mut session = OrderSession::new();

        session.add_item(catalog.lookup(1).unwrap(), 2).unwrap();
        assert_eq!(session.total, recomputed(&session));

        session.add_item(catalog.lookup(1).unwrap(), 1).unwrap();
        assert_eq!(session.total, recomputed(&session));

        session.add_item(catalog.lookup(5).unwrap(), 3).unwrap();
        assert_eq!(session.total, recomputed(&session));

        session.increment_line(0).unwrap();
        assert_eq!(session.total, recomputed(&session));

        session.decrement_line(1).unwrap();
        assert_eq!(session.total, recomputed(&session));

        session.clear_cart().unwrap();
        assert_eq!(session.total, 0);
    }

    #[test]
    fn adding_same_item_merges_lines() {
        let catalog = catalog();
        let mut session = OrderSession::new();
        session.add_item(catalog.lookup(2).unwrap(), 1).unwrap();
        session.add_item(catalog.lookup(2).unwrap(), 2).unwrap();
        assert_eq!(session.lines.len(), 1);
        assert_eq!(session.lines[0].quantity, 3);
    }

    #[test]
    fn captured_price_survives_separate_catalog_copies() {
        let mut session = OrderSession::new();
        let item = CatalogItem {
            number: 99,
            name: "Limited Combo".into(),
            price: 10000,
            variants: Vec::new(),
            promo: None,
        };
        session.add_item(&item, 1).unwrap();
        assert_eq!(session.lines[0].unit_price, 10000);
    }

    #[test]
    fn decrement_at_quantity_one_removes_the_line() {
        let catalog = catalog();
        let mut session = OrderSession::new();
        session.add_item(catalog.lookup(4).unwrap(), 1).unwrap();
        session.decrement_line(0).unwrap();
        assert!(session.lines.is_empty());
        assert_eq!(session.total, 0);
        assert!(!session.lines.iter().any(|line| line.quantity == 0));
    }

    #[test]
    fn line_index_out_of_range_is_not_found() {
        let mut session = session_with_items();
        assert_eq!(
            session.increment_line(9),
            Err(DomainError::NotFound("cart line".into()))
        );
        assert_eq!(
            session.decrement_line(9),
            Err(DomainError::NotFound("cart line".into()))
        );
    }

    #[test]
    fn checkout_requires_a_non_empty_cart() {
        let mut session = OrderSession::new();
        assert_eq!(session.begin_checkout(), Err(DomainError::EmptyCart));
        assert_eq!(session.step, Step::Shopping);
    }

    #[test]
    fn no_step_can_be_skipped() {
        let mut session = session_with_items();
        assert_eq!(session.submit_name("Juan"), Err(DomainError::WrongStep));
        assert_eq!(session.select_slot(0), Err(DomainError::WrongStep));

        session.begin_checkout().unwrap();
        assert_eq!(session.submit_phone("09171234567"), Err(DomainError::WrongStep));
        assert_eq!(
            session.submit_address("123 Mabini St, Manila"),
            Err(DomainError::WrongStep)
        );
    }

    #[test]
    fn cart_mutations_are_rejected_after_checkout_starts() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        assert_eq!(session.increment_line(0), Err(DomainError::WrongStep));
        assert_eq!(session.decrement_line(0), Err(DomainError::WrongStep));
        assert_eq!(session.clear_cart(), Err(DomainError::WrongStep));
    }

    #[test]
    fn name_requires_two_characters() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        assert!(matches!(
            session.submit_name("J"),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(session.step, Step::CollectingName);
        session.submit_name("Juan Dela Cruz").unwrap();
        assert_eq!(session.step, Step::CollectingPhone);
    }

    #[test]
    fn phone_validation_vectors() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        session.submit_name("Juan Dela Cruz").unwrap();

        assert!(matches!(
            session.submit_phone("12345"),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            session.submit_phone("08171234567"),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(session.step, Step::CollectingPhone);

        session.submit_phone("09171234567").unwrap();
        assert_eq!(session.step, Step::CollectingAddress);
    }

    #[test]
    fn phone_accepts_plus63_with_spaces() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        session.submit_name("Juan Dela Cruz").unwrap();
        session.submit_phone("+63 917 123 4567").unwrap();
        assert_eq!(session.phone.as_deref(), Some("+63 917 123 4567"));
    }

    #[test]
    fn address_requires_ten_characters() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        session.submit_name("Juan Dela Cruz").unwrap();
        session.submit_phone("09171234567").unwrap();

        assert!(matches!(
            session.submit_address("short"),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(session.step, Step::CollectingAddress);

        session
            .submit_address("123 Mabini St, Brgy. Uno, Manila")
            .unwrap();
        assert_eq!(session.step, Step::SelectingTimeslot);
    }

    #[test]
    fn slot_selection_is_bounded_by_offered_slots() {
        let mut session = session_with_items();
        session.begin_checkout().unwrap();
        session.submit_name("Juan Dela Cruz").unwrap();
        session.submit_phone("09171234567").unwrap();
        session
            .submit_address("123 Mabini St, Brgy. Uno, Manila")
            .unwrap();
        session.offer_slots(vec!["10:30 AM".into(), "11:00 AM".into()]);

        assert_eq!(session.select_slot(2), Err(DomainError::InvalidSlot));
        assert_eq!(session.step, Step::SelectingTimeslot);

        session.select_slot(0).unwrap();
        assert_eq!(session.selected_slot.as_deref(), Some("10:30 AM"));
        assert_eq!(session.step, Step::Reviewing);
    }

    #[test]
    fn line_summaries_freeze_quantity_and_name() {
        let session = session_with_items();
        assert_eq!(
            session.line_summaries(),
            vec!["2x Classic Milk Tea".to_string(), "1x Taro Milk Tea".to_string()]
        );
    }
}

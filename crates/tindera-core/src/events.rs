use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Order};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BusEvent {
    OrderCreated { order: Order },
    OrderUpdated { order: Order },
    MessageCreated { message: Message },
    QrCodeSent { order_id: Uuid },
    PaymentProofReceived { order_id: Uuid, payment_proof: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_camel_case_tags() {
        let event = BusEvent::QrCodeSent { order_id: Uuid::nil() };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "qrCodeSent");
        assert!(value["orderId"].is_string());

        let event = BusEvent::PaymentProofReceived {
            order_id: Uuid::nil(),
            payment_proof: "/uploads/proof.jpg".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "paymentProofReceived");
        assert_eq!(value["paymentProof"], "/uploads/proof.jpg");
    }
}

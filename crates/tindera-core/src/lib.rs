pub mod catalog;
pub mod errors;
pub mod events;
pub mod models;
pub mod money;
pub mod session;
pub mod slots;

pub use catalog::{Catalog, CatalogCategory, CatalogItem};
pub use errors::DomainError;
pub use events::BusEvent;
pub use models::{
    Message, NewMessage, NewOrder, NewTimelineEvent, Order, OrderPatch, OrderStatus, Sender,
    TimelineEvent,
};
pub use money::format_centavos;
pub use session::{CartLine, OrderSession, Step};
pub use slots::{available_slots, manila_now, manila_offset};

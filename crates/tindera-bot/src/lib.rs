pub mod actions;
pub mod controller;
pub mod registry;
pub mod render;
pub mod transport;

pub use actions::{Action, Command, InboundEvent, QuickOrder, parse_quick_order};
pub use controller::{Chat, Controller};
pub use registry::SessionRegistry;
pub use transport::{Button, ChatTransport, NoopTransport};

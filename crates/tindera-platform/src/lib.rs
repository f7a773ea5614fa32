pub mod bus;
pub mod config;
pub mod contracts;
pub mod db;

pub use bus::EventBus;
pub use config::ServiceConfig;
pub use contracts::{
    OperatorMessageRequest, OrderPatchRequest, SlotsResponse, StatsResponse,
};
pub use db::connect_database;

pub mod decimal;
pub mod gateway;
pub mod tables;

pub use gateway::{HttpStoreGateway, StoreGateway};
pub use tables::Table;

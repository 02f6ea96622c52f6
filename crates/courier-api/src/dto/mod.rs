//! Data Transfer Objects (DTOs) for API requests and responses

pub mod booking;
pub mod common;
pub mod consignment;
pub mod rate;

pub use booking::*;
pub use common::*;
pub use consignment::*;
pub use rate::*;

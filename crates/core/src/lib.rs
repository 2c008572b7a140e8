pub mod config;
pub mod domain;
pub mod errors;

pub use domain::order::{Order, OrderType};
pub use domain::session::{Message, Role, SessionId, Turn};
pub use errors::{ApplicationError, InterfaceError};

//! API handlers.

pub mod accounts;
pub mod bonus;
pub mod cases;
pub mod health;
pub mod settlements;

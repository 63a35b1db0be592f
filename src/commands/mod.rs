pub mod inventory;
pub mod plot;

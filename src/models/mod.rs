pub mod debtor;
pub mod dispenser;
pub mod fuel_type;
pub mod product;
pub mod sale;
pub mod shift;
pub mod tank;
pub mod user;

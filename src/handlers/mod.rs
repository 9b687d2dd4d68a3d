pub mod debtor;
pub mod dispenser;
pub mod fuel_type;
pub mod meter_reading;
pub mod product;
pub mod sale;
pub mod shift;
pub mod tank;
pub mod tank_reading;
pub mod tank_refill;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

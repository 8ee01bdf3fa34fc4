pub mod clients;
pub mod orders;
pub mod products;

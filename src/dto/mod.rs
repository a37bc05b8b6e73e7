pub mod admin;
pub mod appointments;
pub mod auth;
pub mod cart;
pub mod collections;
pub mod designers;
pub mod dresses;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod users;

pub mod appointments;
pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod collections;
pub mod designers;
pub mod dresses;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod users;

pub use appointments::Entity as Appointments;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use collections::Entity as Collections;
pub use designers::Entity as Designers;
pub use dresses::Entity as Dresses;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;

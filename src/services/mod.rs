pub mod admin_service;
pub mod appointment_service;
pub mod auth_service;
pub mod cart_service;
pub mod collection_service;
pub mod designer_service;
pub mod dress_service;
pub mod order_service;
pub mod payment_service;
pub mod review_service;
pub mod user_service;

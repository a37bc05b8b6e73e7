pub mod app;
pub mod audit;
pub mod config;
pub mod db;
pub mod db_access;
pub mod dto;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payment_gateway;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

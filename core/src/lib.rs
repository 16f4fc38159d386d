pub mod api;
pub mod db;
pub mod error;
pub mod galaxy;
pub mod models;
pub mod praise;
pub mod service;
pub mod sync;

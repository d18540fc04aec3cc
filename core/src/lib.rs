pub mod db;
pub mod export;
pub mod mealdb;
pub mod models;
pub mod service;
pub mod view;

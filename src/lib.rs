//! # Tie Shop
//!
//! An online tie shop run through a Telegram bot and a small web storefront.
//! Buyers browse a localized catalog, check out with validated recipient
//! details and follow their orders through payment review and delivery;
//! admins manage the catalog, move orders along, broadcast announcements and
//! pull a sales report.

pub mod bot;
pub mod broadcast;
pub mod callbacks;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod context;
pub mod db;
pub mod dialogue;
pub mod error;
pub mod json_store;
pub mod localization;
pub mod model;
pub mod notify;
pub mod order_lifecycle;
pub mod orders;
pub mod report;
pub mod router;
pub mod store;
pub mod web;

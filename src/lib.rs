//! `WasteLink`
//!
//! Headless engine behind the `WasteLink` waste-trading marketplace: listings and
//! marketplace filtering, cart pricing with promo codes and an undoable removal
//! window, the `TakaBot` chat simulation, the simulated M-Pesa checkout and the
//! waste scanner.

pub mod auth;
pub mod cart;
pub mod chat;
pub mod config;
pub mod discounts;
pub mod fixtures;
pub mod listings;
pub mod marketplace;
pub mod payment;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod promotions;
pub mod receipt;
pub mod scanner;
pub mod storage;

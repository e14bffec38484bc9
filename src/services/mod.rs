// src/services/mod.rs

//! Service layer: the order assembler, payment gateway adapter, payment
//! reconciliation engine, notification dispatcher, and auth mechanics.
//! Handlers stay thin and delegate the multi-step flows here.

pub mod auth;
pub mod gateway;
pub mod notifications;
pub mod orders;
pub mod reconciliation;

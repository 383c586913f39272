//! kibun-core — Pure domain logic, no UI.
//!
//! The advice engine, the live emotion detector, day-record storage and the
//! collaborators around them (weather, self-check questionnaires, calendar).
//! Frontends subscribe to detector and journal events via tokio::broadcast.

pub mod advice;
pub mod calendar;
pub mod config;
pub mod detector;
pub mod diagnosis;
pub mod events;
pub mod journal;
pub mod mood;
pub mod record;
pub mod store;
pub mod types;
pub mod weather;

//! Review sentiment web service.
//!
//! Authenticated users submit product reviews and get back a sentiment
//! label with a confidence score from a pretrained TF-IDF + linear model.
//! Accounts live at an external identity provider; sessions are kept
//! server-side.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;

pub use error::{AppError, Result};

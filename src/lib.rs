//! # Be.Well USSD - Subscriber Onboarding over USSD
//!
//! A USSD application server for feature-phone subscribers. A mobile network
//! gateway forwards every keystroke of a `*123#`-style dialog as an HTTP callback;
//! this crate answers each one with the next screen.
//!
//! ## Features
//!
//! - **Registration**: name, date of birth and PIN collected over five screens
//! - **PIN Login**: PBKDF2-derived credentials with constant-time verification and
//!   a per-session wrong-PIN limit
//! - **Self-service PIN**: change with the current PIN, reset with the date of birth
//!   on file, forced change after an operator-issued temporary PIN
//! - **Marketing Preference**: opt out of or back in to marketing through the CRM
//! - **Pluggable Storage**: async store traits with in-memory and file backends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bewell_ussd::config::Config;
//! use bewell_ussd::crm::InMemoryCrm;
//! use bewell_ussd::storage::memory::InMemoryStorage;
//! use bewell_ussd::ussd::{Collaborators, UssdEngine, UssdRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let collaborators = Collaborators::from_storage(
//!         Arc::new(InMemoryStorage::new()),
//!         Arc::new(InMemoryCrm::new()),
//!     );
//!     let engine = UssdEngine::new(collaborators, config.pin.clone(), config.ussd.clone())?;
//!
//!     let response = engine.handle(&UssdRequest::new("ATUid_1", "0712345678", "")).await;
//!     println!("{}", response);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`ussd`] - dialog engine, flows, prompts and wire rendering
//! - [`pin`] - PIN key derivation, verification and the credential service
//! - [`storage`] - collaborator traits and their in-memory and file backends
//! - [`crm`] - marketing preference collaborator
//! - [`server`] - axum HTTP adapter for the gateway
//! - [`config`] - TOML configuration
//! - [`validation`] - input parsing for PINs, phone numbers, names and dates
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP Server   │ ← gateway callbacks, timeout
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   USSD Engine   │ ← dialog state machine
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Stores / CRM   │ ← profiles, PINs, sessions, events
//! └─────────────────┘
//! ```

pub mod config;
pub mod crm;
pub mod error;
pub mod logutil;
pub mod metrics;
pub mod pin;
pub mod server;
pub mod storage;
pub mod ussd;
pub mod validation;

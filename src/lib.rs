//! Vet Agent Wizard: guided setup for veterinary clinic WhatsApp and
//! voice agents.

pub mod config;
pub mod error;
pub mod services;
pub mod simulator;
pub mod wizard;

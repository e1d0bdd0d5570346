//! WhatsApp Relay
//!
//! HTTP service that sends WhatsApp text messages, images, files and
//! HTML-rendered PDFs through a single paired WhatsApp Web session, plus a
//! standalone HTML-to-PDF endpoint.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod messaging;
pub mod phone;
pub mod render;
pub mod session;

#[cfg(test)]
mod tests;

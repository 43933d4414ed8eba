//! Client library for the Advosia legal-services marketplace.
//!
//! The pieces, bottom-up: durable session storage, the session store, the REST
//! resource client, the authorization gate, and the view controllers the terminal
//! client drives.

pub mod client;
pub mod common;

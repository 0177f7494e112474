#![allow(clippy::unwrap_used, clippy::expect_used)]

mod utils;

mod acme;
mod incoming;
mod outgoing;
mod reconciliation;
mod redirect;

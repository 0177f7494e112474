#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

mod airwallex;
mod alikassa;
mod blockonomics;
mod firekassa;
mod utils;

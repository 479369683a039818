//! Side-effecting pieces: child processes, config files, and the JSON ledgers.

pub mod achievements;
pub mod config;
pub mod process;
pub mod progress;
pub mod runtime;
pub mod shares;

mod json_store;

use rand::{Rng, distributions::Alphanumeric};

/// Random alphanumeric string for nonces and share tokens.
pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

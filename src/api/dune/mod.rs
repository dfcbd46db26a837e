pub mod client;
pub mod models;

#[cfg(test)]
pub mod test_server;

pub use client::DuneClient;

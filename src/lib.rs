pub mod alerts;
pub mod api;
pub mod config;
pub mod ledger;
pub mod notify;
pub mod observability;
pub mod registry;
pub mod threads;

#[cfg(test)]
mod test_support;

pub mod amount;
pub mod chain_rules;
pub mod configuration;
pub mod constants;
pub mod derived_state;
pub mod error;
pub mod estimation;
pub mod ethereum_client;
pub mod executor;
pub mod gas_price;
pub mod recipient;
pub mod routing;
pub mod swap_call;
pub mod swap_callback;
pub mod transactions;
pub mod types;
pub mod url_params;

#[cfg(test)]
mod testing;

//! Test doubles for the connectivity layer: a scriptable injected-wallet
//! provider and an in-memory registry contract that honors the ABI of the
//! fixed method set.

mod registry;
mod wallet;

pub use registry::{MockRegistry, ProductRecord};
pub use wallet::{Gate, MockWallet, REGISTRY_ADDRESS};

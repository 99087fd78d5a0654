use crate::{GatewayError, RegistryGateway};
use tc_api_types::AccountAddress;

/// Derived authorization flags for the connected account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_seller: bool,
}

/// Pure pair of gateway reads: the contract's admin address compared to the
/// account, and the seller-registry membership check.
pub async fn resolve_roles(
    gateway: &RegistryGateway,
    account: &AccountAddress,
) -> Result<RoleFlags, GatewayError> {
    let admin = gateway.admin().await?;
    let is_seller = gateway.is_seller(account).await?;
    Ok(RoleFlags {
        is_admin: admin == *account,
        is_seller,
    })
}

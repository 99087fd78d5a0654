use crate::abi::{self, AbiValue};
use crate::methods::{self, MethodDescriptor};
use crate::GatewayError;
use std::sync::Arc;
use tc_api_types::AccountAddress;
use tc_provider::{SigningHandle, TransactionRequest, WalletProvider};
use tc_rpc::{EndpointPool, RetryPolicy, RpcClient, TxReceipt};
use tracing::debug;

/// Gateway to the product-registry contract.
///
/// Reads route through the fallback endpoint pool when one is configured
/// (no wallet involvement for a read), otherwise through the provider
/// adapter. Writes go through the bound signing handle only, and resolve
/// once the transaction is confirmed.
pub struct RegistryGateway {
    contract: AccountAddress,
    provider: Arc<dyn WalletProvider>,
    signer: Option<Arc<dyn SigningHandle>>,
    pool: EndpointPool,
    client: RpcClient,
    retry: RetryPolicy,
}

impl RegistryGateway {
    pub fn bound(
        contract: AccountAddress,
        provider: Arc<dyn WalletProvider>,
        signer: Arc<dyn SigningHandle>,
        pool: EndpointPool,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            contract,
            provider,
            signer: Some(signer),
            pool,
            client: RpcClient::new(),
            retry,
        }
    }

    /// A gateway with no signing handle; every `send` fails with
    /// `SigningUnavailable` while reads keep working.
    pub fn read_only(
        contract: AccountAddress,
        provider: Arc<dyn WalletProvider>,
        pool: EndpointPool,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            contract,
            provider,
            signer: None,
            pool,
            client: RpcClient::new(),
            retry,
        }
    }

    pub fn contract(&self) -> &AccountAddress {
        &self.contract
    }

    pub fn bound_account(&self) -> Option<&AccountAddress> {
        self.signer.as_deref().map(SigningHandle::account)
    }

    /// The `{ call, send }` surface for one method. Both this adapter and
    /// the direct methods funnel through the same two execution paths, so
    /// behavior is identical whichever convention the caller was written
    /// against.
    pub fn method(&self, descriptor: &'static MethodDescriptor) -> MethodAdapter<'_> {
        MethodAdapter {
            gateway: self,
            descriptor,
        }
    }

    pub fn method_named(&self, name: &str) -> Option<MethodAdapter<'_>> {
        methods::descriptor(name).map(|descriptor| self.method(descriptor))
    }

    async fn execute_read(&self, data: &[u8]) -> Result<Vec<u8>, GatewayError> {
        if self.pool.is_empty() {
            return Ok(self.provider.read_call(&self.contract, data).await?);
        }
        let client = &self.client;
        let contract = &self.contract;
        let bytes = self
            .pool
            .execute_with_fallback(&self.retry, |url| async move {
                client.call(&url, contract, data).await
            })
            .await?;
        Ok(bytes)
    }

    async fn execute_write(&self, data: &[u8]) -> Result<TxReceipt, GatewayError> {
        let signer = self.signer.as_ref().ok_or(GatewayError::SigningUnavailable)?;
        let request = TransactionRequest::new(
            signer.account().clone(),
            self.contract.clone(),
            data.to_vec(),
        );
        let hash = signer.send_transaction(&request).await?;
        debug!(tx = %hash, "transaction submitted, awaiting confirmation");
        let receipt = signer.confirm(&hash).await?;
        if !receipt.status {
            return Err(GatewayError::Reverted {
                hash: receipt.transaction_hash,
            });
        }
        Ok(receipt)
    }
}

/// `call`/`send` adapter bound to one method descriptor.
pub struct MethodAdapter<'g> {
    gateway: &'g RegistryGateway,
    descriptor: &'static MethodDescriptor,
}

impl MethodAdapter<'_> {
    pub fn descriptor(&self) -> &'static MethodDescriptor {
        self.descriptor
    }

    fn encode(&self, args: &[AbiValue]) -> Result<Vec<u8>, GatewayError> {
        if args.len() != self.descriptor.arity {
            return Err(GatewayError::Arity {
                method: self.descriptor.name,
                expected: self.descriptor.arity,
                got: args.len(),
            });
        }
        Ok(abi::encode_call(self.descriptor.selector(), args))
    }

    /// Read path: `eth_call` semantics, valid for any method.
    pub async fn call(&self, args: &[AbiValue]) -> Result<Vec<u8>, GatewayError> {
        let data = self.encode(args)?;
        self.gateway.execute_read(&data).await
    }

    /// Write path: signed submission plus confirmation wait.
    pub async fn send(&self, args: &[AbiValue]) -> Result<TxReceipt, GatewayError> {
        let data = self.encode(args)?;
        self.gateway.execute_write(&data).await
    }
}

macro_rules! registry_views {
    ($( $fn_name:ident ( $( $arg:ident : $ty:ty => $conv:expr ),* ) -> $ret:ty = $desc:ident / $decode:path; )*) => {
        impl RegistryGateway {
            $(
                pub async fn $fn_name(&self, $($arg: $ty),*) -> Result<$ret, GatewayError> {
                    let data = self.method(&methods::$desc).call(&[$($conv),*]).await?;
                    $decode(&data)
                }
            )*
        }
    };
}

macro_rules! registry_sends {
    ($( $fn_name:ident ( $( $arg:ident : $ty:ty => $conv:expr ),* ) = $desc:ident; )*) => {
        impl RegistryGateway {
            $(
                pub async fn $fn_name(&self, $($arg: $ty),*) -> Result<TxReceipt, GatewayError> {
                    self.method(&methods::$desc).send(&[$($conv),*]).await
                }
            )*
        }
    };
}

registry_views! {
    admin() -> AccountAddress = ADMIN / abi::decode_address;
    is_seller(account: &AccountAddress => AbiValue::Address(account.clone())) -> bool = IS_SELLER / abi::decode_bool;
    product_owner(id: &str => AbiValue::Str(id.to_owned())) -> AccountAddress = PRODUCT_OWNER / abi::decode_address;
    verify_product(id: &str => AbiValue::Str(id.to_owned())) -> bool = VERIFY_PRODUCT / abi::decode_bool;
    successor_of(owner: &AccountAddress => AbiValue::Address(owner.clone())) -> AccountAddress = SUCCESSOR_OF / abi::decode_address;
}

registry_sends! {
    register_product(id: &str => AbiValue::Str(id.to_owned()), name: &str => AbiValue::Str(name.to_owned())) = REGISTER_PRODUCT;
    transfer_product(id: &str => AbiValue::Str(id.to_owned()), to: &AccountAddress => AbiValue::Address(to.clone())) = TRANSFER_PRODUCT;
    add_seller(account: &AccountAddress => AbiValue::Address(account.clone())) = ADD_SELLER;
    declare_successor(heir: &AccountAddress => AbiValue::Address(heir.clone())) = DECLARE_SUCCESSOR;
}

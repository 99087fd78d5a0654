use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tc_api_types::{AccountAddress, ChainId, ErrorKind};
use tc_gateway::abi::{self, AbiValue};
use tc_gateway::{
    ADMIN, GatewayError, IS_SELLER, METHODS, MethodKind, RegistryGateway, TRANSFER_PRODUCT,
    resolve_roles,
};
use tc_provider::WalletProvider;
use tc_rpc::{EndpointPool, RetryPolicy};
use tc_testing::MockWallet;

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        initial_delay: Duration::from_millis(1),
        backoff_factor: 1.0,
    }
}

async fn bound_gateway(wallet: &MockWallet, account: &AccountAddress) -> RegistryGateway {
    let provider: Arc<dyn WalletProvider> = Arc::new(wallet.clone());
    let handle = provider
        .signing_handle(account)
        .await
        .expect("signing handle for authorized account");
    RegistryGateway::bound(
        wallet.registry_address(),
        provider,
        handle,
        EndpointPool::default(),
        policy(),
    )
}

fn read_only_gateway(wallet: &MockWallet) -> RegistryGateway {
    RegistryGateway::read_only(
        wallet.registry_address(),
        Arc::new(wallet.clone()),
        EndpointPool::default(),
        policy(),
    )
}

#[tokio::test]
async fn every_descriptor_is_reachable_by_name() {
    let wallet = MockWallet::installed(ChainId(17000));
    let gateway = read_only_gateway(&wallet);
    for descriptor in METHODS {
        let adapter = gateway
            .method_named(descriptor.name)
            .expect("descriptor reachable by name");
        assert!(std::ptr::eq(adapter.descriptor(), descriptor));
    }
    assert!(gateway.method_named("burn").is_none());
}

#[tokio::test]
async fn direct_views_and_call_adapters_agree() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let admin = wallet.primary_account();
    let seller = wallet.add_account();
    wallet.registry(|registry| {
        registry.set_admin(admin.clone());
        registry.grant_seller(seller.clone());
    });
    let gateway = bound_gateway(&wallet, &admin).await;

    let direct = gateway.admin().await?;
    let raw = gateway.method(&ADMIN).call(&[]).await?;
    assert_eq!(direct, abi::decode_address(&raw)?);
    assert_eq!(direct, admin);

    for account in [&admin, &seller] {
        let direct = gateway.is_seller(account).await?;
        let raw = gateway
            .method(&IS_SELLER)
            .call(&[AbiValue::Address(account.clone())])
            .await?;
        assert_eq!(direct, abi::decode_bool(&raw)?);
    }
    assert!(gateway.is_seller(&seller).await?);
    assert!(!gateway.is_seller(&admin).await?);
    Ok(())
}

#[tokio::test]
async fn direct_sends_and_send_adapters_agree() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let seller = wallet.primary_account();
    wallet.registry(|registry| registry.grant_seller(seller.clone()));
    let gateway = bound_gateway(&wallet, &seller).await;

    let direct_receipt = gateway.register_product("serial-1", "Widget").await?;
    assert!(direct_receipt.status);
    assert!(direct_receipt.block_number.is_some());

    let adapter = gateway.method_named("register_product").unwrap();
    assert_eq!(adapter.descriptor().kind, MethodKind::Transact);
    let wrapped_receipt = adapter
        .send(&[
            AbiValue::Str("serial-2".to_owned()),
            AbiValue::Str("Widget".to_owned()),
        ])
        .await?;
    assert!(wrapped_receipt.status);

    // Both writes are confirmed before the calls resolve, so the state is
    // immediately readable.
    assert_eq!(gateway.product_owner("serial-1").await?, seller);
    assert_eq!(gateway.product_owner("serial-2").await?, seller);
    assert!(gateway.verify_product("serial-1").await?);
    assert!(!gateway.verify_product("serial-3").await?);
    Ok(())
}

#[tokio::test]
async fn reverted_writes_classify_identically_across_styles() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let seller = wallet.primary_account();
    let outsider = wallet.add_account();
    wallet.registry(|registry| registry.grant_seller(seller.clone()));

    let seller_gateway = bound_gateway(&wallet, &seller).await;
    seller_gateway.register_product("serial-1", "Widget").await?;

    // The outsider does not own serial-1; the transfer reverts on-chain.
    let outsider_gateway = bound_gateway(&wallet, &outsider).await;
    let direct = outsider_gateway
        .transfer_product("serial-1", &outsider)
        .await
        .unwrap_err();
    let wrapped = outsider_gateway
        .method(&TRANSFER_PRODUCT)
        .send(&[
            AbiValue::Str("serial-1".to_owned()),
            AbiValue::Address(outsider.clone()),
        ])
        .await
        .unwrap_err();

    assert!(matches!(direct, GatewayError::Reverted { .. }));
    assert_eq!(direct.kind(), ErrorKind::TransactionFailed);
    assert_eq!(wrapped.kind(), ErrorKind::TransactionFailed);

    // Ownership unchanged after the reverts.
    assert_eq!(seller_gateway.product_owner("serial-1").await?, seller);
    Ok(())
}

#[tokio::test]
async fn read_failures_classify_identically_across_styles() {
    let wallet = MockWallet::installed(ChainId(17000));
    let account = wallet.primary_account();
    let gateway = bound_gateway(&wallet, &account).await;
    wallet.set_fail_reads(true);

    let direct = gateway.admin().await.unwrap_err();
    let wrapped = gateway.method(&ADMIN).call(&[]).await.unwrap_err();
    assert_eq!(direct.kind(), ErrorKind::RpcUnavailable);
    assert_eq!(wrapped.kind(), ErrorKind::RpcUnavailable);
}

#[tokio::test]
async fn read_only_gateway_refuses_to_send() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let admin = wallet.primary_account();
    wallet.registry(|registry| registry.set_admin(admin.clone()));
    let gateway = read_only_gateway(&wallet);

    assert!(gateway.bound_account().is_none());
    assert_eq!(gateway.admin().await?, admin);

    let err = gateway.register_product("serial-1", "Widget").await.unwrap_err();
    assert!(matches!(err, GatewayError::SigningUnavailable));
    assert_eq!(err.kind(), ErrorKind::SigningUnavailable);
    Ok(())
}

#[tokio::test]
async fn adapter_rejects_wrong_arity() {
    let wallet = MockWallet::installed(ChainId(17000));
    let gateway = read_only_gateway(&wallet);
    let err = gateway.method(&IS_SELLER).call(&[]).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Arity {
            method: "is_seller",
            expected: 1,
            got: 0,
        }
    ));
}

#[tokio::test]
async fn succession_flow_roundtrips() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let owner = wallet.primary_account();
    let heir = wallet.add_account();
    let gateway = bound_gateway(&wallet, &owner).await;

    let zero = AccountAddress::from_bytes(&[0_u8; 20]);
    assert_eq!(gateway.successor_of(&owner).await?, zero);

    gateway.declare_successor(&heir).await?;
    assert_eq!(gateway.successor_of(&owner).await?, heir);
    Ok(())
}

#[tokio::test]
async fn roles_resolve_per_account() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let admin = wallet.primary_account();
    let seller = wallet.add_account();
    let nobody = wallet.add_account();
    wallet.registry(|registry| {
        registry.set_admin(admin.clone());
        registry.grant_seller(seller.clone());
    });
    let gateway = bound_gateway(&wallet, &admin).await;

    let flags = resolve_roles(&gateway, &admin).await?;
    assert!(flags.is_admin && !flags.is_seller);

    let flags = resolve_roles(&gateway, &seller).await?;
    assert!(!flags.is_admin && flags.is_seller);

    let flags = resolve_roles(&gateway, &nobody).await?;
    assert!(!flags.is_admin && !flags.is_seller);
    Ok(())
}

#[tokio::test]
async fn admin_can_grant_sellers_on_chain() -> Result<()> {
    let wallet = MockWallet::installed(ChainId(17000));
    let admin = wallet.primary_account();
    let newcomer = wallet.add_account();
    wallet.registry(|registry| registry.set_admin(admin.clone()));
    let gateway = bound_gateway(&wallet, &admin).await;

    assert!(!gateway.is_seller(&newcomer).await?);
    gateway.add_seller(&newcomer).await?;
    assert!(gateway.is_seller(&newcomer).await?);

    // Non-admin attempts revert.
    let outsider_gateway = bound_gateway(&wallet, &newcomer).await;
    let err = outsider_gateway.add_seller(&newcomer).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    Ok(())
}

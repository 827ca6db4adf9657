//! # Registry Flows
//!
//! Drives `RpcProductRegistry` over real HTTP JSON-RPC against the fake node:
//!
//! 1. **Write path**: `eth_sendTransaction` then receipt polling until mined
//! 2. **Read path**: `eth_call` with ABI-decoded results
//! 3. **Reverts**: both node error styles surface as `ContractError::Reverted`

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use digiseal_types::{Address, ProductRegistration, ProductStatus, Role};
    use product_contract::{ContractError, ProductRegistry, RegistryConfig, RpcProductRegistry};

    use crate::FakeNode;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn registration(id: &str) -> ProductRegistration {
        ProductRegistration {
            product_id: id.to_string(),
            manufacturer_name: "Acme Leather".to_string(),
            product_details: "Handbag, brown, serial 77".to_string(),
            manufacturing_location: "Florence".to_string(),
        }
    }

    fn registry_for(node: &FakeNode) -> RpcProductRegistry {
        let mut config = RegistryConfig::new(node.contract());
        config.request_timeout = Duration::from_secs(5);
        config.receipt_timeout = Duration::from_secs(2);
        config.receipt_poll_interval = Duration::from_millis(10);
        RpcProductRegistry::new(node.url(), config).unwrap()
    }

    // =============================================================================
    // WRITE PATH
    // =============================================================================

    #[tokio::test]
    async fn test_register_then_read_back() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);

        let receipt = registry
            .register_product(&registration("BAG-100"))
            .await
            .unwrap();
        assert_eq!(receipt.block_number, Some(1));

        let product = registry.get_product_details("BAG-100").await.unwrap();
        assert_eq!(product.product_id, "BAG-100");
        assert_eq!(product.manufacturer, node.account());
        assert_eq!(product.current_owner, node.account());
        assert_eq!(product.status, ProductStatus::Created);
        assert_eq!(product.manufacturing_location, "Florence");
        assert!(product.is_authentic);

        assert_eq!(
            registry.get_products_manufactured(node.account()).await.unwrap(),
            vec!["BAG-100".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sender_is_first_unlocked_account() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);

        assert_eq!(registry.sender().await.unwrap(), node.account());
        registry.register_product(&registration("BAG-101")).await.unwrap();
        registry.register_product(&registration("BAG-102")).await.unwrap();

        // Resolved once, then cached
        let lookups = node
            .methods()
            .iter()
            .filter(|m| m.as_str() == "eth_accounts")
            .count();
        assert_eq!(lookups, 1);
    }

    #[tokio::test]
    async fn test_waits_for_slow_mining() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);
        node.delay_receipts(3);

        registry.register_product(&registration("BAG-103")).await.unwrap();

        let polls = node
            .methods()
            .iter()
            .filter(|m| m.as_str() == "eth_getTransactionReceipt")
            .count();
        assert_eq!(polls, 4);
    }

    #[tokio::test]
    async fn test_receipt_timeout() {
        let node = FakeNode::spawn().await.unwrap();
        let mut config = RegistryConfig::new(node.contract());
        config.receipt_timeout = Duration::from_millis(100);
        config.receipt_poll_interval = Duration::from_millis(10);
        let registry = RpcProductRegistry::new(node.url(), config).unwrap();
        node.delay_receipts(usize::MAX);

        let err = registry
            .register_product(&registration("BAG-104"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ReceiptTimeout { .. }));
    }

    // =============================================================================
    // OWNERSHIP AND HISTORY
    // =============================================================================

    #[tokio::test]
    async fn test_supply_chain_history() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);
        let seller = Address::repeat_byte(0x5e);

        registry.register_product(&registration("BAG-105")).await.unwrap();
        registry.register_seller(seller).await.unwrap();
        assert!(registry.has_specific_role(Role::Seller, seller).await.unwrap());

        registry.verify_product("BAG-105").await.unwrap();
        registry.transfer_ownership("BAG-105", seller).await.unwrap();

        let product = registry.get_product_details("BAG-105").await.unwrap();
        assert_eq!(product.current_owner, seller);
        assert_eq!(product.status, ProductStatus::WithSeller);

        let transfers = registry.get_transfer_history("BAG-105").await.unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].from, node.account());
        assert_eq!(transfers[0].to, seller);

        let verifications = registry.get_verification_history("BAG-105").await.unwrap();
        assert_eq!(verifications.len(), 1);
        assert_eq!(verifications[0].verifier, node.account());
        assert!(verifications[0].is_authentic);

        assert_eq!(
            registry.get_products_owned(seller).await.unwrap(),
            vec!["BAG-105".to_string()]
        );
        assert!(registry.get_products_owned(node.account()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counterfeit_report() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);

        registry.register_product(&registration("BAG-106")).await.unwrap();
        registry
            .report_counterfeit("BAG-106", "stitching does not match")
            .await
            .unwrap();
        registry.verify_product("BAG-106").await.unwrap();

        let product = registry.get_product_details("BAG-106").await.unwrap();
        assert_eq!(product.status, ProductStatus::Reported);
        assert!(!product.is_authentic);

        let verifications = registry.get_verification_history("BAG-106").await.unwrap();
        assert!(!verifications[0].is_authentic);
    }

    #[tokio::test]
    async fn test_roles() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);
        let stranger = Address::repeat_byte(0x77);

        assert!(registry.has_specific_role(Role::Admin, node.account()).await.unwrap());
        assert!(registry
            .has_specific_role(Role::Manufacturer, node.account())
            .await
            .unwrap());
        assert!(!registry.has_specific_role(Role::Seller, node.account()).await.unwrap());
        assert!(!registry.has_specific_role(Role::Admin, stranger).await.unwrap());
    }

    // =============================================================================
    // REVERTS
    // =============================================================================

    #[tokio::test]
    async fn test_call_revert_reason() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);

        let err = registry.get_product_details("MISSING").await.unwrap_err();
        assert_eq!(err.revert_reason(), Some("Product does not exist"));
    }

    #[tokio::test]
    async fn test_transaction_revert_reason() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);

        registry.register_product(&registration("BAG-107")).await.unwrap();
        let err = registry
            .register_product(&registration("BAG-107"))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some("Product already exists"));

        let err = registry.verify_product("MISSING").await.unwrap_err();
        assert!(err.is_revert());
    }

    #[tokio::test]
    async fn test_transfer_by_non_owner_reverts() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);
        let buyer = Address::repeat_byte(0xb0);

        registry.register_product(&registration("BAG-108")).await.unwrap();
        registry.transfer_ownership("BAG-108", buyer).await.unwrap();

        // The node account no longer owns it
        let err = registry
            .transfer_ownership("BAG-108", node.account())
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some("Only the current owner can transfer"));
        assert_eq!(
            registry.get_product_details("BAG-108").await.unwrap().status,
            ProductStatus::InTransit
        );
    }

    #[tokio::test]
    async fn test_wrong_contract_address() {
        let node = FakeNode::spawn().await.unwrap();
        let mut config = RegistryConfig::new(Address::repeat_byte(0x01));
        config.receipt_poll_interval = Duration::from_millis(10);
        let registry = RpcProductRegistry::new(node.url(), config).unwrap();

        let err = registry.get_product_details("BAG-109").await.unwrap_err();
        assert!(matches!(err, ContractError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_ping() {
        let node = FakeNode::spawn().await.unwrap();
        let registry = registry_for(&node);
        registry.ping().await.unwrap();

        let url = node.url().to_string();
        drop(node);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let offline = RpcProductRegistry::new(url, RegistryConfig::new(Address::zero())).unwrap();
        assert!(offline.ping().await.is_err());
    }
}

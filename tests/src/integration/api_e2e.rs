//! # API End-to-End
//!
//! The full request path a scanning app or the `digiseal` CLI takes:
//!
//! ```text
//! DigiSealClient --HTTP--> ApiService --JSON-RPC--> FakeNode (contract)
//! ```
//!
//! The API is served on an ephemeral port through `ApiService::serve`, so the
//! middleware stack and the JSON-RPC binding run exactly as deployed.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use digiseal_api::{ApiService, ServerConfig, ShutdownHandle};
    use digiseal_cli::{product_id_from_payload, ClientError, DigiSealClient};
    use digiseal_types::{format_address, Address, ProductRegistration, ProductStatus, Role};
    use reqwest::StatusCode;
    use tokio::task::JoinHandle;

    use crate::FakeNode;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Stack {
        node: FakeNode,
        client: DigiSealClient,
        addr: SocketAddr,
        shutdown: Option<ShutdownHandle>,
        server: JoinHandle<()>,
    }

    impl Stack {
        async fn start() -> Self {
            let node = FakeNode::spawn().await.unwrap();

            let mut config = ServerConfig::default();
            config.blockchain.url = node.url().to_string();
            config.blockchain.contract_address = Some(format_address(&node.contract()));
            config.blockchain.receipt_timeout = Duration::from_secs(2);
            config.blockchain.receipt_poll_interval = Duration::from_millis(10);
            config.timeouts.request = Duration::from_secs(10);
            config.timeouts.rpc = Duration::from_secs(5);

            let mut service = ApiService::from_config(config).unwrap();
            let shutdown = service.shutdown_handle();

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server = tokio::spawn(async move {
                service.serve(listener).await.unwrap();
            });

            let client =
                DigiSealClient::new(format!("http://{}", addr), Duration::from_secs(10)).unwrap();

            Self {
                node,
                client,
                addr,
                shutdown,
                server,
            }
        }

        fn maker(&self) -> String {
            format_address(&self.node.account())
        }

        async fn stop(mut self) {
            if let Some(handle) = self.shutdown.take() {
                handle.shutdown();
            }
            tokio::time::timeout(Duration::from_secs(5), &mut self.server)
                .await
                .expect("server did not stop")
                .unwrap();
        }
    }

    fn registration(id: &str) -> ProductRegistration {
        ProductRegistration {
            product_id: id.to_string(),
            manufacturer_name: "Acme Leather".to_string(),
            product_details: "Handbag, brown".to_string(),
            manufacturing_location: "Florence".to_string(),
        }
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_health_reports_connected_node() {
        let stack = Stack::start().await;

        let health = stack.client.health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "digiseal-api");
        assert_eq!(health.blockchain.as_deref(), Some("connected"));

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_register_and_verify_from_qr_payload() {
        let stack = Stack::start().await;

        let outcome = stack.client.register(&registration("BAG-200")).await.unwrap();
        assert_eq!(outcome.message, "Product registered successfully");
        assert_eq!(outcome.product_id, "BAG-200");
        assert!(outcome.transaction_hash.starts_with("0x"));
        assert_eq!(outcome.transaction_hash.len(), 66);

        let product_id =
            product_id_from_payload("https://digiseal.example/verify?productId=BAG-200").unwrap();
        let verified = stack.client.verify(&product_id).await.unwrap();
        assert!(verified.is_authentic);
        assert_eq!(verified.product.manufacturer_name, "Acme Leather");
        assert_eq!(verified.product.manufacturer, stack.node.account());

        let history = stack.client.history("BAG-200").await.unwrap();
        assert!(history.transfer_history.is_empty());
        assert_eq!(history.verification_history.len(), 1);

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let stack = Stack::start().await;

        let err = stack.client.product("FAKE-1").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "Product not found (HTTP 404 Not Found)");

        let err = stack.client.verify("FAKE-1").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_seller_handoff_and_sale() {
        let stack = Stack::start().await;
        let seller = Address::repeat_byte(0x5e);
        let seller_hex = format_address(&seller);
        let buyer = format_address(&Address::repeat_byte(0xb0));

        stack.client.register(&registration("BAG-201")).await.unwrap();
        let granted = stack.client.register_seller(&seller_hex).await.unwrap();
        assert_eq!(granted.message, "Seller registered successfully");

        let check = stack.client.has_role(&seller_hex, Role::Seller).await.unwrap();
        assert!(check.has_role);

        let moved = stack.client.transfer("BAG-201", &seller_hex).await.unwrap();
        assert_eq!(moved.message, "Ownership transferred successfully");
        let product = stack.client.product("BAG-201").await.unwrap().product;
        assert_eq!(product.status, ProductStatus::WithSeller);
        assert_eq!(product.current_owner, seller);

        let owned = stack.client.owned(&seller_hex).await.unwrap();
        assert_eq!(owned.products, vec!["BAG-201".to_string()]);
        let made = stack.client.manufactured(&stack.maker()).await.unwrap();
        assert_eq!(made.products, vec!["BAG-201".to_string()]);

        // The API's node account is no longer the owner
        let err = stack.client.transfer("BAG-201", &buyer).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().contains("Only the current owner can transfer"));

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_counterfeit_report_flips_verification() {
        let stack = Stack::start().await;

        stack.client.register(&registration("BAG-202")).await.unwrap();
        let report = stack
            .client
            .report("BAG-202", "serial number reused")
            .await
            .unwrap();
        assert_eq!(report.message, "Counterfeit report submitted successfully");

        let verified = stack.client.verify("BAG-202").await.unwrap();
        assert!(!verified.is_authentic);
        assert_eq!(verified.product.status, ProductStatus::Reported);

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_account_roles() {
        let stack = Stack::start().await;

        let roles = stack.client.roles(&stack.maker()).await.unwrap();
        assert_eq!(roles.address, stack.maker());
        assert!(roles.roles.manufacturer);
        assert!(roles.roles.admin);
        assert!(!roles.roles.seller);

        let err = stack.client.roles("0x1234").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_duplicate_registration_reports_revert() {
        let stack = Stack::start().await;

        stack.client.register(&registration("BAG-203")).await.unwrap();
        match stack.client.register(&registration("BAG-203")).await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(message.starts_with("Failed to register product"));
                assert!(message.contains("Product already exists"));
            }
            other => panic!("unexpected result: {:?}", other.map(|o| o.product_id)),
        }

        stack.stop().await;
    }

    #[tokio::test]
    async fn test_node_down_degrades_health() {
        let stack = Stack::start().await;
        let Stack {
            node,
            client,
            addr,
            shutdown,
            server,
        } = stack;
        drop(node);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let health = client.health().await.unwrap();
        assert_eq!(health.status, "degraded");
        assert_eq!(health.blockchain.as_deref(), Some("unreachable"));

        let err = client.product("BAG-204").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        // Raw request without the client, checking the envelope shape
        let body: serde_json::Value = reqwest::get(format!("http://{}/api/products/BAG-204", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Failed to"));

        if let Some(handle) = shutdown {
            handle.shutdown();
        }
        server.await.unwrap();
    }
}

//! Deployment through the JSON-RPC client against a mocked node.

use std::time::Duration;

use alloy_core::{
    json_abi::JsonAbi,
    primitives::{Bytes, address},
};
use paymaster_deploy::{
    ConfirmationPolicy, ContractArtifact, Credential, DeployConfig, Deployer, DeploymentError,
    DeploymentTarget, InMemoryArtifacts, NetworkConfig, ProjectConfig, RpcChainClient,
    resolve_compiler_config,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method},
};

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

async fn respond(server: &MockServer, rpc_method: &str, body: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn result(server: &MockServer, rpc_method: &str, result: Value) {
    respond(
        server,
        rpc_method,
        json!({ "jsonrpc": "2.0", "id": 1, "result": result }),
    )
    .await;
}

/// A node answering every query of a deployment of the first contract of the dev account.
async fn mock_node(send_raw: Value) -> MockServer {
    let server = MockServer::start().await;
    result(&server, "eth_chainId", json!("0x7a69")).await;
    result(&server, "eth_getTransactionCount", json!("0x0")).await;
    result(&server, "eth_gasPrice", json!("0x3b9aca00")).await;
    result(&server, "eth_estimateGas", json!("0x1e8480")).await;
    respond(&server, "eth_sendRawTransaction", send_raw).await;
    result(
        &server,
        "eth_getTransactionReceipt",
        json!({
            "transactionHash": tx_hash(),
            "blockNumber": "0x1",
            "gasUsed": "0x16e360",
            "status": "0x1",
            "contractAddress": "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        }),
    )
    .await;
    server
}

fn deploy_config(url: &str) -> DeployConfig {
    DeployConfig {
        compilers: resolve_compiler_config(&ProjectConfig::default()).unwrap(),
        network: NetworkConfig {
            name: "localhost".to_string(),
            url: url.parse().unwrap(),
            accounts: vec![Credential::new(DEV_KEY)],
            chain_id: Some(31337),
            gas_price: None,
            gas_limit: None,
            confirmation: ConfirmationPolicy {
                timeout: Duration::from_secs(1),
                poll_interval: Duration::from_millis(10),
            },
        },
    }
}

fn registry() -> InMemoryArtifacts {
    let abi: JsonAbi = serde_json::from_value(json!([{
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "_entryPoint", "type": "address", "internalType": "contract IEntryPoint" },
            { "name": "_owner", "type": "address", "internalType": "address" }
        ]
    }]))
    .unwrap();

    InMemoryArtifacts::new().with_artifact(ContractArtifact {
        contract_name: "LinkPaymaster".to_string(),
        source_name: "contracts/LinkPaymaster.sol".to_string(),
        abi,
        bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]),
        compiler_version: None,
    })
}

#[tokio::test]
async fn test_deploys_over_json_rpc() {
    let server = mock_node(json!({ "jsonrpc": "2.0", "id": 1, "result": tx_hash() })).await;
    let chain = RpcChainClient::new(server.uri().parse().unwrap()).unwrap();

    let handle = Deployer::new(deploy_config(&server.uri()), registry(), chain)
        .deploy(&DeploymentTarget::link_paymaster())
        .await
        .unwrap();

    assert_eq!(
        handle.address,
        address!("5FbDB2315678afecb367f032d93F642f64180aa3")
    );
    assert_eq!(handle.transaction_hash.to_string(), tx_hash());
    assert!(handle.is_confirmed());

    let requests = server.received_requests().await.unwrap();
    let submissions = requests
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == "eth_sendRawTransaction")
        .count();
    assert_eq!(submissions, 1);
}

#[tokio::test]
async fn test_node_rejection_is_a_revert() {
    let server = mock_node(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": -32003, "message": "nonce too low" }
    }))
    .await;
    let chain = RpcChainClient::new(server.uri().parse().unwrap()).unwrap();

    let err = Deployer::new(deploy_config(&server.uri()), registry(), chain)
        .deploy(&DeploymentTarget::link_paymaster())
        .await
        .unwrap_err();

    assert!(
        matches!(err, DeploymentError::DeploymentReverted { ref reason, .. } if reason == "nonce too low"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_unreachable_node_is_a_chain_error() {
    let config = deploy_config("http://127.0.0.1:1");
    let chain = RpcChainClient::with_timeout(config.network.url.clone(), Duration::from_secs(1))
        .unwrap();

    let err = Deployer::new(config, registry(), chain)
        .deploy(&DeploymentTarget::link_paymaster())
        .await
        .unwrap_err();

    assert!(matches!(err, DeploymentError::Chain(_)), "unexpected error: {err}");
}

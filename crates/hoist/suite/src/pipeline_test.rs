use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, B256, U256};
use assert_matches::assert_matches;
use async_trait::async_trait;
use hoist_utils::provider::{Provider, ProviderError, TransactionReceipt, TransactionRequest};
use hoist_utils::tx::TxnConfig;

use super::*;
use crate::artifact::Artifact;
use crate::network::GasPrice;
use crate::plan::SuitePlan;

/// An in-memory chain: deterministic addresses, instant receipts, and an
/// optional submission that is scripted to fail.
#[derive(Default)]
struct MockChain {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    sent: Vec<TransactionRequest>,
    receipts: HashMap<B256, TransactionReceipt>,
    counter: u8,
    fail_send_at: Option<usize>,
}

impl MockChain {
    fn failing_at(index: usize) -> Self {
        Self { state: Mutex::new(MockState { fail_send_at: Some(index), ..Default::default() }) }
    }

    fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    fn creations(&self) -> Vec<TransactionRequest> {
        self.sent().into_iter().filter(|tx| tx.to.is_none()).collect()
    }
}

#[async_trait]
impl Provider for MockChain {
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(vec![Address::with_last_byte(0xaa)])
    }

    async fn estimate_gas(&self, _: &TransactionRequest) -> Result<U256, ProviderError> {
        Ok(U256::from(90_000))
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> Result<B256, ProviderError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_send_at == Some(state.sent.len()) {
            return Err(ProviderError::Rpc { code: -32000, message: "insufficient funds".into() });
        }

        state.counter += 1;
        let hash = B256::with_last_byte(state.counter);
        let contract_address = request.to.is_none().then(|| Address::with_last_byte(state.counter));

        state.receipts.insert(
            hash,
            TransactionReceipt {
                transaction_hash: hash,
                contract_address,
                status: Some("0x1".to_string()),
            },
        );
        state.sent.push(request.clone());
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }
}

const EMPTY_ABI: &str = "[]";

fn txn_config() -> TxnConfig {
    TxnConfig::new(GasPrice::from_gwei(2).wei())
}

fn lib_slot(name: &str) -> String {
    format!("__{}{}", name, "_".repeat(38 - name.len()))
}

fn sender() -> Address {
    Address::with_last_byte(0xaa)
}

#[tokio::test(start_paused = true)]
async fn linked_suite_deploys_in_full() {
    // Scenario: a dependency-free library, then a contract linked against it.
    let store = ArtifactStore::from_artifacts([
        Artifact::new("MathLib", "6060604052", EMPTY_ABI).unwrap(),
        Artifact::new("App", format!("6060{}00", lib_slot("MathLib")), EMPTY_ABI).unwrap(),
    ]);
    let plan = toml::from_str::<SuitePlan>(
        r#"
        registry = "App"
        entrypoint = "App"

        [[contracts]]
        name = "MathLib"
        library = true

        [[contracts]]
        name = "App"
        links = ["MathLib"]
        "#,
    )
    .unwrap()
    .validate(&store)
    .unwrap();

    let chain = MockChain::default();
    let mut pipeline = Pipeline::new(&store, &plan, &chain, sender(), txn_config());
    let output = pipeline.run().await.unwrap();

    assert_eq!(pipeline.registry().len(), 2);
    assert_eq!(output.entrypoint, Address::with_last_byte(2));

    // The library's address was linked into the app's init code, leaving no
    // placeholder behind.
    let creations = chain.creations();
    assert_eq!(creations.len(), 2);
    let app_code = &creations[1].data;
    assert!(!app_code.contains("__"));
    assert!(app_code.contains(&hex::encode(Address::with_last_byte(1))));

    assert!(pipeline.tasks().iter().all(|t| t.status == TaskStatus::Deployed));
}

#[tokio::test(start_paused = true)]
async fn failure_halts_the_sequence() {
    // Scenario: the second of three deployments fails at submission.
    let store = ArtifactStore::from_artifacts([
        Artifact::new("A", "6001", r#"[{"type": "function", "name": "ping", "inputs": []}]"#)
            .unwrap(),
        Artifact::new("B", "6002", EMPTY_ABI).unwrap(),
        Artifact::new("C", "6003", EMPTY_ABI).unwrap(),
    ]);
    let plan = toml::from_str::<SuitePlan>(
        r#"
        registry = "A"
        entrypoint = "A"

        [[contracts]]
        name = "A"

        [[contracts]]
        name = "B"

        [[contracts]]
        name = "C"

        [[calls]]
        function = "ping"
        "#,
    )
    .unwrap()
    .validate(&store)
    .unwrap();

    let chain = MockChain::failing_at(1);
    let mut pipeline = Pipeline::new(&store, &plan, &chain, sender(), txn_config());
    let err = pipeline.run().await.unwrap_err();

    assert_matches!(err, PipelineError::Deploy { contract, .. } if contract == "B");

    let statuses: Vec<_> = pipeline.tasks().iter().map(|t| t.status).collect();
    assert_eq!(statuses, [TaskStatus::Deployed, TaskStatus::Failed, TaskStatus::Pending]);

    // The configuration runner never started.
    assert_eq!(pipeline.calls()[0].status, TaskStatus::Pending);
    assert_eq!(chain.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn configuration_runs_in_order_after_all_deployments() {
    let store = ArtifactStore::from_artifacts([
        Artifact::new(
            "Registry",
            "6001",
            r#"[
                {"type": "function", "name": "setFactory",
                 "inputs": [{"name": "_factory", "type": "address"}]},
                {"type": "function", "name": "seal", "inputs": []}
            ]"#,
        )
        .unwrap(),
        Artifact::new(
            "Factory",
            "6002",
            r#"[{"type": "constructor", "inputs": [{"name": "_registry", "type": "address"}]}]"#,
        )
        .unwrap(),
    ]);
    let plan = toml::from_str::<SuitePlan>(
        r#"
        registry = "Registry"
        entrypoint = "Registry"

        [[contracts]]
        name = "Registry"

        [[contracts]]
        name = "Factory"
        args = ["$contract:Registry"]

        [[calls]]
        function = "setFactory"
        args = ["$contract:Factory"]

        [[calls]]
        function = "seal"
        "#,
    )
    .unwrap()
    .validate(&store)
    .unwrap();

    let chain = MockChain::default();
    let mut pipeline = Pipeline::new(&store, &plan, &chain, sender(), txn_config());
    pipeline.run().await.unwrap();

    let sent = chain.sent();
    assert_eq!(sent.len(), 4);

    // Factory's constructor argument is the registry's deployed address.
    assert!(sent[1].data.ends_with(&hex::encode(Address::with_last_byte(1))));

    // Both calls target the registry, in declared order, selector first.
    let registry_address = Address::with_last_byte(1);
    assert_eq!(sent[2].to, Some(registry_address));
    assert_eq!(sent[3].to, Some(registry_address));
    assert!(sent[2].data.ends_with(&hex::encode(Address::with_last_byte(2))));
    assert_eq!(sent[3].data.len(), 2 + 8);

    assert!(pipeline.calls().iter().all(|c| c.status == TaskStatus::Deployed));
}

#[tokio::test(start_paused = true)]
async fn seeded_contracts_are_not_redeployed() {
    let store = ArtifactStore::from_artifacts([
        Artifact::new("Registry", "6001", EMPTY_ABI).unwrap(),
        Artifact::new(
            "Pointer",
            "6002",
            r#"[{"type": "constructor", "inputs": [{"name": "_registry", "type": "address"}]}]"#,
        )
        .unwrap(),
    ]);
    let plan = toml::from_str::<SuitePlan>(
        r#"
        registry = "Registry"
        entrypoint = "Pointer"

        [[contracts]]
        name = "Registry"

        [[contracts]]
        name = "Pointer"
        args = ["$contract:Registry"]
        "#,
    )
    .unwrap()
    .validate(&store)
    .unwrap();

    let reused = Address::with_last_byte(0x77);
    let chain = MockChain::default();
    let mut pipeline = Pipeline::new(&store, &plan, &chain, sender(), txn_config());
    assert!(pipeline.seed("Registry", reused).unwrap());
    assert!(!pipeline.seed("NotInPlan", reused).unwrap());

    let output = pipeline.run().await.unwrap();

    // Only the pointer was actually created, wired to the reused address.
    let creations = chain.creations();
    assert_eq!(creations.len(), 1);
    assert!(creations[0].data.ends_with(&hex::encode(reused)));
    assert_eq!(output.addresses["Registry"], reused);
}

#[tokio::test(start_paused = true)]
async fn execution_order_is_deterministic() {
    let store = ArtifactStore::from_artifacts([
        Artifact::new("A", "6001", EMPTY_ABI).unwrap(),
        Artifact::new("B", "6002", EMPTY_ABI).unwrap(),
        Artifact::new("C", "6003", EMPTY_ABI).unwrap(),
    ]);
    let plan = toml::from_str::<SuitePlan>(
        r#"
        registry = "A"
        entrypoint = "A"

        [[contracts]]
        name = "A"

        [[contracts]]
        name = "B"

        [[contracts]]
        name = "C"
        "#,
    )
    .unwrap()
    .validate(&store)
    .unwrap();

    let mut orders = vec![];
    for _ in 0..2 {
        let chain = MockChain::default();
        let mut pipeline = Pipeline::new(&store, &plan, &chain, sender(), txn_config());
        pipeline.run().await.unwrap();
        orders.push(chain.sent().iter().map(|tx| tx.data.clone()).collect::<Vec<_>>());
    }

    assert_eq!(orders[0], orders[1]);
}

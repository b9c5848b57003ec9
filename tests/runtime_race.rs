//! Encryption Runtime Race Tests
//!
//! Rapid provider/chain changes: only the latest construction may publish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use votechain::client::chain::{format_quantity, Eip1193Provider};
use votechain::client::errors::{ChainError, ChainResult, RuntimeError, RuntimeResult};
use votechain::client::runtime::{
    EncryptionRuntime, MockCoprocessor, MockRuntime, MockRuntimeFactory, RuntimeBridge,
    RuntimeFactory, RuntimeParams, RuntimeStatus,
};

/// Provider that only knows its chain id
struct ChainOnly(u64);

#[async_trait]
impl Eip1193Provider for ChainOnly {
    async fn request(&self, method: &str, _params: Vec<Value>) -> ChainResult<Value> {
        match method {
            "eth_chainId" => Ok(format_quantity(self.0)),
            other => Err(ChainError::transport(format!("unsupported {other}"))),
        }
    }
}

/// Ignores cancellation; each chain resolves after its own delay
struct SkewedFactory {
    delays: HashMap<u64, (Duration, bool)>,
    coprocessor: Arc<MockCoprocessor>,
}

#[async_trait]
impl RuntimeFactory for SkewedFactory {
    async fn create(&self, params: RuntimeParams) -> RuntimeResult<Arc<dyn EncryptionRuntime>> {
        let chain_id = params.chain_id.ok_or(RuntimeError::MissingChain)?;
        let (delay, succeeds) = self.delays[&chain_id];
        tokio::time::sleep(delay).await;
        if succeeds {
            Ok(Arc::new(MockRuntime::new(self.coprocessor.clone(), chain_id)))
        } else {
            Err(RuntimeError::UnsupportedChain(chain_id))
        }
    }
}

fn mock_chains() -> HashMap<u64, String> {
    HashMap::from([
        (31337, "http://127.0.0.1:8545".to_string()),
        (1337, "http://127.0.0.1:8546".to_string()),
    ])
}

fn skewed(first: (Duration, bool), second: (Duration, bool)) -> RuntimeBridge {
    let factory = SkewedFactory {
        delays: HashMap::from([(31337, first), (1337, second)]),
        coprocessor: Arc::new(MockCoprocessor::new()),
    };
    RuntimeBridge::new(Arc::new(factory), mock_chains(), true)
}

#[tokio::test(start_paused = true)]
async fn late_failure_of_superseded_request_is_discarded() {
    let bridge = skewed(
        (Duration::from_secs(5), false),
        (Duration::from_millis(10), true),
    );

    let first = bridge.update(Some(Arc::new(ChainOnly(31337))), Some(31337));
    let second = bridge.update(Some(Arc::new(ChainOnly(1337))), Some(1337));

    second.unwrap().await.unwrap();
    assert_eq!(bridge.status(), RuntimeStatus::Ready);

    first.unwrap().await.unwrap();
    assert_eq!(bridge.status(), RuntimeStatus::Ready);
    assert!(bridge.instance().is_some());
    assert!(bridge.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn late_success_of_superseded_request_is_discarded() {
    let bridge = skewed(
        (Duration::from_secs(5), true),
        (Duration::from_millis(10), false),
    );

    let first = bridge.update(Some(Arc::new(ChainOnly(31337))), Some(31337));
    let second = bridge.update(Some(Arc::new(ChainOnly(1337))), Some(1337));

    second.unwrap().await.unwrap();
    first.unwrap().await.unwrap();

    assert_eq!(bridge.status(), RuntimeStatus::Error);
    assert!(bridge.instance().is_none());
    assert_eq!(bridge.error(), Some(RuntimeError::UnsupportedChain(1337)));
}

#[tokio::test(start_paused = true)]
async fn abort_aware_factory_stops_superseded_work() {
    let factory = MockRuntimeFactory::new(Arc::new(MockCoprocessor::new()))
        .with_init_delay(Duration::from_secs(1));
    let bridge = RuntimeBridge::new(Arc::new(factory), mock_chains(), true);

    let first = bridge.update(Some(Arc::new(ChainOnly(31337))), Some(31337));
    let second = bridge.update(Some(Arc::new(ChainOnly(1337))), Some(1337));

    first.unwrap().await.unwrap();
    assert_eq!(bridge.status(), RuntimeStatus::Loading);

    second.unwrap().await.unwrap();
    assert_eq!(bridge.settled().await, RuntimeStatus::Ready);
    assert!(bridge.error().is_none());
}

#[tokio::test]
async fn same_provider_and_chain_is_not_rebuilt() {
    let factory = MockRuntimeFactory::new(Arc::new(MockCoprocessor::new()));
    let bridge = RuntimeBridge::new(Arc::new(factory), mock_chains(), true);
    let provider: Arc<dyn Eip1193Provider> = Arc::new(ChainOnly(31337));

    bridge
        .update(Some(provider.clone()), Some(31337))
        .unwrap()
        .await
        .unwrap();
    let instance = bridge.instance().unwrap();

    assert!(bridge.update(Some(provider), Some(31337)).is_none());
    assert!(Arc::ptr_eq(&instance, &bridge.instance().unwrap()));
}

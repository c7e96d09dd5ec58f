//! On-chain anchoring module
//!
//! Publishes encrypted pointers to a complaint registry contract so that a
//! submission has a public, timestamped existence proof. Only the pointer is
//! ever sent; secrets stay with the submitter.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Url;
use tracing::info;

use crate::domain::{EncryptedPointer, Hash256};
use crate::infra::{Result, VaultError};

/// Sepolia, where the reference registry is deployed
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

sol! {
    #[sol(rpc)]
    interface IComplaintRegistry {
        event ComplaintAdded(uint256 indexed complaintIndex, string complaint, address indexed user);

        function addComplaint(string _complaint) external;

        function getComplaintCount() external view returns (uint256);

        function getComplaintByIndex(uint256 _index) external view returns (string);

        function getAllComplaints() external view returns (string[]);
    }
}

/// Anchor service configuration
#[derive(Clone)]
pub struct AnchorConfig {
    pub rpc_url: String,
    pub registry_address: Address,
    pub private_key: String,
    pub chain_id: u64,
}

impl std::fmt::Debug for AnchorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorConfig")
            .field("rpc_url", &self.rpc_url)
            .field("registry_address", &self.registry_address)
            .field("private_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl AnchorConfig {
    /// Load from `FIR_RPC_URL`, `FIR_REGISTRY_ADDRESS`, `FIR_ANCHOR_PRIVATE_KEY`
    /// and `FIR_CHAIN_ID`. Returns `None` (anchoring disabled) when any of the
    /// first three is missing or the address does not parse.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let rpc_url = var("FIR_RPC_URL")?;
        let registry_address = var("FIR_REGISTRY_ADDRESS").and_then(|s| s.parse().ok())?;
        let private_key = var("FIR_ANCHOR_PRIVATE_KEY")?;
        let chain_id = var("FIR_CHAIN_ID")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        Some(Self {
            rpc_url,
            registry_address,
            private_key,
            chain_id,
        })
    }

    fn parsed_rpc_url(&self) -> Result<Url> {
        self.rpc_url
            .parse()
            .map_err(|e| VaultError::Configuration(format!("Invalid RPC URL: {}", e)))
    }
}

/// Result of a confirmed anchoring transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorReceipt {
    pub tx_hash: Hash256,
    pub block_number: Option<u64>,
    /// Registry index from the `ComplaintAdded` event, when present
    pub complaint_index: Option<u64>,
}

/// Signing capability used to publish pointers.
///
/// Injected into [`AnchorService`] so callers can back it with a local key,
/// a remote signer or a test double.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Address transactions are sent from
    fn account(&self) -> Address;

    async fn submit_pointer(&self, pointer: &EncryptedPointer) -> Result<AnchorReceipt>;
}

/// Wallet backed by a local private key and an HTTP RPC endpoint
pub struct LocalWallet {
    signer: PrivateKeySigner,
    rpc_url: Url,
    registry_address: Address,
}

impl LocalWallet {
    pub fn new(config: &AnchorConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| VaultError::Configuration(format!("Invalid private key: {}", e)))?;

        Ok(Self {
            signer: signer.with_chain_id(Some(config.chain_id)),
            rpc_url: config.parsed_rpc_url()?,
            registry_address: config.registry_address,
        })
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    fn account(&self) -> Address {
        self.signer.address()
    }

    async fn submit_pointer(&self, pointer: &EncryptedPointer) -> Result<AnchorReceipt> {
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .on_http(self.rpc_url.clone());

        let contract = IComplaintRegistry::new(self.registry_address, &provider);

        let pending = contract
            .addComplaint(pointer.as_str().to_string())
            .send()
            .await
            .map_err(|e| VaultError::Anchor(format!("Failed to send transaction: {}", e)))?;

        info!(tx_hash = ?pending.tx_hash(), "Anchor transaction sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| VaultError::Anchor(format!("Failed to get receipt: {}", e)))?;

        let complaint_index = receipt.inner.logs().iter().find_map(|log| {
            log.log_decode::<IComplaintRegistry::ComplaintAdded>()
                .ok()
                .and_then(|event| u64::try_from(event.inner.data.complaintIndex).ok())
        });

        Ok(AnchorReceipt {
            tx_hash: receipt.transaction_hash.0,
            block_number: receipt.block_number,
            complaint_index,
        })
    }
}

/// Publishes pointers through a [`WalletProvider`] and reads them back from
/// the registry.
pub struct AnchorService {
    config: AnchorConfig,
    wallet: Arc<dyn WalletProvider>,
}

impl AnchorService {
    /// Service signing with the configured local key
    pub fn new(config: AnchorConfig) -> Result<Self> {
        let wallet = Arc::new(LocalWallet::new(&config)?);
        Ok(Self { config, wallet })
    }

    pub fn with_wallet(config: AnchorConfig, wallet: Arc<dyn WalletProvider>) -> Self {
        Self { config, wallet }
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn account(&self) -> Address {
        self.wallet.account()
    }

    /// Record a pointer in the registry and wait for confirmation
    pub async fn anchor_pointer(&self, pointer: &EncryptedPointer) -> Result<AnchorReceipt> {
        info!(
            account = %self.wallet.account(),
            registry = %self.config.registry_address,
            "Anchoring complaint pointer"
        );

        let receipt = self.wallet.submit_pointer(pointer).await?;

        info!(
            tx_hash = %hex::encode(receipt.tx_hash),
            block = receipt.block_number.unwrap_or(0),
            index = ?receipt.complaint_index,
            "Complaint pointer anchored"
        );

        Ok(receipt)
    }

    pub async fn complaint_count(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().on_http(self.config.parsed_rpc_url()?);
        let contract = IComplaintRegistry::new(self.config.registry_address, &provider);

        let count = contract
            .getComplaintCount()
            .call()
            .await
            .map_err(|e| VaultError::Anchor(format!("Contract call failed: {}", e)))?;

        u64::try_from(count._0)
            .map_err(|_| VaultError::Anchor("complaint count exceeds u64".to_string()))
    }

    pub async fn pointer_at(&self, index: u64) -> Result<EncryptedPointer> {
        let provider = ProviderBuilder::new().on_http(self.config.parsed_rpc_url()?);
        let contract = IComplaintRegistry::new(self.config.registry_address, &provider);

        let pointer = contract
            .getComplaintByIndex(U256::from(index))
            .call()
            .await
            .map_err(|e| VaultError::Anchor(format!("Contract call failed: {}", e)))?;

        Ok(EncryptedPointer::new(pointer._0))
    }

    /// Every anchored pointer, oldest first
    pub async fn list_pointers(&self) -> Result<Vec<EncryptedPointer>> {
        let provider = ProviderBuilder::new().on_http(self.config.parsed_rpc_url()?);
        let contract = IComplaintRegistry::new(self.config.registry_address, &provider);

        let all = contract
            .getAllComplaints()
            .call()
            .await
            .map_err(|e| VaultError::Anchor(format!("Contract call failed: {}", e)))?;

        Ok(all._0.into_iter().map(EncryptedPointer::new).collect())
    }
}

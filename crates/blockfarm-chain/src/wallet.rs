//! Wallet connection over an injected provider
//!
//! The provider is passed in explicitly rather than discovered from ambient
//! state, so the connector can be driven by a scripted fake in tests. A
//! real deployment injects [`EnvWallet`], which signs with a key taken from
//! the process environment.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use tokio::sync::broadcast;

use crate::error::ChainError;

/// External signals a provider emits after a session is established.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The active account set changed. An empty set means the wallet was
    /// locked or disconnected and the contract binding must be torn down.
    AccountsChanged(Vec<Address>),

    /// The wallet switched chains. Contract addresses are chain-specific,
    /// so the only safe response is a full application reset.
    ChainChanged(u64),
}

/// Injected wallet provider: account access, signing, change notifications.
pub trait WalletProvider: Send + Sync {
    type Signer: Signer + 'static;

    /// Request account access, prompting the user where applicable.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, ChainError>> + Send;

    /// Produce a signer bound to one of the provider's accounts.
    fn signer_for(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<Self::Signer, ChainError>> + Send;

    /// Subscribe to account and chain change signals.
    fn events(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Signer-capable middleware produced by a successful connection.
pub type WalletClient<P> =
    SignerMiddleware<Provider<Http>, <P as WalletProvider>::Signer>;

/// An established wallet session.
pub struct Connection<P: WalletProvider> {
    /// RPC client that signs with the connected account.
    pub client: Arc<WalletClient<P>>,

    /// The connected account address.
    pub address: Address,

    /// Change-signal subscription held for the remainder of the session.
    /// Dropping it unsubscribes.
    pub events: broadcast::Receiver<WalletEvent>,
}

/// Connects a [`WalletProvider`] to an RPC endpoint.
///
/// Only one connection prompt may be outstanding at a time: a second
/// `connect` while the first is unresolved returns
/// [`ChainError::RequestPending`] instead of re-prompting.
pub struct WalletConnector<P> {
    provider: P,
    rpc_url: String,
    chain_id: u64,
    connecting: AtomicBool,
}

impl<P: WalletProvider> WalletConnector<P> {
    pub fn new(provider: P, rpc_url: impl Into<String>, chain_id: u64) -> Self {
        WalletConnector {
            provider,
            rpc_url: rpc_url.into(),
            chain_id,
            connecting: AtomicBool::new(false),
        }
    }

    /// Request account access and return a signer bound to the active
    /// account, plus the session's change-signal subscription.
    pub async fn connect(&self) -> Result<Connection<P>, ChainError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(ChainError::RequestPending);
        }
        let result = self.connect_inner().await;
        self.connecting.store(false, Ordering::SeqCst);
        result
    }

    async fn connect_inner(&self) -> Result<Connection<P>, ChainError> {
        let accounts = self.provider.request_accounts().await?;
        let address = accounts.first().copied().ok_or(ChainError::UserRejected)?;

        let signer = self
            .provider
            .signer_for(address)
            .await?
            .with_chain_id(self.chain_id);

        let http = Provider::<Http>::try_from(self.rpc_url.as_str())
            .map_err(|err| ChainError::Rpc(err.to_string()))?;

        tracing::info!(address = %address, chain_id = self.chain_id, "wallet connected");

        Ok(Connection {
            client: Arc::new(SignerMiddleware::new(http, signer)),
            address,
            events: self.provider.events(),
        })
    }
}

/// Provider backed by a private key in the process environment.
///
/// The headless counterpart of an injected browser wallet: one account,
/// no interactive prompts, no change signals.
pub struct EnvWallet {
    key_var: &'static str,
    events: broadcast::Sender<WalletEvent>,
}

impl EnvWallet {
    pub const DEFAULT_KEY_VAR: &'static str = "BLOCKFARM_PRIVATE_KEY";

    pub fn from_env() -> Self {
        Self::with_key_var(Self::DEFAULT_KEY_VAR)
    }

    pub fn with_key_var(key_var: &'static str) -> Self {
        let (events, _) = broadcast::channel(8);
        EnvWallet { key_var, events }
    }

    fn wallet(&self) -> Result<LocalWallet, ChainError> {
        let raw = std::env::var(self.key_var).map_err(|_| ChainError::ProviderUnavailable)?;
        raw.trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|_| ChainError::ProviderUnavailable)
    }
}

impl WalletProvider for EnvWallet {
    type Signer = LocalWallet;

    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, ChainError>> + Send {
        async move { Ok(vec![self.wallet()?.address()]) }
    }

    fn signer_for(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<Self::Signer, ChainError>> + Send {
        async move {
            let wallet = self.wallet()?;
            if wallet.address() != account {
                return Err(ChainError::UserRejected);
            }
            Ok(wallet)
        }
    }

    fn events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

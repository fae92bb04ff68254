//! Application orchestrator
//!
//! Owns the wallet session, the contract binding, the form state and the
//! role gate, and runs every user-initiated flow end to end: validate
//! locally, call the facade, await confirmation, keep the outcome for
//! display. Each write action holds a single in-flight guard so a
//! duplicate submission is a no-op while one is outstanding.

use blockfarm_chain::wallet::WalletClient;
use blockfarm_chain::{
    trace_lot, Connection, LotTrace, RegistryClient, ResponsibleParty, TxOutcome,
    WalletConnector, WalletEvent, WalletProvider,
};
use ethers::types::{Address, H256, U256};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::forms::{LegalForm, LotForm, RoleForm, TransferForm};
use crate::guard::InFlight;
use crate::session::{load_roles, RoleSession};
use crate::tabs::NavTab;

/// Details of the most recent confirmed registration, kept for display
/// until the next one replaces it.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationSummary {
    pub medicine_name: String,
    pub series_code: String,
    pub expiry_date: u64,
    pub quantity: U256,
    pub responsible: ResponsibleParty,
    pub account: Address,
    pub transaction_hash: H256,
    pub explorer_url: Option<String>,
}

/// Abbreviated `0x1234…abcd` account form used in inline displays.
pub fn short_address(address: Address) -> String {
    let full = format!("{address:#x}");
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

pub struct App<P: WalletProvider> {
    config: AppConfig,
    connector: WalletConnector<P>,
    connection: Option<Connection<P>>,
    registry: Option<RegistryClient<WalletClient<P>>>,
    pub session: RoleSession,
    active_tab: Option<NavTab>,
    pub lot_form: LotForm,
    pub legal_form: LegalForm,
    pub transfer_form: TransferForm,
    pub role_form: RoleForm,
    last_registration: Option<RegistrationSummary>,
    registering: InFlight,
    transferring: InFlight,
    consulting: InFlight,
    role_action: InFlight,
}

impl<P: WalletProvider> App<P> {
    pub fn new(config: AppConfig, provider: P) -> Self {
        let connector =
            WalletConnector::new(provider, config.rpc_url.clone(), config.chain_id);
        App {
            config,
            connector,
            connection: None,
            registry: None,
            session: RoleSession::default(),
            active_tab: None,
            lot_form: LotForm::default(),
            legal_form: LegalForm::default(),
            transfer_form: TransferForm::default(),
            role_form: RoleForm::default(),
            last_registration: None,
            registering: InFlight::new("registration"),
            transferring: InFlight::new("transfer"),
            consulting: InFlight::new("traceability"),
            role_action: InFlight::new("role management"),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn account(&self) -> Option<Address> {
        self.connection.as_ref().map(|connection| connection.address)
    }

    pub fn active_tab(&self) -> Option<NavTab> {
        self.active_tab
    }

    pub fn last_registration(&self) -> Option<&RegistrationSummary> {
        self.last_registration.as_ref()
    }

    /// Fresh subscription to the provider's change signals, if connected.
    pub fn wallet_events(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.connection
            .as_ref()
            .map(|connection| connection.events.resubscribe())
    }

    /// Connect the wallet and bind the contract. Already connected is a
    /// no-op returning the active account.
    pub async fn connect(&mut self) -> Result<Address, AppError> {
        if let Some(connection) = &self.connection {
            return Ok(connection.address);
        }

        let connection = self.connector.connect().await?;
        let address = connection.address;
        self.registry = Some(RegistryClient::new(
            self.config.contract_address,
            connection.client.clone(),
        ));
        self.connection = Some(connection);
        self.session.invalidate();
        Ok(address)
    }

    /// Reload role hashes and membership for the active account. On
    /// failure the gate fails closed; a response arriving for a stale
    /// identity is discarded silently.
    pub async fn refresh_roles(&mut self) -> Result<(), AppError> {
        let (registry, account) = match (&self.registry, &self.connection) {
            (Some(registry), Some(connection)) => (registry.clone(), connection.address),
            _ => return Err(AppError::NotConnected),
        };

        let generation = self.session.begin_load();
        let outcome = match load_roles(&registry, account).await {
            Ok((hashes, roles)) => {
                self.session.commit_ok(generation, hashes, roles);
                Ok(())
            }
            Err(err) => {
                if self.session.commit_failed(generation, err.to_string()) {
                    Err(AppError::Chain(err))
                } else {
                    Ok(())
                }
            }
        };
        self.active_tab = self.session.resolve_active_tab(self.active_tab);
        outcome
    }

    /// Submit the lot + legal forms as a registration.
    pub async fn register_lot(&mut self) -> Result<RegistrationSummary, AppError> {
        self.require_tab(NavTab::Register)?;
        let registry = self.registry()?;
        let account = self.account().ok_or(AppError::NotConnected)?;
        let _token = self.registering.begin()?;

        let lot = self.lot_form.validate(&self.legal_form)?;
        let outcome = registry.register_lot(&lot).await?;

        let summary = RegistrationSummary {
            medicine_name: lot.medicine_name,
            series_code: lot.series_code,
            expiry_date: lot.expiry_date,
            quantity: lot.quantity,
            responsible: lot.responsible,
            account,
            transaction_hash: outcome.transaction_hash,
            explorer_url: self.config.tx_url(outcome.transaction_hash),
        };
        self.last_registration = Some(summary.clone());
        Ok(summary)
    }

    /// Submit the transfer form.
    pub async fn transfer_lot(&mut self) -> Result<TxOutcome, AppError> {
        self.require_tab(NavTab::Transfer)?;
        let registry = self.registry()?;
        let _token = self.transferring.begin()?;

        let request = self.transfer_form.validate()?;
        let outcome = registry
            .transfer_lot(request.lot_id, request.recipient, request.quantity)
            .await?;
        Ok(outcome)
    }

    /// Reconstruct the ownership timeline for a series code.
    pub async fn trace(&mut self, series_code: &str) -> Result<LotTrace, AppError> {
        self.require_tab(NavTab::Consult)?;
        let registry = self.registry()?;
        let _token = self.consulting.begin()?;

        Ok(trace_lot(&registry, series_code).await?)
    }

    /// Submit the role form as a grant.
    pub async fn assign_role(&mut self) -> Result<TxOutcome, AppError> {
        self.require_tab(NavTab::Roles)?;
        let registry = self.registry()?;
        let _token = self.role_action.begin()?;

        let request = self.role_form.validate()?;
        let hash = self.session.role_hash(request.role);
        Ok(registry.assign_role(hash, request.account).await?)
    }

    /// Submit the role form as a revocation.
    pub async fn revoke_role(&mut self) -> Result<TxOutcome, AppError> {
        self.require_tab(NavTab::Roles)?;
        let registry = self.registry()?;
        let _token = self.role_action.begin()?;

        let request = self.role_form.validate()?;
        let hash = self.session.role_hash(request.role);
        Ok(registry.revoke_role(hash, request.account).await?)
    }

    /// React to a provider change signal.
    pub fn apply_wallet_event(&mut self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                Some(address) => {
                    tracing::info!(address = %address, "active account replaced");
                    if let Some(connection) = self.connection.as_mut() {
                        connection.address = address;
                    }
                    self.session.invalidate();
                }
                None => {
                    tracing::info!("wallet disconnected; tearing down contract binding");
                    self.connection = None;
                    self.registry = None;
                    self.session.invalidate();
                }
            },
            WalletEvent::ChainChanged(chain_id) => {
                tracing::info!(chain_id, "chain changed; resetting application state");
                self.reset();
            }
        }
        self.active_tab = self.session.resolve_active_tab(self.active_tab);
    }

    /// Full state reset, the headless equivalent of reloading the view.
    fn reset(&mut self) {
        self.connection = None;
        self.registry = None;
        self.session.invalidate();
        self.lot_form = LotForm::default();
        self.legal_form = LegalForm::default();
        self.transfer_form = TransferForm::default();
        self.role_form = RoleForm::default();
        self.last_registration = None;
        self.active_tab = None;
    }

    fn registry(&self) -> Result<RegistryClient<WalletClient<P>>, AppError> {
        self.registry.clone().ok_or(AppError::NotConnected)
    }

    fn require_tab(&self, tab: NavTab) -> Result<(), AppError> {
        if self.session.visible_tabs().contains(&tab) {
            Ok(())
        } else {
            Err(AppError::ModuleUnavailable(tab.label()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::forms::LotField;
    use blockfarm_chain::{ChainError, RoleHashes, RoleSet};
    use ethers::core::rand::thread_rng;
    use ethers::signers::{LocalWallet, Signer};
    use std::future::Future;

    /// Always-approving provider with a single in-memory key.
    struct TestProvider {
        wallet: LocalWallet,
        events: broadcast::Sender<WalletEvent>,
    }

    impl TestProvider {
        fn new() -> Self {
            let (events, _) = broadcast::channel(8);
            TestProvider { wallet: LocalWallet::new(&mut thread_rng()), events }
        }
    }

    impl WalletProvider for TestProvider {
        type Signer = LocalWallet;

        fn request_accounts(
            &self,
        ) -> impl Future<Output = Result<Vec<Address>, ChainError>> + Send {
            async move { Ok(vec![self.wallet.address()]) }
        }

        fn signer_for(
            &self,
            _account: Address,
        ) -> impl Future<Output = Result<Self::Signer, ChainError>> + Send {
            async move { Ok(self.wallet.clone()) }
        }

        fn events(&self) -> broadcast::Receiver<WalletEvent> {
            self.events.subscribe()
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: Address::from([0x42; 20]),
            chain_id: 31337,
            explorer_url: None,
        }
    }

    fn make_ready(app: &mut App<TestProvider>, roles: RoleSet) {
        let generation = app.session.begin_load();
        assert!(app.session.commit_ok(generation, RoleHashes::local(), roles));
    }

    #[test]
    fn short_address_keeps_prefix_and_suffix() {
        let address = Address::from([0xab; 20]);
        assert_eq!(short_address(address), "0xabab…abab");
    }

    #[tokio::test]
    async fn connect_establishes_account_and_is_idempotent() {
        let mut app = App::new(test_config(), TestProvider::new());
        assert_eq!(app.account(), None);

        let address = app.connect().await.unwrap();
        assert_eq!(app.account(), Some(address));
        assert_eq!(app.connect().await.unwrap(), address);
    }

    #[tokio::test]
    async fn empty_account_set_tears_down_the_binding() {
        let mut app = App::new(test_config(), TestProvider::new());
        app.connect().await.unwrap();

        app.apply_wallet_event(WalletEvent::AccountsChanged(vec![]));
        assert_eq!(app.account(), None);
        assert!(matches!(
            app.register_lot().await,
            Err(AppError::ModuleUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn account_switch_invalidates_outstanding_role_loads() {
        let mut app = App::new(test_config(), TestProvider::new());
        app.connect().await.unwrap();

        let generation = app.session.begin_load();
        let replacement = Address::from([0x07; 20]);
        app.apply_wallet_event(WalletEvent::AccountsChanged(vec![replacement]));

        let roles = RoleSet { manufacturer: true, ..RoleSet::default() };
        assert!(!app.session.commit_ok(generation, RoleHashes::local(), roles));
        assert_eq!(app.account(), Some(replacement));
        assert_eq!(app.session.visible_tabs(), vec![NavTab::Consult]);
    }

    #[tokio::test]
    async fn chain_change_resets_all_view_state() {
        let mut app = App::new(test_config(), TestProvider::new());
        app.connect().await.unwrap();
        app.lot_form.set(LotField::SeriesCode, "CODE-1");

        app.apply_wallet_event(WalletEvent::ChainChanged(1));
        assert_eq!(app.account(), None);
        assert_eq!(app.lot_form.series_code, "");
        assert!(app.last_registration().is_none());
        // Only the public tab survives the reset, and becomes active.
        assert_eq!(app.active_tab(), Some(NavTab::Consult));
    }

    #[tokio::test]
    async fn validation_blocks_registration_before_any_call() {
        let mut app = App::new(test_config(), TestProvider::new());
        app.connect().await.unwrap();
        make_ready(&mut app, RoleSet { manufacturer: true, ..RoleSet::default() });

        // Empty forms: the facade is never reached, so no RPC endpoint is
        // required for this to fail fast.
        match app.register_lot().await {
            Err(AppError::Validation(ValidationError::MissingField(field))) => {
                assert_eq!(field, "medicine name");
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn gated_actions_require_a_visible_tab() {
        let mut app = App::new(test_config(), TestProvider::new());
        app.connect().await.unwrap();
        make_ready(&mut app, RoleSet { pharmacy: true, ..RoleSet::default() });

        assert!(matches!(
            app.register_lot().await,
            Err(AppError::ModuleUnavailable("Register lot"))
        ));
        assert!(matches!(
            app.assign_role().await,
            Err(AppError::ModuleUnavailable("Role management"))
        ));
    }
}

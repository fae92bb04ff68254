//! Typed facade over the deployed medicine-registry contract
//!
//! The ABI keeps the contract's original symbol names; the Rust surface
//! exposes domain-named calls. Writes await confirmation before reporting
//! success and surface remote revert reasons verbatim. Reads are pure
//! queries; a nonexistent lot is `Ok(None)`, never an error.

use std::sync::Arc;

use ethers::abi::{self, ParamType};
use ethers::contract::{abigen, ContractCall, ContractError, LogMeta};
use ethers::providers::Middleware;
use ethers::types::{Address, Bytes, H256, U256};

use crate::error::ChainError;
use crate::state::lot::{clamp_u64, Lot, NewLot, ResponsibleParty};
use crate::state::roles::Role;

abigen!(
    MedicineRegistry,
    r#"[
        struct Responsable { string nombre; string dni; string telefono; string correo }
        event LoteRegistrado(bytes32 indexed loteId, address indexed propietario, uint256 fechaRegistro)
        event LoteTransferido(bytes32 indexed loteId, address indexed propietarioAnterior, address indexed nuevoPropietario, uint256 fechaTransferencia)
        function registrarLote(string nombre, string principioActivo, uint256 fechaFabricacion, uint256 fechaVencimiento, string codigoSerie, string registroSanitario, uint256 cantidad, Responsable responsable) external
        function transferirLote(bytes32 loteId, address nuevoPropietario, uint256 cantidad) external
        function obtenerLote(bytes32 loteId) external view returns (string nombre, string principioActivo, uint256 fechaFabricacion, uint256 fechaVencimiento, string registroSanitario, uint256 cantidad, Responsable responsable, address propietario, uint256 registradoEn, uint256 ultimaTransferencia, bool existe)
        function hasRole(bytes32 role, address account) external view returns (bool)
        function asignarRol(bytes32 rol, address cuenta) external
        function revocarRol(bytes32 rol, address cuenta) external
        function ADMIN_ROLE() external view returns (bytes32)
        function FABRICANTE_ROLE() external view returns (bytes32)
        function DISTRIBUIDOR_ROLE() external view returns (bytes32)
        function FARMACIA_ROLE() external view returns (bytes32)
    ]"#
);

impl From<&ResponsibleParty> for Responsable {
    fn from(party: &ResponsibleParty) -> Self {
        Responsable {
            nombre: party.full_name.clone(),
            dni: party.national_id.clone(),
            telefono: party.phone.clone(),
            correo: party.email.clone(),
        }
    }
}

impl From<Responsable> for ResponsibleParty {
    fn from(raw: Responsable) -> Self {
        ResponsibleParty {
            full_name: raw.nombre,
            national_id: raw.dni,
            phone: raw.telefono,
            email: raw.correo,
        }
    }
}

/// Result of a confirmed write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
}

/// Client for one registry deployment, bound to a signer-capable middleware.
pub struct RegistryClient<M> {
    contract: MedicineRegistry<M>,
}

impl<M> Clone for RegistryClient<M> {
    fn clone(&self) -> Self {
        RegistryClient { contract: self.contract.clone() }
    }
}

impl<M: Middleware + 'static> RegistryClient<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        RegistryClient { contract: MedicineRegistry::new(address, client) }
    }

    /// Address of the bound deployment.
    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Register a new lot. Confirmation is awaited before returning.
    pub async fn register_lot(&self, lot: &NewLot) -> Result<TxOutcome, ChainError> {
        let call = self.contract.registrar_lote(
            lot.medicine_name.clone(),
            lot.active_ingredient.clone(),
            U256::from(lot.manufacture_date),
            U256::from(lot.expiry_date),
            lot.series_code.clone(),
            lot.health_registration.clone(),
            lot.quantity,
            Responsable::from(&lot.responsible),
        );
        self.send_tx(call, "registrarLote").await
    }

    /// Transfer `quantity` units of a lot to a new owner.
    pub async fn transfer_lot(
        &self,
        lot_id: [u8; 32],
        recipient: Address,
        quantity: U256,
    ) -> Result<TxOutcome, ChainError> {
        let call = self.contract.transferir_lote(lot_id, recipient, quantity);
        self.send_tx(call, "transferirLote").await
    }

    /// Fetch a lot snapshot. `None` means the identifier is unregistered;
    /// callers must check before trusting any other field.
    pub async fn get_lot(&self, lot_id: [u8; 32]) -> Result<Option<Lot>, ChainError> {
        let (
            medicine_name,
            active_ingredient,
            manufacture_date,
            expiry_date,
            health_registration,
            quantity,
            responsible,
            owner,
            registered_at,
            last_transferred_at,
            exists,
        ) = self
            .contract
            .obtener_lote(lot_id)
            .call()
            .await
            .map_err(map_contract_error)?;

        if !exists {
            return Ok(None);
        }

        Ok(Some(Lot {
            medicine_name,
            active_ingredient,
            health_registration,
            manufacture_date: clamp_u64(manufacture_date),
            expiry_date: clamp_u64(expiry_date),
            quantity,
            responsible: Responsable {
                nombre: responsible.0,
                dni: responsible.1,
                telefono: responsible.2,
                correo: responsible.3,
            }
            .into(),
            owner,
            registered_at: clamp_u64(registered_at),
            last_transferred_at: clamp_u64(last_transferred_at),
        }))
    }

    /// Whether `account` holds the role identified by `role_hash`.
    pub async fn has_role(
        &self,
        role_hash: [u8; 32],
        account: Address,
    ) -> Result<bool, ChainError> {
        self.contract
            .has_role(role_hash, account)
            .call()
            .await
            .map_err(map_contract_error)
    }

    /// Role hash as declared by the contract's role getter.
    pub async fn role_hash(&self, role: Role) -> Result<[u8; 32], ChainError> {
        let call = match role {
            Role::Administrator => self.contract.admin_role(),
            Role::Manufacturer => self.contract.fabricante_role(),
            Role::Distributor => self.contract.distribuidor_role(),
            Role::Pharmacy => self.contract.farmacia_role(),
        };
        call.call().await.map_err(map_contract_error)
    }

    /// Grant a role to an account.
    pub async fn assign_role(
        &self,
        role_hash: [u8; 32],
        account: Address,
    ) -> Result<TxOutcome, ChainError> {
        let call = self.contract.asignar_rol(role_hash, account);
        self.send_tx(call, "asignarRol").await
    }

    /// Revoke a role from an account.
    pub async fn revoke_role(
        &self,
        role_hash: [u8; 32],
        account: Address,
    ) -> Result<TxOutcome, ChainError> {
        let call = self.contract.revocar_rol(role_hash, account);
        self.send_tx(call, "revocarRol").await
    }

    /// All registration events for a lot, oldest block range first.
    pub async fn registration_events(
        &self,
        lot_id: [u8; 32],
    ) -> Result<Vec<(LoteRegistradoFilter, LogMeta)>, ChainError> {
        self.contract
            .lote_registrado_filter()
            .topic1(H256::from(lot_id))
            .from_block(0u64)
            .query_with_meta()
            .await
            .map_err(|err| ChainError::EventQueryFailed(err.to_string()))
    }

    /// All transfer events for a lot.
    pub async fn transfer_events(
        &self,
        lot_id: [u8; 32],
    ) -> Result<Vec<(LoteTransferidoFilter, LogMeta)>, ChainError> {
        self.contract
            .lote_transferido_filter()
            .topic1(H256::from(lot_id))
            .from_block(0u64)
            .query_with_meta()
            .await
            .map_err(|err| ChainError::EventQueryFailed(err.to_string()))
    }

    async fn send_tx(
        &self,
        call: ContractCall<M, ()>,
        op: &'static str,
    ) -> Result<TxOutcome, ChainError> {
        let pending = call.send().await.map_err(map_contract_error)?;
        let receipt = pending
            .await
            .map_err(|err| ChainError::Rpc(err.to_string()))?
            .ok_or(ChainError::TransactionDropped)?;

        if receipt.status != Some(1u64.into()) {
            return Err(ChainError::TransactionReverted {
                reason: GENERIC_REVERT.to_string(),
            });
        }

        let outcome = TxOutcome {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|block| block.as_u64()),
        };
        tracing::info!(
            op,
            tx = %format!("{:#x}", outcome.transaction_hash),
            block = outcome.block_number,
            "transaction confirmed"
        );
        Ok(outcome)
    }
}

const GENERIC_REVERT: &str = "execution reverted";

/// Selector of the standard `Error(string)` revert shape.
const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Extract a human-readable reason from `Error(string)` revert data.
fn decode_revert_reason(data: &Bytes) -> Option<String> {
    let raw = data.as_ref();
    if raw.len() < 4 || raw[..4] != ERROR_SELECTOR {
        return None;
    }
    abi::decode(&[ParamType::String], &raw[4..])
        .ok()?
        .into_iter()
        .next()
        .and_then(|token| token.into_string())
}

/// Map a contract error to the client taxonomy, preferring the remote
/// reason string, then raw revert data, then the error's own message.
fn map_contract_error<M: Middleware>(err: ContractError<M>) -> ChainError {
    if let Some(data) = err.as_revert() {
        let reason = decode_revert_reason(data).unwrap_or_else(|| {
            if data.is_empty() {
                GENERIC_REVERT.to_string()
            } else {
                data.to_string()
            }
        });
        return ChainError::TransactionReverted { reason };
    }

    let message = err.to_string();
    if message.contains("revert") {
        return ChainError::TransactionReverted { reason: message };
    }
    ChainError::Rpc(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::Token;
    use ethers::providers::{Http, Provider};

    fn error_string_data(reason: &str) -> Bytes {
        let mut raw = ERROR_SELECTOR.to_vec();
        raw.extend(abi::encode(&[Token::String(reason.to_string())]));
        raw.into()
    }

    #[test]
    fn decodes_standard_revert_reason() {
        let data = error_string_data("Lote ya registrado");
        assert_eq!(
            decode_revert_reason(&data).as_deref(),
            Some("Lote ya registrado")
        );
    }

    #[test]
    fn rejects_data_without_error_selector() {
        assert_eq!(decode_revert_reason(&Bytes::from(vec![0xde, 0xad])), None);
        assert_eq!(decode_revert_reason(&Bytes::default()), None);
    }

    #[test]
    fn revert_reason_is_surfaced_verbatim() {
        let err = ContractError::<Provider<Http>>::Revert(error_string_data(
            "Solo el propietario puede transferir",
        ));
        match map_contract_error(err) {
            ChainError::TransactionReverted { reason } => {
                assert_eq!(reason, "Solo el propietario puede transferir");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn empty_revert_data_falls_back_to_generic_reason() {
        let err = ContractError::<Provider<Http>>::Revert(Bytes::default());
        match map_contract_error(err) {
            ChainError::TransactionReverted { reason } => {
                assert_eq!(reason, GENERIC_REVERT);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}

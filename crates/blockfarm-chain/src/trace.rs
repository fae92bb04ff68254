//! Lot traceability reconstruction
//!
//! Registration and transfer events are distinct kinds emitted into the
//! same chain timeline. They are merged into one sequence ordered by
//! (block number, log index) and folded into ownership-change records;
//! concatenating the two lists would misorder same-block activity.

use ethers::contract::LogMeta;
use ethers::providers::Middleware;
use ethers::types::{Address, H256};
use serde::Serialize;

use crate::error::ChainError;
use crate::registry::{LoteRegistradoFilter, LoteTransferidoFilter, RegistryClient};
use crate::state::lot::{clamp_u64, lot_id, Lot};

/// One ownership-change record in a lot's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipRecord {
    /// Previous owner as recorded by the event; `None` marks the genesis
    /// registration record.
    pub from: Option<Address>,

    /// Owner after this record took effect.
    pub to: Address,

    /// Event timestamp, epoch seconds.
    pub timestamp: u64,

    /// Emitting transaction; `None` only on a synthesized record.
    pub transaction_hash: Option<H256>,

    /// Block the event was mined in.
    pub block_number: u64,

    /// Position of the event within its block.
    pub log_index: u64,

    /// Whether `to` matches the lot snapshot's current owner.
    pub is_current_owner: bool,
}

/// Result of a traceability query.
///
/// The snapshot and the event streams have independent failure domains:
/// a failed event query leaves `timeline` as an error while the lot
/// details remain available for display.
#[derive(Debug)]
pub struct LotTrace {
    pub lot_id: [u8; 32],
    pub lot: Lot,
    pub timeline: Result<Vec<OwnershipRecord>, ChainError>,
}

/// An event pinned to its position in the chain timeline.
#[derive(Debug, Clone)]
pub struct OrderedEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: H256,
    pub event: LotEvent,
}

#[derive(Debug, Clone)]
pub enum LotEvent {
    Registered { owner: Address, timestamp: u64 },
    Transferred { from: Address, to: Address, timestamp: u64 },
}

/// Reconstruct the ownership timeline for a series code.
///
/// Fetches the lot snapshot first; a nonexistent lot is
/// [`ChainError::LotNotFound`]. The two event streams are then queried
/// concurrently and merged.
pub async fn trace_lot<M: Middleware + 'static>(
    registry: &RegistryClient<M>,
    series_code: &str,
) -> Result<LotTrace, ChainError> {
    let id = lot_id(series_code);
    let lot = registry.get_lot(id).await?.ok_or(ChainError::LotNotFound)?;

    let (registrations, transfers) =
        tokio::join!(registry.registration_events(id), registry.transfer_events(id));

    let trace = assemble_trace(id, lot, registrations, transfers);
    match &trace.timeline {
        Ok(timeline) => {
            tracing::debug!(records = timeline.len(), "timeline reconstructed");
        }
        Err(err) => tracing::warn!(%err, "timeline unavailable"),
    }
    Ok(trace)
}

/// Join the snapshot with the two event-query outcomes.
pub fn assemble_trace(
    id: [u8; 32],
    lot: Lot,
    registrations: Result<Vec<(LoteRegistradoFilter, LogMeta)>, ChainError>,
    transfers: Result<Vec<(LoteTransferidoFilter, LogMeta)>, ChainError>,
) -> LotTrace {
    let timeline = match (registrations, transfers) {
        (Ok(registrations), Ok(transfers)) => {
            let mut events: Vec<OrderedEvent> = Vec::with_capacity(
                registrations.len() + transfers.len(),
            );
            events.extend(registrations.into_iter().map(|(event, meta)| OrderedEvent {
                block_number: meta.block_number.as_u64(),
                log_index: clamp_u64(meta.log_index),
                transaction_hash: meta.transaction_hash,
                event: LotEvent::Registered {
                    owner: event.propietario,
                    timestamp: clamp_u64(event.fecha_registro),
                },
            }));
            events.extend(transfers.into_iter().map(|(event, meta)| OrderedEvent {
                block_number: meta.block_number.as_u64(),
                log_index: clamp_u64(meta.log_index),
                transaction_hash: meta.transaction_hash,
                event: LotEvent::Transferred {
                    from: event.propietario_anterior,
                    to: event.nuevo_propietario,
                    timestamp: clamp_u64(event.fecha_transferencia),
                },
            }));
            Ok(build_timeline(&lot, events))
        }
        (Err(err), _) | (_, Err(err)) => Err(err),
    };

    LotTrace { lot_id: id, lot, timeline }
}

/// Merge events into ownership records ordered by (block, log index).
///
/// With no events at all for an existing lot (an indexer gap), a single
/// record is synthesized from the snapshot's registration fields so the
/// timeline is never empty for a lot that exists.
pub fn build_timeline(lot: &Lot, mut events: Vec<OrderedEvent>) -> Vec<OwnershipRecord> {
    if events.is_empty() {
        return vec![OwnershipRecord {
            from: None,
            to: lot.owner,
            timestamp: lot.registered_at,
            transaction_hash: None,
            block_number: 0,
            log_index: 0,
            is_current_owner: true,
        }];
    }

    events.sort_by_key(|event| (event.block_number, event.log_index));

    let mut records: Vec<OwnershipRecord> = events
        .into_iter()
        .map(|ordered| {
            let (from, to, timestamp) = match ordered.event {
                LotEvent::Registered { owner, timestamp } => (None, owner, timestamp),
                LotEvent::Transferred { from, to, timestamp } => (Some(from), to, timestamp),
            };
            OwnershipRecord {
                from,
                to,
                timestamp,
                transaction_hash: Some(ordered.transaction_hash),
                block_number: ordered.block_number,
                log_index: ordered.log_index,
                is_current_owner: false,
            }
        })
        .collect();

    // Only the latest record matching the snapshot owner carries the flag;
    // an owner that reacquired a lot would otherwise be flagged twice.
    if let Some(index) = records.iter().rposition(|record| record.to == lot.owner) {
        records[index].is_current_owner = true;
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lot::ResponsibleParty;
    use ethers::types::U256;

    fn snapshot(owner: Address) -> Lot {
        Lot {
            medicine_name: "Paracetamol 500 mg".to_string(),
            active_ingredient: "Paracetamol".to_string(),
            health_registration: "DIG-2025-0001".to_string(),
            manufacture_date: 1_735_689_600,
            expiry_date: 1_798_761_600,
            quantity: U256::from(100u64),
            responsible: ResponsibleParty::default(),
            owner,
            registered_at: 1_736_000_000,
            last_transferred_at: 0,
        }
    }

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn registered(block: u64, log: u64, owner: Address) -> OrderedEvent {
        OrderedEvent {
            block_number: block,
            log_index: log,
            transaction_hash: H256::from([0xaa; 32]),
            event: LotEvent::Registered { owner, timestamp: 1_736_000_000 },
        }
    }

    fn transferred(block: u64, log: u64, from: Address, to: Address) -> OrderedEvent {
        OrderedEvent {
            block_number: block,
            log_index: log,
            transaction_hash: H256::from([0xbb; 32]),
            event: LotEvent::Transferred { from, to, timestamp: 1_736_100_000 },
        }
    }

    #[test]
    fn timeline_has_one_record_per_event_in_chain_order() {
        let (x, y, z) = (addr(1), addr(2), addr(3));
        let lot = snapshot(y);

        // Deliberately shuffled input: same-block ordering must come from
        // the log index, not arrival order.
        let events = vec![
            transferred(15, 2, z, y),
            registered(10, 0, x),
            transferred(15, 1, x, z),
        ];

        let timeline = build_timeline(&lot, events);
        assert_eq!(timeline.len(), 3);

        assert_eq!(timeline[0].from, None);
        assert_eq!(timeline[0].to, x);
        assert_eq!((timeline[0].block_number, timeline[0].log_index), (10, 0));

        assert_eq!(timeline[1].from, Some(x));
        assert_eq!(timeline[1].to, z);
        assert_eq!((timeline[1].block_number, timeline[1].log_index), (15, 1));

        assert_eq!(timeline[2].from, Some(z));
        assert_eq!(timeline[2].to, y);
        assert_eq!((timeline[2].block_number, timeline[2].log_index), (15, 2));
    }

    #[test]
    fn exactly_one_record_marks_the_current_owner() {
        let (x, y) = (addr(1), addr(2));
        let lot = snapshot(y);
        let events = vec![
            registered(10, 0, x),
            transferred(11, 0, x, y),
            transferred(12, 0, y, x),
            transferred(13, 0, x, y),
        ];

        let timeline = build_timeline(&lot, events);
        assert_eq!(timeline.len(), 4);

        let flagged: Vec<usize> = timeline
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_current_owner)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(flagged, vec![3]);
        assert_eq!(timeline[3].to, lot.owner);
    }

    #[test]
    fn missing_events_synthesize_a_genesis_record() {
        let owner = addr(7);
        let lot = snapshot(owner);

        let timeline = build_timeline(&lot, vec![]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].from, None);
        assert_eq!(timeline[0].to, owner);
        assert_eq!(timeline[0].timestamp, lot.registered_at);
        assert_eq!(timeline[0].transaction_hash, None);
        assert!(timeline[0].is_current_owner);
    }

    #[test]
    fn event_query_failure_keeps_the_snapshot() {
        let owner = addr(9);
        let trace = assemble_trace(
            lot_id("CODE-77"),
            snapshot(owner),
            Ok(vec![]),
            Err(ChainError::EventQueryFailed("log backend offline".to_string())),
        );

        assert_eq!(trace.lot.owner, owner);
        assert!(matches!(
            trace.timeline,
            Err(ChainError::EventQueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn nonexistent_lot_reports_not_found() {
        use ethers::abi::Token;
        use ethers::providers::Provider;
        use std::sync::Arc;

        // `obtenerLote` answering with a zeroed record and `existe = false`.
        let (provider, mock) = Provider::mocked();
        let empty_lot = ethers::abi::encode(&[
            Token::String(String::new()),
            Token::String(String::new()),
            Token::Uint(U256::zero()),
            Token::Uint(U256::zero()),
            Token::String(String::new()),
            Token::Uint(U256::zero()),
            Token::Tuple(vec![
                Token::String(String::new()),
                Token::String(String::new()),
                Token::String(String::new()),
                Token::String(String::new()),
            ]),
            Token::Address(Address::zero()),
            Token::Uint(U256::zero()),
            Token::Uint(U256::zero()),
            Token::Bool(false),
        ]);
        mock.push::<String, _>(format!("0x{}", ethers::utils::hex::encode(empty_lot)))
            .unwrap();

        let registry = RegistryClient::new(Address::zero(), Arc::new(provider));
        assert!(matches!(
            trace_lot(&registry, "CODE-404").await,
            Err(ChainError::LotNotFound)
        ));
    }

    #[test]
    fn successful_queries_produce_a_timeline() {
        let (x, y) = (addr(1), addr(2));
        let lot = snapshot(y);
        let registration = LoteRegistradoFilter {
            lote_id: lot_id("CODE-77"),
            propietario: x,
            fecha_registro: U256::from(1_736_000_000u64),
        };
        let transfer = LoteTransferidoFilter {
            lote_id: lot_id("CODE-77"),
            propietario_anterior: x,
            nuevo_propietario: y,
            fecha_transferencia: U256::from(1_736_100_000u64),
        };
        let meta_at = |block: u64, log: u64| LogMeta {
            address: Address::zero(),
            block_number: block.into(),
            block_hash: H256::zero(),
            transaction_hash: H256::from([0xcc; 32]),
            transaction_index: 0u64.into(),
            log_index: log.into(),
        };

        let trace = assemble_trace(
            lot_id("CODE-77"),
            lot,
            Ok(vec![(registration, meta_at(10, 0))]),
            Ok(vec![(transfer, meta_at(15, 1))]),
        );

        let timeline = trace.timeline.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].from, None);
        assert_eq!(timeline[1].from, Some(x));
        assert!(timeline[1].is_current_owner);
    }
}

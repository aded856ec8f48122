use dac_types::{BatchDescriptor, BatchId, Felt, Index, LeafValue, ReferenceBatchId, RootSet};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayClientError, GatewayClientResult};

/// One `(index, field_values)` entry as the gateway serializes it: the leaf's fields are
/// hex strings, one per 32-byte word, in the order `dac_tree::encode_leaf` expects them
/// concatenated.
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateEntry(pub Index, pub Vec<String>);

#[derive(Debug, Deserialize, Serialize)]
pub struct BatchDataResponse {
    pub batch_id: u64,
    pub reference_batch_id: i64,
    pub prev_batch_root: String,
    pub next_batch_root: String,
    #[serde(default)]
    pub prev_order_root: Option<String>,
    #[serde(default)]
    pub next_order_root: Option<String>,
    pub update_entries: Vec<UpdateEntry>,
    #[serde(default)]
    pub order_update_entries: Vec<UpdateEntry>,
}

fn parse_root(hex: &str) -> GatewayClientResult<Felt> {
    Felt::from_hex(hex).map_err(|e| GatewayClientError::InvalidResponse(e.to_string()))
}

fn parse_reference(raw: i64) -> GatewayClientResult<ReferenceBatchId> {
    match raw {
        -1 => Ok(ReferenceBatchId::Genesis),
        n if n >= 0 => Ok(ReferenceBatchId::Batch(BatchId(n as u64))),
        other => Err(GatewayClientError::InvalidResponse(format!(
            "reference_batch_id must be -1 or non-negative, got {other}"
        ))),
    }
}

fn parse_entries(entries: Vec<UpdateEntry>) -> GatewayClientResult<Vec<(Index, LeafValue)>> {
    entries
        .into_iter()
        .map(|UpdateEntry(index, fields)| {
            let mut bytes = Vec::with_capacity(fields.len() * 32);
            for field in &fields {
                let decoded = hex::decode(field.trim_start_matches("0x"))
                    .map_err(|e| GatewayClientError::InvalidResponse(e.to_string()))?;
                bytes.extend_from_slice(&decoded);
            }
            Ok((index, LeafValue(bytes)))
        })
        .collect()
}

impl BatchDataResponse {
    pub fn into_descriptor(self) -> GatewayClientResult<BatchDescriptor> {
        let order_root = match &self.next_order_root {
            Some(hex) => Some(parse_root(hex)?),
            None => None,
        };
        let prev_order_root = match &self.prev_order_root {
            Some(hex) => Some(parse_root(hex)?),
            None => None,
        };
        Ok(BatchDescriptor {
            batch_id: BatchId(self.batch_id),
            reference_batch_id: parse_reference(self.reference_batch_id)?,
            delta: parse_entries(self.update_entries)?,
            order_delta: parse_entries(self.order_update_entries)?,
            prev_root: RootSet { state_root: parse_root(&self.prev_batch_root)?, order_root: prev_order_root },
            next_root: RootSet { state_root: parse_root(&self.next_batch_root)?, order_root },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApproveNewRootsRequest {
    pub batch_id: u64,
    pub signature: SignatureWire,
    pub claim_hash: String,
    pub member_key: String,
}

#[derive(Debug, Serialize)]
pub struct SignatureWire {
    pub r: String,
    pub s: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_batch() {
        let response = BatchDataResponse {
            batch_id: 3,
            reference_batch_id: 2,
            prev_batch_root: "0x01".into(),
            next_batch_root: "0x02".into(),
            prev_order_root: None,
            next_order_root: None,
            update_entries: vec![UpdateEntry(5, vec!["0x0a".into()])],
            order_update_entries: vec![],
        };
        let descriptor = response.into_descriptor().unwrap();
        assert_eq!(descriptor.batch_id, BatchId(3));
        assert_eq!(descriptor.reference_batch_id, ReferenceBatchId::Batch(BatchId(2)));
        assert_eq!(descriptor.delta, vec![(5, LeafValue(vec![0x0a]))]);
    }

    #[test]
    fn genesis_sentinel_round_trips() {
        assert_eq!(parse_reference(-1).unwrap(), ReferenceBatchId::Genesis);
        assert!(parse_reference(-2).is_err());
    }
}

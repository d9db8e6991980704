//! Wire records consumed from the graph data service.
//!
//! Every field the engine does not strictly need is optional; malformed
//! entries are skipped by the normalizers instead of failing a whole response.

use crate::graph::Amount;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn flag_set(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("Y")
}

/// Address info lookup result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist_yn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist_yn: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AddressInfo {
    pub fn is_whitelisted(&self) -> bool {
        flag_set(&self.whitelist_yn)
    }

    pub fn is_blacklisted(&self) -> bool {
        flag_set(&self.blacklist_yn)
    }
}

/// Address part of a transaction-map or address-map entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist_yn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist_yn: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AddressRecord {
    pub fn info(&self) -> AddressInfo {
        AddressInfo {
            whitelist_yn: self.whitelist_yn.clone(),
            blacklist_yn: self.blacklist_yn.clone(),
            extra: self.extra.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default, alias = "txHash")]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub block: Option<u64>,
    #[serde(default)]
    pub value: Option<Amount>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// One row of a UTXO-family transaction map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMapEntry {
    #[serde(default)]
    pub transaction: Option<TransactionRecord>,
    #[serde(default)]
    pub address: Option<AddressRecord>,
    /// Net flow of the transaction relative to the main address.
    #[serde(default)]
    pub mother_value: Option<Amount>,
    /// Flow between the transaction and the related address.
    #[serde(default)]
    pub child_value: Option<Amount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMap {
    #[serde(default)]
    pub transaction_list: Vec<TransactionMapEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

/// One row of an account-family address map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMapEntry {
    #[serde(default)]
    pub address: Option<AddressRecord>,
    #[serde(default)]
    pub transaction: Option<TransactionRecord>,
    #[serde(default)]
    pub relation_type: Option<RelationType>,
    #[serde(default)]
    pub relation_value: Option<Amount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMap {
    #[serde(default)]
    pub address_list: Vec<AddressMapEntry>,
}

/// Graph response, shaped by network family.
///
/// Not deserialized directly: the caller knows the family it queried and
/// decodes the matching map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphPayload {
    Utxo(TransactionMap),
    Account(AddressMap),
}

impl GraphPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            GraphPayload::Utxo(map) => map.transaction_list.is_empty(),
            GraphPayload::Account(map) => map.address_list.is_empty(),
        }
    }
}

/// Inputs and outputs of a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    #[serde(default)]
    pub address_list: Vec<AddressMapEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One link of a denylist trace: `wallet_address` received via `tx_hash` from `prev_address`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hop {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub prev_address: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub value: Option<Amount>,
    #[serde(default)]
    pub block: Option<u64>,
    #[serde(default)]
    pub address_info: Option<AddressInfo>,
}

impl Hop {
    pub fn is_complete(&self) -> bool {
        self.wallet_address.is_some() && self.tx_hash.is_some() && self.prev_address.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenylistDetail {
    #[serde(default)]
    pub source_details: Vec<Hop>,
    #[serde(default)]
    pub risk_level: Option<Value>,
    #[serde(default)]
    pub wallet_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenylistResponse {
    #[serde(default)]
    pub rsp_code: Option<String>,
    #[serde(default)]
    pub is_denylist: Option<String>,
    #[serde(default)]
    pub denylist_detail: Option<DenylistDetail>,
}

impl DenylistResponse {
    const SUCCESS_CODES: [&'static str; 2] = ["0000", "A0000"];

    /// True when the lookup succeeded and flagged the address.
    pub fn is_hit(&self) -> bool {
        let ok = self
            .rsp_code
            .as_deref()
            .map_or(true, |code| Self::SUCCESS_CODES.contains(&code));
        ok && flag_set(&self.is_denylist)
    }

    /// Hop chain of a hit, if any.
    pub fn hops(&self) -> Option<&[Hop]> {
        if !self.is_hit() {
            return None;
        }
        self.denylist_detail
            .as_ref()
            .map(|detail| detail.source_details.as_slice())
            .filter(|hops| !hops.is_empty())
    }
}

/// Which flow directions a query requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "LEFT")]
    Left,
    #[serde(rename = "RIGHT")]
    Right,
}

impl Direction {
    pub fn allows_right(&self) -> bool {
        !matches!(self, Direction::Left)
    }

    pub fn allows_left(&self) -> bool {
        !matches!(self, Direction::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_info_flags() {
        let info: AddressInfo =
            serde_json::from_value(json!({"whitelistYn": "Y", "label": "exchange"})).unwrap();
        assert!(info.is_whitelisted());
        assert!(!info.is_blacklisted());
        assert_eq!(info.extra.get("label"), Some(&json!("exchange")));
    }

    #[test]
    fn test_payload_shapes() {
        let utxo: TransactionMap =
            serde_json::from_value(json!({"transactionList": [{"motherValue": 5}]})).unwrap();
        assert_eq!(utxo.transaction_list.len(), 1);
        assert!(!GraphPayload::Utxo(utxo).is_empty());

        let account: AddressMap = serde_json::from_value(json!({
            "addressList": [{"address": {"addr": "0xabc"}, "relationType": "OUT", "relationValue": 7}]
        }))
        .unwrap();
        assert_eq!(account.address_list[0].relation_type, Some(RelationType::Out));
        assert_eq!(account.address_list[0].address.as_ref().unwrap().addr.as_deref(), Some("0xabc"));

        let empty: AddressMap = serde_json::from_value(json!({})).unwrap();
        assert!(GraphPayload::Account(empty).is_empty());
    }

    #[test]
    fn test_amounts_beyond_u64_keep_every_digit() {
        use std::str::FromStr;

        let exact = Amount::from_str("123456789012345678901").unwrap();
        let account: AddressMap = serde_json::from_str(
            r#"{"addressList": [{"relationValue": 123456789012345678901}]}"#,
        )
        .unwrap();
        assert_eq!(account.address_list[0].relation_value, Some(exact));

        let utxo: TransactionMap = serde_json::from_str(
            r#"{"transactionList": [{"motherValue": -123456789012345678901, "childValue": 0.1000000000000000055}]}"#,
        )
        .unwrap();
        assert_eq!(utxo.transaction_list[0].mother_value, Some(-exact));
        assert_eq!(
            utxo.transaction_list[0].child_value,
            Some(Amount::from_str("0.1000000000000000055").unwrap())
        );

        let detail: TransactionDetail = serde_json::from_str(
            r#"{"addressList": [{"relationValue": 123456789012345678901, "transaction": {"block": 7, "timestamp": 1700000000}}], "fee": 12}"#,
        )
        .unwrap();
        assert_eq!(detail.address_list[0].relation_value, Some(exact));
        assert_eq!(detail.address_list[0].transaction.as_ref().unwrap().block, Some(7));
        assert_eq!(detail.extra.get("fee"), Some(&json!(12)));
    }

    #[test]
    fn test_denylist_hit() {
        let response: DenylistResponse = serde_json::from_value(json!({
            "rspCode": "A0000",
            "isDenylist": "Y",
            "denylistDetail": {
                "sourceDetails": [{"walletAddress": "a", "txHash": "t", "prevAddress": "b"}],
                "riskLevel": 3
            }
        }))
        .unwrap();
        assert!(response.is_hit());
        assert_eq!(response.hops().map(|h| h.len()), Some(1));

        let failed = DenylistResponse {
            rsp_code: Some("E9999".to_string()),
            is_denylist: Some("Y".to_string()),
            denylist_detail: None,
        };
        assert!(!failed.is_hit());
        assert!(failed.hops().is_none());
    }

    #[test]
    fn test_direction() {
        assert!(Direction::All.allows_left() && Direction::All.allows_right());
        assert!(!Direction::Left.allows_right());
        assert!(!Direction::Right.allows_left());
    }
}

//! Document layout
//!
//! ```text
//! daos/{dao}                                   DAO
//! daos/{dao}/members/{wallet}                  membership
//! daos/{dao}/joinRequests/{wallet}             join request
//! daos/{dao}/{proposals|claims|...}/{id}       chain entities
//! daos/{dao}/documents/{id}/signatures/{wallet}
//! daos/{dao}/treasury/treasury                 treasury summary
//! daos/{dao}/treasury/transactions/transactions/{txHash}
//! users/{uid}                                  profile, wallet, mandate
//! users/{uid}/notifications/{id}
//! users/{uid}/payments/{current_flow|mandate}
//! users/{uid}/subscriptions/{id}
//! payments/{id}, subscriptions/{id}, mandates/{id}   provider mirrors
//! ```
//!
//! Address segments are always the checksummed form.

use alloy_primitives::Address;
use dao_core::{CanonicalAddress, EntityKind};

use crate::store::{CollectionPath, DocumentPath};

pub fn daos() -> CollectionPath {
    CollectionPath::root(EntityKind::Dao.collection())
}

pub fn dao(dao: &Address) -> DocumentPath {
    daos().doc(dao.canonical())
}

/// Collection of a DAO-owned entity kind
pub fn entities(dao_address: &Address, kind: EntityKind) -> CollectionPath {
    dao(dao_address).collection(kind.collection())
}

pub fn entity(dao_address: &Address, kind: EntityKind, id: &str) -> DocumentPath {
    entities(dao_address, kind).doc(id)
}

pub fn members(dao_address: &Address) -> CollectionPath {
    dao(dao_address).collection("members")
}

pub fn member(dao_address: &Address, wallet: &Address) -> DocumentPath {
    members(dao_address).doc(wallet.canonical())
}

pub fn join_requests(dao_address: &Address) -> CollectionPath {
    dao(dao_address).collection("joinRequests")
}

pub fn join_request(dao_address: &Address, wallet: &Address) -> DocumentPath {
    join_requests(dao_address).doc(wallet.canonical())
}

pub fn signatures(dao_address: &Address, document_id: &str) -> CollectionPath {
    entity(dao_address, EntityKind::Document, document_id).collection("signatures")
}

pub fn signature(dao_address: &Address, document_id: &str, signer: &Address) -> DocumentPath {
    signatures(dao_address, document_id).doc(signer.canonical())
}

pub fn treasury(dao_address: &Address) -> DocumentPath {
    dao(dao_address).collection("treasury").doc("treasury")
}

pub fn treasury_transactions(dao_address: &Address) -> CollectionPath {
    dao(dao_address)
        .collection("treasury")
        .doc("transactions")
        .collection("transactions")
}

pub fn users() -> CollectionPath {
    CollectionPath::root("users")
}

pub fn user(uid: &str) -> DocumentPath {
    users().doc(uid)
}

pub fn notifications(uid: &str) -> CollectionPath {
    user(uid).collection("notifications")
}

/// Redirect-flow session and mandate records (`current_flow`, `mandate`)
pub fn user_payment(uid: &str, record: &str) -> DocumentPath {
    user(uid).collection("payments").doc(record)
}

pub fn user_subscriptions(uid: &str) -> CollectionPath {
    user(uid).collection("subscriptions")
}

/// Top-level mirror of a payment provider resource type
pub fn provider_resources(resource_type: &str) -> CollectionPath {
    CollectionPath::root(resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_paths_use_checksummed_addresses() {
        let dao_address = address!("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        let path = entity(&dao_address, EntityKind::Proposal, "7");
        assert_eq!(
            path.to_string(),
            "daos/0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed/proposals/7"
        );
        assert_eq!(
            signature(&dao_address, "3", &dao_address).to_string(),
            "daos/0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed/documents/3/signatures/0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(user_subscriptions("u1").as_str(), "users/u1/subscriptions");
        assert_eq!(
            treasury_transactions(&dao_address).as_str(),
            "daos/0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed/treasury/transactions/transactions"
        );
    }
}

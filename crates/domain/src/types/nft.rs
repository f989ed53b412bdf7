//! NFT inventory payloads

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Nft {
    pub token_id: String,
    pub name: String,
    pub image: String,
    pub attributes: Vec<NftAttribute>,
}

/// One collection with the user's tokens in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NftCollection {
    pub collection: String,
    pub collection_name: String,
    pub nfts: Vec<Nft>,
}

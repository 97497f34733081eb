//! Errors during node interactions.

/// Collection not found on node (spec §4.2 "4xx are failure unless they indicate
/// 'collection not found' when listing, which yields an empty list").
#[derive(Debug, thiserror::Error)]
#[error("collection '{collection}' not found on node")]
pub struct CollectionNotFound {
    pub collection: String,
}

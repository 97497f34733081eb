//! Cluster Coordinator data model (spec §3), plus the builder that folds per-node
//! [`NodeSample`]s into a fresh [`ClusterModel`] (C3 Cluster Model, C5 Collection Aggregator,
//! C6 Snapshot Aggregator; spec §4.3, §4.5, §4.6).
mod builder;
mod model;

pub use self::builder::fold;
pub use self::builder::fold_snapshots;
pub use self::model::ClusterModel;
pub use self::model::ClusterStatus;
pub use self::model::CollectionNodeSlice;
pub use self::model::CollectionReport;
pub use self::model::CollectionView;
pub use self::model::NodeDescriptor;
pub use self::model::NodeSample;
pub use self::model::NodeView;
pub use self::model::OperationResult;
pub use self::model::OperationTargetResult;
pub use self::model::ShardId;
pub use self::model::ShardState;
pub use self::model::ShardTransfer;
pub use self::model::SnapshotEntry;
pub use self::model::SnapshotSource;

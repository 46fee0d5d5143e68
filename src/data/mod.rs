/// Data layer: core types, loading, filtering and anomaly partitioning.
///
/// Architecture:
/// ```text
///   veh182.csv  (`;`-separated)
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse + sort by timestamp → ReadingTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ ReadingTable │  Vec<Reading>, vehicle / province / column index
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  vehicle / date / province predicates → row indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ anomaly  │  indices → (anomalous, normal)
///   └──────────┘
/// ```

pub mod anomaly;
pub mod filter;
pub mod loader;
pub mod model;

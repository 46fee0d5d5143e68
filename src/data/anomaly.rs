use super::model::{ReadingTable, SPEED};

/// Literal flag value marking a sample as anomalous for a channel.
pub const SENTINEL: &str = "Yes";

/// Prefix of the precomputed flag column for each monitored channel.
pub const COLUMN_PREFIX: &str = "anomaly_";

/// Powercar suffixes; each rail vehicle has two engines.
pub const POWERCARS: [&str; 2] = ["PC1", "PC2"];

/// Engine channels monitored per powercar, without the powercar suffix.
pub const ENGINE_CHANNELS: [&str; 3] = ["RS_E_InAirTemp", "RS_E_WatTemp", "RS_T_OilTemp"];

/// Name of the flag column for `channel`. Speed is never flagged.
pub fn anomaly_column(channel: &str) -> Option<String> {
    (channel != SPEED).then(|| format!("{COLUMN_PREFIX}{channel}"))
}

/// Engine channel names for one powercar, e.g. `RS_E_WatTemp_PC1`.
pub fn engine_channels(powercar: &str) -> Vec<String> {
    ENGINE_CHANNELS
        .iter()
        .map(|c| format!("{c}_{powercar}"))
        .collect()
}

/// Flag columns for every engine channel of one powercar.
pub fn engine_columns(powercar: &str) -> Vec<String> {
    engine_channels(powercar)
        .iter()
        .filter_map(|c| anomaly_column(c))
        .collect()
}

/// Flag columns of both powercars, used by the fleet map.
pub fn fleet_columns() -> Vec<String> {
    POWERCARS.iter().flat_map(|pc| engine_columns(pc)).collect()
}

/// Two disjoint views whose union is the partitioned subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub anomalous: Vec<usize>,
    pub normal: Vec<usize>,
}

impl Partition {
    /// `(anomalous, normal)` row counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.anomalous.len(), self.normal.len())
    }
}

fn is_flagged(table: &ReadingTable, idx: usize, column: &str) -> bool {
    table
        .get(idx)
        .and_then(|r| r.attribute(column))
        .is_some_and(|v| v.trim() == SENTINEL)
}

/// Split `subset` into rows where any of `columns` reads "Yes" and the rest.
///
/// Relative order is preserved on both sides.
pub fn partition(table: &ReadingTable, subset: &[usize], columns: &[String]) -> Partition {
    let (anomalous, normal): (Vec<usize>, Vec<usize>) = subset
        .iter()
        .copied()
        .partition(|&i| columns.iter().any(|c| is_flagged(table, i, c)));
    Partition { anomalous, normal }
}

/// Rows of `subset` flagged on a single column.
pub fn channel_anomalies(table: &ReadingTable, subset: &[usize], column: &str) -> Vec<usize> {
    subset
        .iter()
        .copied()
        .filter(|&i| is_flagged(table, i, column))
        .collect()
}

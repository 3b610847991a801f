// Timestamp ordering for the derived view.
use serde::{Deserialize, Serialize};
use shared::models::MarketRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[default]
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Orders `indices` (positions into `all`) by timestamp. The sort is stable,
/// so equal timestamps keep their fetch order.
pub fn sort_indices<R: MarketRecord>(all: &[R], indices: &mut [usize], order: SortOrder) {
    match order {
        SortOrder::Ascending => indices.sort_by_key(|&i| all[i].timestamp()),
        SortOrder::Descending => indices.sort_by(|&a, &b| all[b].timestamp().cmp(&all[a].timestamp())),
    }
}

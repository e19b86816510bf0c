use serde::Serialize;

use crate::schemas::backend::StatsRow;
use crate::services::session_summary::StatsTotals;

#[derive(Debug, Serialize)]
pub(crate) struct StatsOverviewResponse {
    pub(crate) rows: Vec<StatsRow>,
    pub(crate) totals: StatsTotals,
}

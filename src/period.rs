//! Latest-period selection
//!
//! A filing usually restates each figure for the prior year as well; only
//! the figure for the most recent period is kept.

use crate::model::{ConceptValue, Period};

/// Picks the value with the greatest period (start date, then end date).
///
/// Among equal periods the first in document order wins.
pub fn select_latest<I>(values: I) -> Option<ConceptValue>
where
    I: IntoIterator<Item = (Period, f64)>,
{
    values
        .into_iter()
        .reduce(|best, candidate| if candidate.0 > best.0 { candidate } else { best })
        .map(|(period, value)| ConceptValue { period, value })
}

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// Rating summary over approved reviews in one scope.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total_reviews: i64,
    /// Count per star rating; every bucket from 1 to 5 is always present.
    pub distribution: BTreeMap<i32, i64>,
}

/// Aggregates ratings. Values outside 1..=5 are ignored.
pub fn aggregate<I>(ratings: I) -> ReviewStats
where
    I: IntoIterator<Item = i32>,
{
    let mut distribution: BTreeMap<i32, i64> = (MIN_RATING..=MAX_RATING).map(|r| (r, 0)).collect();
    let mut total_reviews = 0_i64;
    let mut sum = 0_i64;

    for rating in ratings {
        if let Some(count) = distribution.get_mut(&rating) {
            *count += 1;
            total_reviews += 1;
            sum += i64::from(rating);
        }
    }

    let average_rating = if total_reviews == 0 {
        0.0
    } else {
        sum as f64 / total_reviews as f64
    };

    ReviewStats {
        average_rating,
        total_reviews,
        distribution,
    }
}

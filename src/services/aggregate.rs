use tracing::{debug, error};
use uuid::Uuid;

use crate::store::Stores;

/// Average tuition rounded up to the next multiple of ten.
pub fn round_up_to_ten(avg: f64) -> i64 {
    ((avg / 10.0).ceil() * 10.0) as i64
}

/// Recompute a bootcamp's `averageCost` from its courses. Failures are logged
/// and never reach the caller.
pub async fn refresh_average_cost(stores: &Stores, bootcamp_id: Uuid) {
    let result = async {
        let avg = stores.courses.average_tuition(bootcamp_id).await?;
        let cost = avg.map(round_up_to_ten);
        stores.bootcamps.set_average_cost(bootcamp_id, cost).await?;
        Ok::<_, crate::store::StoreError>(cost)
    }
    .await;
    match result {
        Ok(cost) => debug!("Bootcamp {} averageCost -> {:?}", bootcamp_id, cost),
        Err(e) => error!("Failed to recompute averageCost for bootcamp {}: {}", bootcamp_id, e),
    }
}

/// Recompute a bootcamp's `averageRating` from its reviews. Failures are
/// logged and never reach the caller.
pub async fn refresh_average_rating(stores: &Stores, bootcamp_id: Uuid) {
    let result = async {
        let avg = stores.reviews.average_rating(bootcamp_id).await?;
        stores.bootcamps.set_average_rating(bootcamp_id, avg).await?;
        Ok::<_, crate::store::StoreError>(avg)
    }
    .await;
    match result {
        Ok(avg) => debug!("Bootcamp {} averageRating -> {:?}", bootcamp_id, avg),
        Err(e) => error!("Failed to recompute averageRating for bootcamp {}: {}", bootcamp_id, e),
    }
}

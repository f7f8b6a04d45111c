use primitives::{ad_spot::ListFilter, AdSpot, Status, Timestamp};
use tokio_postgres::types::ToSql;

use super::{DbPool, PoolError};

const AD_SPOT_COLUMNS: &str =
    "id, title, image_url, placement, status, ttl_minutes, created_at, deactivated_at";

/// ```text
/// INSERT INTO ad_spots (id, title, image_url, placement, status, ttl_minutes, created_at, deactivated_at)
/// VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
/// ```
pub async fn insert_ad_spot(pool: &DbPool, ad_spot: &AdSpot) -> Result<bool, PoolError> {
    let client = pool.get().await?;
    let statement = format!(
        "INSERT INTO ad_spots ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        AD_SPOT_COLUMNS
    );
    let stmt = client.prepare(&statement).await?;

    let ttl_minutes = ad_spot.ttl_minutes.map(i64::from);
    let row = client
        .execute(
            &stmt,
            &[
                &ad_spot.id,
                &ad_spot.title,
                &ad_spot.image_url,
                &ad_spot.placement,
                &ad_spot.status,
                &ttl_minutes,
                &ad_spot.created_at,
                &ad_spot.deactivated_at,
            ],
        )
        .await?;

    let inserted = row == 1;
    Ok(inserted)
}

/// ```text
/// SELECT id, title, image_url, placement, status, ttl_minutes, created_at, deactivated_at FROM ad_spots
/// WHERE id = $1
/// ```
pub async fn fetch_ad_spot(pool: &DbPool, id: &str) -> Result<Option<AdSpot>, PoolError> {
    let client = pool.get().await?;
    let statement = format!("SELECT {} FROM ad_spots WHERE id = $1", AD_SPOT_COLUMNS);
    let stmt = client.prepare(&statement).await?;

    let row = client.query_opt(&stmt, &[&id]).await?;

    Ok(row.as_ref().map(AdSpot::from))
}

/// Only active spots can be deactivated,
/// the returned count is `0` for unknown and already inactive spots alike.
///
/// ```text
/// UPDATE ad_spots SET status = $1, deactivated_at = $2
/// WHERE id = $3 AND status = $4
/// ```
pub async fn deactivate_ad_spot(
    pool: &DbPool,
    id: &str,
    deactivated_at: Timestamp,
) -> Result<u64, PoolError> {
    let client = pool.get().await?;
    let stmt = client
        .prepare("UPDATE ad_spots SET status = $1, deactivated_at = $2 WHERE id = $3 AND status = $4")
        .await?;

    let updated = client
        .execute(
            &stmt,
            &[&Status::Inactive, &deactivated_at, &id, &Status::Active],
        )
        .await?;

    Ok(updated)
}

pub async fn list_ad_spots(pool: &DbPool, filter: &ListFilter) -> Result<Vec<AdSpot>, PoolError> {
    let client = pool.get().await?;

    let (statement, params) = list_statement(filter);
    let stmt = client.prepare(&statement).await?;
    let rows = client.query(&stmt, params.as_slice()).await?;

    Ok(rows.iter().map(AdSpot::from).collect())
}

/// Builds the `SELECT` with only the filters which are set.
///
/// `created_at` is always a UTC timestamp, so ordering the text orders chronologically.
fn list_statement(filter: &ListFilter) -> (String, Vec<&(dyn ToSql + Sync)>) {
    let (mut where_clauses, mut params) = (vec![], Vec::<&(dyn ToSql + Sync)>::new());

    if let Some(placement) = &filter.placement {
        params.push(placement);
        where_clauses.push(format!("placement = ${}", params.len()));
    }

    if let Some(status) = &filter.status {
        params.push(status);
        where_clauses.push(format!("status = ${}", params.len()));
    }

    let where_clause = if !where_clauses.is_empty() {
        format!(" WHERE {}", where_clauses.join(" AND "))
    } else {
        String::new()
    };

    let statement = format!(
        "SELECT {} FROM ad_spots{} ORDER BY created_at DESC",
        AD_SPOT_COLUMNS, where_clause
    );

    (statement, params)
}

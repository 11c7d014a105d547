use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

use super::username_filter::normalize;

/// Usernames known to be taken. Only positives are cached.
static TAKEN_USERNAMES: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

pub async fn mark_taken(username: &str) {
    TAKEN_USERNAMES.insert(normalize(username), ()).await;
}

pub async fn is_taken(username: &str) -> bool {
    TAKEN_USERNAMES.contains_key(&normalize(username))
}

async fn batch_mark(usernames: &[String]) {
    let inserts: Vec<_> = usernames
        .iter()
        .map(|u| TAKEN_USERNAMES.insert(normalize(u), ()))
        .collect();

    futures::future::join_all(inserts).await;
}

/// Preload accounts that logged in during the last `days` days.
pub async fn warmup_username_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT username
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row?;
        batch.push(username);
        total += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    info!(total, days, "Username cache warmup complete");
    Ok(())
}

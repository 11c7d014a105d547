use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use tracing::info;

/// Expected number of accounts and false-positive rate.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// `false` means the username is certainly unused; `true` may be a false positive.
pub fn might_exist(username: &str) -> bool {
    let username = normalize(username);
    match USERNAME_FILTER.read() {
        Ok(filter) => filter.contains(&username),
        // a poisoned filter must not hide existing accounts
        Err(_) => true,
    }
}

pub fn insert(username: &str) {
    insert_batch(&[normalize(username)]);
}

/// Load every login name into the filter, streaming in batches.
pub async fn warmup_username_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&username));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    info!(total, "Username filter warmup complete");
    Ok(())
}

fn insert_batch(usernames: &[String]) {
    let mut filter = match USERNAME_FILTER.write() {
        Ok(filter) => filter,
        Err(poisoned) => poisoned.into_inner(),
    };

    for username in usernames {
        filter.add(username);
    }
}

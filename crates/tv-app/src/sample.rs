//! Seed a small demo trace with page loads and web content interactions

use anyhow::Result;
use tracing::info;
use tv_data::modules::CHROME_INTERACTIONS_MODULE;
use tv_data::QueryEngine;

const PAGE_LOADS: i64 = 8;
const INTERACTIONS: i64 = 24;

/// First id of the interaction rows, kept clear of the page load ids
pub const INTERACTION_ID_BASE: i64 = 1000;

const URLS: [&str; 4] = [
    "https://example.com/",
    "https://example.com/search?q=trace",
    "https://news.example.org/article/42",
    "https://mail.example.net/inbox",
];

const INTERACTION_TYPES: [&str; 3] = ["click", "keyboard", "tap"];

/// Insert the demo rows. Returns the number of rows written.
pub async fn seed_sample_trace(engine: &dyn QueryEngine) -> Result<usize> {
    engine.include_module(CHROME_INTERACTIONS_MODULE).await?;

    let mut rng = 42u32;
    let mut sql = String::new();

    let mut ts = 1_000_000i64;
    for id in 1..=PAGE_LOADS {
        let url = URLS[(random_int(&mut rng) as usize) % URLS.len()];
        // the last load never finished
        let dur = if id == PAGE_LOADS {
            "NULL".to_string()
        } else {
            (150_000_000 + (random_float(&mut rng) * 900_000_000.0) as i64).to_string()
        };
        sql.push_str(&format!(
            "INSERT INTO chrome_page_loads (id, navigation_id, url, navigation_start_ts, dur) \
             VALUES ({}, {}, '{}', {}, {});\n",
            id, id, url, ts, dur
        ));
        ts += 2_000_000_000;
    }

    let mut ts = 1_200_000i64;
    for i in 0..INTERACTIONS {
        let kind = INTERACTION_TYPES[(random_int(&mut rng) as usize) % INTERACTION_TYPES.len()];
        let dur = (8_000_000 + (random_float(&mut rng) * 200_000_000.0) as i64).to_string();
        sql.push_str(&format!(
            "INSERT INTO chrome_web_content_interactions (id, interaction_type, ts, dur) \
             VALUES ({}, '{}', {}, {});\n",
            INTERACTION_ID_BASE + i,
            kind,
            ts,
            dur
        ));
        ts += 300_000_000 + (random_float(&mut rng) * 400_000_000.0) as i64;
    }

    engine.execute(&sql).await?;

    let rows = (PAGE_LOADS + INTERACTIONS) as usize;
    info!("Seeded sample trace with {} rows", rows);
    Ok(rows)
}

fn random_float(seed: &mut u32) -> f64 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    (*seed as f64) / (u32::MAX as f64)
}

fn random_int(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_data::schema::ColumnType;
    use tv_data::{query_rows, ModuleRegistry, RowSchema, SqliteEngine};

    #[tokio::test]
    async fn test_seeded_rows_show_up_in_view() {
        let engine = SqliteEngine::open_in_memory(ModuleRegistry::with_builtins()).unwrap();
        let written = seed_sample_trace(&engine).await.unwrap();

        let schema = RowSchema::named_slice().with_column("type", ColumnType::Str);
        let rows = query_rows(
            &engine,
            "SELECT scoped_id AS id, name, ts, dur, type FROM chrome_interactions",
            &schema,
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), written);

        let open: Vec<_> = rows.iter().filter(|r| r.get_i64("dur") == Some(-1)).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].get_str("type"), Some("chrome_page_loads"));
    }
}

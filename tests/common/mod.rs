//! Shared setup for database-backed tests: a fresh schema per test in `DATABASE_URL`.

#![allow(dead_code)]

use cereal_catalog::{apply_migrations, config::catalog::builtin, resolve, SchemaRegistry};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;

pub struct TestDb {
    pub pool: PgPool,
    pub registry: SchemaRegistry,
    pub schema: String,
}

impl TestDb {
    pub async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        let schema = format!("test_{}", uuid::Uuid::new_v4().simple());
        let registry = resolve(&builtin(), &schema).unwrap();
        apply_migrations(&pool, &registry, false).await.unwrap();
        TestDb { pool, registry, schema }
    }

    pub async fn drop(self) {
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

pub fn fields(v: Value) -> HashMap<String, Value> {
    match v {
        Value::Object(m) => m.into_iter().collect(),
        _ => panic!("expected an object"),
    }
}

pub fn test_flakes() -> Value {
    json!({
        "name": "Test Flakes", "mfr": "K", "type": "C", "calories": 110, "protein": 2,
        "fat": 0, "sodium": 200, "fiber": 1.5, "carbo": 14.0, "sugars": 8, "potass": 35,
        "vitamins": 25, "shelf": 1, "weight": 1.0, "cups": 0.75, "rating": 41.0
    })
}

pub fn product(name: &str, mfr: &str, calories: i64) -> Value {
    let mut p = test_flakes();
    p["name"] = json!(name);
    p["mfr"] = json!(mfr);
    p["calories"] = json!(calories);
    p
}

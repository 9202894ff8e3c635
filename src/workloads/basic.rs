//! The `basic` workload: an even mix of key-value reads and writes, a
//! secondary-index query, and a full-text search over simple random-string
//! documents.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use crate::error::{Error, OpError};
use crate::executor::ExecutionContext;
use crate::matrix::Matrix;
use crate::store::DocumentStore;
use crate::workload::{Document, Runctx, Workload};

use super::{create_query_index, document_rng, ensure_search_index, fake};

pub const NAME: &str = "basic";

const OPERATIONS: &[&str] = &["get", "set", "query", "full-text-search"];
const QUERY_INDEX: &str = "basic-rand-string";
const SEARCH_INDEX: &str = "rand-string-index";

pub struct Basic {
    store: Arc<dyn DocumentStore>,
    num_items: u64,
    seed: u64,
}

impl Basic {
    pub fn new(store: Arc<dyn DocumentStore>, num_items: u64, seed: u64) -> Self {
        Self {
            store,
            num_items,
            seed,
        }
    }

    fn random_id(&self, rctx: &mut Runctx) -> u64 {
        rctx.rng().gen_range(0..self.num_items.max(1))
    }

    async fn get(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let id = self.random_id(rctx);
        self.store
            .get(&id.to_string())
            .await
            .map_err(|e| format!("get operation failed: {e}"))?;
        Ok(())
    }

    async fn set(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let id = self.random_id(rctx);
        let doc = self.generate_document(id);
        self.store
            .upsert(&doc.name, doc.data)
            .await
            .map_err(|e| format!("set operation failed: {e}"))?;
        Ok(())
    }

    async fn query(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let prefix = fake::letter(rctx.rng()).to_string();
        self.store
            .find_by_prefix("rand_string", &prefix, 1)
            .await
            .map_err(|e| format!("query operation failed: {e}"))?;
        Ok(())
    }

    async fn full_text_search(&self, rctx: &mut Runctx) -> Result<(), OpError> {
        let term = fake::letter(rctx.rng()).to_string();
        self.store
            .search(SEARCH_INDEX, &term)
            .await
            .map_err(|e| format!("fts query failed: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl Workload for Basic {
    fn operations(&self) -> &'static [&'static str] {
        OPERATIONS
    }

    fn probabilities(&self) -> Matrix {
        Matrix(vec![vec![0.25; 4]; 4])
    }

    /// A simple random document of the form
    /// `{ "id": 123, "rand_string": "aaiehgmosje" }`.
    fn generate_document(&self, id: u64) -> Document {
        let mut rng = document_rng(self.seed, id);
        let first = char::from(b'a' + (id % 25) as u8);
        let rand_string = format!("{first}{}", fake::lexify(&mut rng, 10));
        Document {
            name: id.to_string(),
            data: json!({ "id": id, "rand_string": rand_string }),
        }
    }

    async fn execute(
        &self,
        operation: &str,
        _ctx: &ExecutionContext,
        rctx: &mut Runctx,
    ) -> Result<(), OpError> {
        match operation {
            "get" => self.get(rctx).await,
            "set" => self.set(rctx).await,
            "query" => self.query(rctx).await,
            "full-text-search" => self.full_text_search(rctx).await,
            other => Err(format!("unknown operation: {other}").into()),
        }
    }

    async fn setup(&self) -> Result<(), Error> {
        create_query_index(self.store.as_ref(), QUERY_INDEX, "rand_string").await?;
        ensure_search_index(self.store.as_ref(), SEARCH_INDEX, "rand_string").await
    }
}

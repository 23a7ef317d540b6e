use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Bounds how many scrape runs execute at once so two runs never write the
/// same user cache concurrently.
#[derive(Debug, Clone)]
pub struct ScrapeGate {
    semaphore: Arc<Semaphore>,
}

impl ScrapeGate {
    pub fn new(max_concurrency: usize) -> Self {
        let permits = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn run<F, T>(&self, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("scrape gate is closed"))?;
        fut.await
    }
}

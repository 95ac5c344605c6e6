//! Transport abstraction over the analysis service

use async_trait::async_trait;
use atlas_stream::{AnalysisClient, PayloadStream};

/// Source of analysis event streams.
///
/// The session only needs "submit a query, get a payload stream back";
/// keeping that behind a trait lets tests script the stream.
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Submit a query, returning the raw payload stream
    async fn analyze(
        &self,
        business_id: &str,
        user_query: &str,
    ) -> atlas_stream::Result<PayloadStream>;
}

#[async_trait]
impl AnalysisTransport for AnalysisClient {
    async fn analyze(
        &self,
        business_id: &str,
        user_query: &str,
    ) -> atlas_stream::Result<PayloadStream> {
        AnalysisClient::analyze(self, business_id, user_query).await
    }
}

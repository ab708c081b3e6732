//! The page capture seam.

use std::future::Future;

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::error::RenderError;

/// Captures one page of the design as a raster image.
///
/// Implementations return a `data:image/...` URL. They should check `cancel`
/// at their own suspension points and return [`RenderError::Cancelled`]; the
/// controller also stops waiting as soon as the token fires.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, page_id: &str, cancel: &CancelToken) -> Result<String, RenderError>;
}

/// Adapts an async closure into a [`PageRenderer`].
pub struct FnRenderer<F>(pub F);

#[async_trait]
impl<F, Fut> PageRenderer for FnRenderer<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, RenderError>> + Send,
{
    async fn render(&self, page_id: &str, _cancel: &CancelToken) -> Result<String, RenderError> {
        (self.0)(page_id.to_string()).await
    }
}

use std::future::Future;

use bytes::Bytes;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// The application side of the server.
///
/// One value is shared by every connection worker, so implementations must
/// either be immutable after construction or synchronize their own state.
/// Each callback is expected to drive the writer completely (status, headers,
/// body) before returning. An `Err` is reported as a handler fault and the
/// client receives the generic failure response instead.
///
/// Implementations can use plain `async fn`.
pub trait Handler: Send + Sync + 'static {
    fn handle_get(
        &self,
        request: &Request,
        response: &mut ResponseWriter,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn handle_post(
        &self,
        request: &Request,
        body: Bytes,
        response: &mut ResponseWriter,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

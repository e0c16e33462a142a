use std::sync::Arc;

use crate::errors::NetworkError;

/// Raw response handed back by a transport. Classification into
/// success, transient and permanent happens above this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Blocking HTTP seam so tests can substitute a scripted server.
pub trait ITransport: Send + Sync {
    /// POST an encoded report and return the raw response.
    fn post(&self, url: &str, body: &[u8]) -> Result<TransportResponse, NetworkError>;
}

impl<T: ITransport + ?Sized> ITransport for Arc<T> {
    fn post(&self, url: &str, body: &[u8]) -> Result<TransportResponse, NetworkError> {
        (**self).post(url, body)
    }
}

//! Request body reader.
//!
//! # Responsibilities
//! - Buffer the request body on first read, bounded by a size limit
//! - Serve later reads from the buffer
//! - Decode as text, JSON or urlencoded form

use std::sync::{Mutex, PoisonError};

use axum::body::{Body, Bytes};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::dispatch::error::BodyError;

/// Lazily buffered request body.
///
/// Concurrent readers wait for the first read to finish and share its
/// buffer. After a failed read the body is gone.
pub struct BodyReader {
    pending: Mutex<Option<Body>>,
    buffered: OnceCell<Bytes>,
    limit: usize,
}

impl BodyReader {
    pub fn new(body: Body, limit: usize) -> Self {
        Self {
            pending: Mutex::new(Some(body)),
            buffered: OnceCell::new(),
            limit,
        }
    }

    fn take(&self) -> Option<Body> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Raw body bytes.
    pub async fn bytes(&self) -> Result<Bytes, BodyError> {
        self.buffered
            .get_or_try_init(|| async {
                let body = self.take().ok_or(BodyError::Unavailable)?;
                axum::body::to_bytes(body, self.limit)
                    .await
                    .map_err(BodyError::Read)
            })
            .await
            .cloned()
    }

    /// Body decoded as UTF-8 text.
    pub async fn text(&self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Body parsed as JSON.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Body parsed as `application/x-www-form-urlencoded` pairs.
    pub async fn form(&self) -> Result<Vec<(String, String)>, BodyError> {
        let bytes = self.bytes().await?;
        Ok(url::form_urlencoded::parse(&bytes).into_owned().collect())
    }
}

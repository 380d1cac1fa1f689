use super::reference::Reference;
use super::snapshot::Snapshot;
use super::{DatabaseError, FirebaseDatabase};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Writes that only succeed when the data has not changed since it was read.
///
/// Every location has to be read with [`Transaction::snapshot`] before it can
/// be written with [`Transaction::set`] or [`Transaction::remove`]; the write
/// then carries the ETag of that read. Created by
/// [`FirebaseDatabase::run_transaction`].
#[derive(Debug)]
pub struct Transaction<'a> {
    database: &'a FirebaseDatabase,
    etags: HashMap<String, String>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(database: &'a FirebaseDatabase) -> Self {
        Self {
            database,
            etags: HashMap::new(),
        }
    }

    /// Reads the location and remembers its ETag for later writes.
    pub async fn snapshot(&mut self, reference: &Reference<'a>) -> Result<Snapshot<'a>, DatabaseError> {
        let (value, etag) = self.database.get_with_etag(reference.path()).await?;
        debug!(path = reference.path(), "snapshotted reference");

        self.etags.insert(reference.path().to_string(), etag);

        Ok(Snapshot::new(reference.clone(), value))
    }

    pub async fn set<T: Serialize + ?Sized>(&self, reference: &Reference<'_>, value: &T) -> Result<(), DatabaseError> {
        let etag = self.etag_for(reference)?;

        self.database
            .set_with_etag(reference.path(), value, etag)
            .await
            .map_err(|e| transaction_failed(reference, e))?;

        Ok(())
    }

    pub async fn remove(&self, reference: &Reference<'_>) -> Result<(), DatabaseError> {
        let etag = self.etag_for(reference)?;

        self.database
            .remove_with_etag(reference.path(), etag)
            .await
            .map_err(|e| transaction_failed(reference, e))
    }

    fn etag_for(&self, reference: &Reference<'_>) -> Result<&str, DatabaseError> {
        self.etags
            .get(reference.path())
            .map(String::as_str)
            .ok_or_else(|| DatabaseError::ReferenceHasNotBeenSnapshotted(reference.to_string()))
    }
}

fn transaction_failed(reference: &Reference<'_>, error: DatabaseError) -> DatabaseError {
    let path = reference.path().to_string();

    let message = match &error {
        DatabaseError::PreconditionFailed(_) => format!(
            "The reference {} has changed remotely since the transaction has been started.",
            path
        ),
        other => format!("The transaction on {} failed: {}", path, other),
    };

    DatabaseError::TransactionFailed {
        path,
        message,
        source: Box::new(error),
    }
}

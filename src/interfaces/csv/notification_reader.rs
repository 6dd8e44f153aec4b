use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One notification to replay through the dispatcher.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct NotificationRecord {
    pub transaction_id: String,
}

/// Reads notifications to replay from a CSV source with a `transaction_id`
/// column.
///
/// Used to re-process notifications the provider gave up on.
pub struct NotificationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> NotificationReader<R> {
    /// Creates a new `NotificationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads notification records.
    pub fn notifications(self) -> impl Iterator<Item = Result<NotificationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

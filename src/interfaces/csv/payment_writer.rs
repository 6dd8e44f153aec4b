use crate::domain::payment::PaymentRecord;
use crate::domain::status::LocalStatus;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PaymentRow<'a> {
    payment: u64,
    order: u64,
    remote_id: &'a str,
    amount: Decimal,
    currency: &'a str,
    status: LocalStatus,
    remote_status: &'a str,
}

/// Writes payment records as CSV.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes all records, ordered by payment id, and flushes the sink.
    pub fn write_payments(&mut self, mut payments: Vec<PaymentRecord>) -> Result<()> {
        payments.sort_by_key(|p| p.id);
        for p in &payments {
            self.writer.serialize(PaymentRow {
                payment: p.id,
                order: p.order_id,
                remote_id: &p.remote_id,
                amount: p.amount.amount,
                currency: &p.amount.currency,
                status: p.status,
                remote_status: &p.remote_status_label,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::Money;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_payments() {
        let mut second = PaymentRecord::new(2, 1, "tx-2", Money::new(dec!(5.5), "EUR"));
        second.status = LocalStatus::Complete;
        second.remote_status_label = "PAID".to_string();
        let first = PaymentRecord::new(1, 1, "tx-1", Money::new(dec!(10), "EUR"));

        let mut buf = Vec::new();
        PaymentWriter::new(&mut buf)
            .write_payments(vec![second, first])
            .unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "payment,order,remote_id,amount,currency,status,remote_status"
        );
        assert_eq!(lines[1], "1,1,tx-1,10,EUR,new,");
        assert_eq!(lines[2], "2,1,tx-2,5.5,EUR,complete,PAID");
    }
}

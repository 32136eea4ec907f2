//! Staged transaction pipeline.
//!
//! A simulated paginated API is flattened into single transactions, grouped
//! into fixed-size batches and converted into record batches. Every stage
//! wraps the previous one and pulls from it on demand, so at most one page
//! and one batch are alive at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{
    ArrayRef, Float32Builder, Int64Builder, StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, TimeDelta, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{BatchSource, SourceError};

const MERCHANTS: &[&str] = &["Amazon", "Uber", "Netflix", "Starbucks", "Apple"];

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $(#[doc = $value] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Value as stored in the output column
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Settlement state of a transaction
    TransactionStatus {
        Completed => "completed",
        Pending => "pending",
        Failed => "failed",
    }
);

string_enum!(
    /// Transaction currency
    Currency {
        Usd => "USD",
        Eur => "EUR",
        Gbp => "GBP",
        Jpy => "JPY",
    }
);

string_enum!(
    /// Spending category
    Category {
        Food => "food",
        Transport => "transport",
        Entertainment => "entertainment",
        Shopping => "shopping",
        Bills => "bills",
    }
);

string_enum!(
    /// How a transaction was paid
    PaymentMethod {
        CreditCard => "credit_card",
        DebitCard => "debit_card",
        Paypal => "paypal",
        Crypto => "crypto",
    }
);

/// A single transaction record returned by the API
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// `TXN` followed by an eight-digit sequence number
    pub transaction_id: String,
    /// `USER` followed by a number in 1000..=9999
    pub user_id: String,
    /// Amount, rounded to cents
    pub amount: f64,
    /// Currency of `amount`
    pub currency: Currency,
    /// Settlement state
    pub status: TransactionStatus,
    /// Spending category
    pub category: Category,
    /// When the transaction happened
    pub timestamp: NaiveDateTime,
    /// Merchant name
    pub merchant: &'static str,
    /// How it was paid
    pub payment_method: PaymentMethod,
}

/// One page of API results
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// Records on this page
    pub data: Vec<Transaction>,
    /// Page number, starting at 1
    pub page: u32,
    /// Configured page size
    pub page_size: usize,
    /// Whether another page follows
    pub has_more: bool,
}

/// Simulated paginated transaction API
pub struct TransactionApi {
    page_size: usize,
    total_pages: u32,
    latency: Duration,
    reference_time: NaiveDateTime,
    rng: StdRng,
    next_page: u32,
}

impl TransactionApi {
    /// Create an API serving `total_pages` pages of `page_size` records
    pub fn new(page_size: usize, total_pages: u32, seed: u64) -> Result<Self, SourceError> {
        if page_size == 0 {
            return Err(SourceError::InvalidConfig(
                "page_size must be positive".to_string(),
            ));
        }
        if total_pages == 0 {
            return Err(SourceError::InvalidConfig(
                "total_pages must be positive".to_string(),
            ));
        }

        Ok(Self {
            page_size,
            total_pages,
            latency: Duration::ZERO,
            reference_time: Utc::now().naive_utc(),
            rng: StdRng::seed_from_u64(seed),
            next_page: 1,
        })
    }

    /// Sleep this long before serving each page
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Timestamps are drawn from the year before `reference_time`
    pub fn with_reference_time(mut self, reference_time: NaiveDateTime) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Total number of records served over all pages
    pub fn total_records(&self) -> usize {
        self.page_size * self.total_pages as usize
    }

    /// Fetch a specific page (1-based)
    pub fn fetch_page(&mut self, page: u32) -> Result<PageResponse, SourceError> {
        if page == 0 || page > self.total_pages {
            return Err(SourceError::Fetch {
                page,
                reason: format!("page out of range 1..={}", self.total_pages),
            });
        }

        debug!("Fetching page {}...", page);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let start_id = (page as usize - 1) * self.page_size;
        let data = (0..self.page_size)
            .map(|i| self.transaction(start_id + i))
            .collect();

        Ok(PageResponse {
            data,
            page,
            page_size: self.page_size,
            has_more: page < self.total_pages,
        })
    }

    /// Fetch the page after the previously fetched one, `None` after the last
    pub fn next_page(&mut self) -> Result<Option<PageResponse>, SourceError> {
        if self.next_page > self.total_pages {
            return Ok(None);
        }
        let response = self.fetch_page(self.next_page)?;
        if !response.has_more {
            info!("Reached last page: {}", response.page);
        }
        self.next_page += 1;
        Ok(Some(response))
    }

    fn transaction(&mut self, id: usize) -> Transaction {
        let rng = &mut self.rng;
        let days_ago = rng.gen_range(0..=365);
        Transaction {
            transaction_id: format!("TXN{:08}", id),
            user_id: format!("USER{}", rng.gen_range(1000..=9999)),
            amount: (rng.gen_range(10.0..=5000.0f64) * 100.0).round() / 100.0,
            currency: *Currency::ALL.choose(rng).unwrap_or(&Currency::Usd),
            status: *TransactionStatus::ALL
                .choose(rng)
                .unwrap_or(&TransactionStatus::Completed),
            category: *Category::ALL.choose(rng).unwrap_or(&Category::Food),
            timestamp: self.reference_time - TimeDelta::days(days_ago),
            merchant: MERCHANTS.choose(rng).copied().unwrap_or(MERCHANTS[0]),
            payment_method: *PaymentMethod::ALL
                .choose(rng)
                .unwrap_or(&PaymentMethod::CreditCard),
        }
    }
}

/// A pull-based stream of single transactions
pub trait TransactionStream {
    /// Next transaction, or `None` once the stream is exhausted
    fn next_transaction(&mut self) -> Result<Option<Transaction>, SourceError>;
}

/// Flattens API pages into single transactions
pub struct TransactionExtractor {
    api: TransactionApi,
    current: std::vec::IntoIter<Transaction>,
}

impl TransactionExtractor {
    /// Pull pages from `api` on demand
    pub fn new(api: TransactionApi) -> Self {
        Self {
            api,
            current: Vec::new().into_iter(),
        }
    }
}

impl TransactionStream for TransactionExtractor {
    fn next_transaction(&mut self) -> Result<Option<Transaction>, SourceError> {
        loop {
            if let Some(transaction) = self.current.next() {
                return Ok(Some(transaction));
            }
            match self.api.next_page()? {
                Some(page) => self.current = page.data.into_iter(),
                None => return Ok(None),
            }
        }
    }
}

/// Groups a transaction stream into batches of `batch_size`.
///
/// The final batch holds the remainder and may be shorter; no batch is ever
/// empty.
pub struct Batcher<S> {
    inner: S,
    batch_size: usize,
}

impl<S: TransactionStream> Batcher<S> {
    /// Group `inner` into batches; `batch_size` must be positive
    pub fn new(inner: S, batch_size: usize) -> Result<Self, SourceError> {
        if batch_size == 0 {
            return Err(SourceError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(Self { inner, batch_size })
    }

    /// Next group of transactions, `None` once the stream is exhausted
    pub fn next_group(&mut self) -> Result<Option<Vec<Transaction>>, SourceError> {
        let mut group = Vec::with_capacity(self.batch_size);
        while group.len() < self.batch_size {
            match self.inner.next_transaction()? {
                Some(transaction) => group.push(transaction),
                None => break,
            }
        }
        Ok((!group.is_empty()).then_some(group))
    }
}

/// Schema of the transaction record batches
pub fn transaction_schema() -> SchemaRef {
    let utf8 = |name: &str| Field::new(name, DataType::Utf8, false);
    let timestamp = |name: &str| {
        Field::new(
            name,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        )
    };
    Arc::new(Schema::new(vec![
        utf8("transaction_id"),
        utf8("user_id"),
        Field::new("amount", DataType::Float32, false),
        utf8("currency"),
        utf8("status"),
        utf8("category"),
        timestamp("timestamp"),
        utf8("merchant"),
        utf8("payment_method"),
        Field::new("batch_number", DataType::Int64, false),
        timestamp("processed_at"),
    ]))
}

/// Converts transaction groups into record batches, tagging each with its
/// 1-based batch number and the time it was processed
pub struct TransactionFrames<S> {
    batcher: Batcher<S>,
    schema: SchemaRef,
    batch_number: i64,
}

impl TransactionFrames<TransactionExtractor> {
    /// Assemble the full pipeline on top of `api`
    pub fn from_api(api: TransactionApi, batch_size: usize) -> Result<Self, SourceError> {
        info!(
            "Transaction pipeline: {} records, batch size {}",
            api.total_records(),
            batch_size
        );
        Ok(Self::new(Batcher::new(
            TransactionExtractor::new(api),
            batch_size,
        )?))
    }
}

impl<S: TransactionStream> TransactionFrames<S> {
    /// Convert the groups of `batcher` into record batches
    pub fn new(batcher: Batcher<S>) -> Self {
        Self {
            batcher,
            schema: transaction_schema(),
            batch_number: 0,
        }
    }

    fn to_record_batch(&self, group: &[Transaction]) -> Result<RecordBatch, SourceError> {
        let rows = group.len();
        let processed_at = Utc::now().timestamp_micros();

        let mut transaction_id = StringBuilder::with_capacity(rows, rows * 11);
        let mut user_id = StringBuilder::with_capacity(rows, rows * 8);
        let mut amount = Float32Builder::with_capacity(rows);
        let mut currency = StringBuilder::with_capacity(rows, rows * 3);
        let mut status = StringBuilder::with_capacity(rows, rows * 9);
        let mut category = StringBuilder::with_capacity(rows, rows * 13);
        let mut timestamp = TimestampMicrosecondBuilder::with_capacity(rows);
        let mut merchant = StringBuilder::with_capacity(rows, rows * 9);
        let mut payment_method = StringBuilder::with_capacity(rows, rows * 11);
        let mut batch_number = Int64Builder::with_capacity(rows);
        let mut processed = TimestampMicrosecondBuilder::with_capacity(rows);

        for t in group {
            transaction_id.append_value(&t.transaction_id);
            user_id.append_value(&t.user_id);
            amount.append_value(t.amount as f32);
            currency.append_value(t.currency.as_str());
            status.append_value(t.status.as_str());
            category.append_value(t.category.as_str());
            timestamp.append_value(t.timestamp.and_utc().timestamp_micros());
            merchant.append_value(t.merchant);
            payment_method.append_value(t.payment_method.as_str());
            batch_number.append_value(self.batch_number);
            processed.append_value(processed_at);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(transaction_id.finish()),
            Arc::new(user_id.finish()),
            Arc::new(amount.finish()),
            Arc::new(currency.finish()),
            Arc::new(status.finish()),
            Arc::new(category.finish()),
            Arc::new(timestamp.finish()),
            Arc::new(merchant.finish()),
            Arc::new(payment_method.finish()),
            Arc::new(batch_number.finish()),
            Arc::new(processed.finish()),
        ];
        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }
}

impl<S: TransactionStream> BatchSource for TransactionFrames<S> {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        let Some(group) = self.batcher.next_group()? else {
            return Ok(None);
        };
        self.batch_number += 1;
        let batch = self.to_record_batch(&group)?;
        info!(
            "Created batch {} with {} records",
            self.batch_number,
            batch.num_rows()
        );
        Ok(Some(batch))
    }
}

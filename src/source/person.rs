//! Synthetic person records.
//!
//! Values are drawn from small word lists with a seeded RNG, so a given seed
//! always yields the same rows regardless of the block size.

use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{BatchSource, SourceError};

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Daniel", "Nancy", "Matthew", "Lisa", "Anthony", "Betty",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
];

const STREETS: &[&str] = &[
    "Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake", "Hill", "Park",
    "Sunset", "Ridge", "River", "Forest", "Highland",
];

const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Blvd", "Rd", "Ln", "Dr", "Ct", "Way"];

const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview",
    "Salem", "Madison", "Georgetown", "Arlington", "Ashland", "Burlington", "Manchester",
];

const STATES: &[&str] = &[
    "Alabama", "Alaska", "Arizona", "California", "Colorado", "Florida", "Georgia", "Illinois",
    "Kentucky", "Maine", "Michigan", "Nevada", "New York", "Ohio", "Oregon", "Texas", "Utah",
    "Vermont", "Virginia", "Washington",
];

const COUNTRIES: &[&str] = &[
    "United States", "Canada", "Mexico", "Brazil", "United Kingdom", "France", "Germany",
    "Spain", "Italy", "Netherlands", "Sweden", "Japan", "Australia", "India", "South Africa",
];

const JOBS: &[&str] = &[
    "Software engineer", "Accountant", "Civil engineer", "Teacher", "Nurse", "Data scientist",
    "Architect", "Pharmacist", "Journalist", "Electrician", "Chef", "Graphic designer",
    "Lawyer", "Physiotherapist", "Librarian", "Pilot",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "and Sons", "Ltd", "PLC"];

const EMAIL_DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Mobile Safari/537.36",
];

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua",
    "enim", "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris",
];

const IBAN_COUNTRIES: &[&str] = &["GB", "DE", "FR", "ES", "IT", "NL"];

const MAX_TEXT_CHARS: usize = 200;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Schema of the person records
pub fn person_schema() -> SchemaRef {
    let utf8 = |name: &str| Field::new(name, DataType::Utf8, false);
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        utf8("name"),
        utf8("email"),
        utf8("address"),
        utf8("city"),
        utf8("state"),
        utf8("zip_code"),
        utf8("country"),
        utf8("phone_number"),
        Field::new("date_of_birth", DataType::Date32, false),
        utf8("job"),
        utf8("company"),
        utf8("ssn"),
        utf8("credit_card_number"),
        utf8("iban"),
        utf8("ipv4"),
        utf8("user_agent"),
        utf8("text"),
    ]))
}

/// Produces `total_records` person rows in blocks of `block_size`
pub struct PersonSource {
    schema: SchemaRef,
    rng: StdRng,
    total_records: usize,
    block_size: usize,
    next_id: usize,
    blocks_emitted: usize,
    birth_range: (i32, i32),
}

impl PersonSource {
    /// Create a source; `block_size` must be positive
    pub fn new(total_records: usize, block_size: usize, seed: u64) -> Result<Self, SourceError> {
        if block_size == 0 {
            return Err(SourceError::InvalidConfig(
                "block_size must be positive".to_string(),
            ));
        }

        let epoch_days = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .map(|date| date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                .ok_or_else(|| SourceError::InvalidConfig(format!("invalid date {y}-{m}-{d}")))
        };
        let birth_range = (epoch_days(1940, 1, 1)?, epoch_days(2006, 12, 31)?);

        info!(
            "Generating {} records in blocks of {} (seed {})",
            total_records, block_size, seed
        );

        Ok(Self {
            schema: person_schema(),
            rng: StdRng::seed_from_u64(seed),
            total_records,
            block_size,
            next_id: 0,
            blocks_emitted: 0,
            birth_range,
        })
    }

    /// Number of blocks this source produces in total
    pub fn num_blocks(&self) -> usize {
        self.total_records.div_ceil(self.block_size)
    }

    /// Rows not yet produced
    pub fn remaining(&self) -> usize {
        self.total_records - self.next_id
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn digits(&mut self, n: usize) -> String {
        (0..n)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn text(&mut self) -> String {
        let mut text = String::with_capacity(MAX_TEXT_CHARS);
        loop {
            let word = self.pick(LOREM);
            if text.len() + word.len() + 2 > MAX_TEXT_CHARS {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
        text.push('.');
        text
    }

    fn generate(&mut self, rows: usize) -> Result<RecordBatch, SourceError> {
        let mut id = Int64Builder::with_capacity(rows);
        let mut dob = Date32Builder::with_capacity(rows);
        let mut columns: Vec<StringBuilder> = (0..16)
            .map(|_| StringBuilder::with_capacity(rows, rows * 16))
            .collect();

        for i in 0..rows {
            let first = self.pick(FIRST_NAMES);
            let last = self.pick(LAST_NAMES);
            let street_number = self.rng.gen_range(1..10_000);
            let street = self.pick(STREETS);
            let suffix = self.pick(STREET_SUFFIXES);
            let domain = self.pick(EMAIL_DOMAINS);
            let company_owner = self.pick(LAST_NAMES);
            let company_suffix = self.pick(COMPANY_SUFFIXES);
            let iban_country = self.pick(IBAN_COUNTRIES);

            let values = [
                format!("{first} {last}"),
                format!(
                    "{}.{}@{}",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    domain
                ),
                format!("{street_number} {street} {suffix}"),
                self.pick(CITIES).to_string(),
                self.pick(STATES).to_string(),
                self.digits(5),
                self.pick(COUNTRIES).to_string(),
                format!("({}) {}-{}", self.digits(3), self.digits(3), self.digits(4)),
                self.pick(JOBS).to_string(),
                format!("{company_owner} {company_suffix}"),
                format!("{}-{}-{}", self.digits(3), self.digits(2), self.digits(4)),
                format!("4{}", self.digits(15)),
                format!("{iban_country}{}", self.digits(20)),
                format!(
                    "{}.{}.{}.{}",
                    self.rng.gen_range(1..=223u8),
                    self.rng.gen::<u8>(),
                    self.rng.gen::<u8>(),
                    self.rng.gen_range(1..=254u8)
                ),
                self.pick(USER_AGENTS).to_string(),
                self.text(),
            ];

            id.append_value((self.next_id + i) as i64);
            dob.append_value(self.rng.gen_range(self.birth_range.0..=self.birth_range.1));
            for (builder, value) in columns.iter_mut().zip(values.iter()) {
                builder.append_value(value);
            }
        }

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(18);
        arrays.push(Arc::new(id.finish()));
        let mut strings = columns.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef);
        // name .. phone_number precede date_of_birth
        arrays.extend(strings.by_ref().take(8));
        arrays.push(Arc::new(dob.finish()));
        arrays.extend(strings);

        Ok(RecordBatch::try_new(self.schema.clone(), arrays)?)
    }
}

impl BatchSource for PersonSource {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        let rows = self.block_size.min(self.remaining());
        if rows == 0 {
            return Ok(None);
        }

        info!(
            "Generating block {}/{} ({} records)",
            self.blocks_emitted + 1,
            self.num_blocks(),
            rows
        );
        let batch = self.generate(rows)?;
        self.next_id += rows;
        self.blocks_emitted += 1;
        debug!("Generated {} records so far", self.next_id);

        Ok(Some(batch))
    }
}

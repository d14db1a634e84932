//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for catalogue integration tests.

#![allow(dead_code)]

use catalogue::{
    CascadeReport, Catalogue, CatalogueError, InMemorySource, NewStatistic, Recomputer, Source,
};
use chrono::NaiveDateTime;
use engine::{FieldRef, StatisticId, FieldValue, Granularity, Record, ResultRow, RowKind, RunOptions};
use horizontal_engine::{HorizontalConfig, Purpose};
use vertical_engine::VerticalConfig;

/// Form id of the sample order records.
pub const ORDERS: &str = "orders";

/// Reference instant: every fixture month has fully elapsed.
pub fn fixed_now() -> RunOptions {
    RunOptions::at(NaiveDateTime::parse_from_str("2024-04-10 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
}

/// Test harness holding a catalogue and the record store it reads from.
pub struct TestHarness {
    pub catalogue: Catalogue,
    pub source: InMemorySource,
}

impl TestHarness {
    /// Create a new test harness with an empty catalogue and store.
    pub fn new() -> Self {
        TestHarness {
            catalogue: Catalogue::new(),
            source: InMemorySource::new(),
        }
    }

    /// Create a harness whose store holds the sample orders.
    pub fn with_orders() -> Self {
        let mut harness = Self::new();
        harness.source.insert_form(ORDERS, OrdersFixture::records());
        harness
    }

    pub fn create(&mut self, new: NewStatistic) -> StatisticId {
        self.catalogue.create(new).unwrap()
    }

    /// Monthly sum of `amt` over the raw orders.
    pub fn create_monthly(&mut self, name: &str) -> StatisticId {
        let config = VerticalConfig::new("date", Granularity::Month).with_field(FieldRef::new("amt", "Amount"));
        self.create(NewStatistic::new(name, Source::raw_form(ORDERS), config))
    }

    /// Ranking of an upstream statistic's rows by `amt`, grouped by `group`.
    pub fn create_ranking(&mut self, name: &str, upstream: StatisticId, group: &str, top_n: Option<usize>) -> StatisticId {
        let mut config = HorizontalConfig::new()
            .with_group(FieldRef::new(group, group))
            .with_field(FieldRef::new("amt", "Amount"));
        config.purpose = Purpose::RatioAnalysis;
        config.top_n = top_n;
        self.create(NewStatistic::new(name, Source::statistic(upstream), config))
    }

    pub fn update(&mut self, id: StatisticId) -> Result<(), CatalogueError> {
        Recomputer::new(&self.source)
            .with_options(fixed_now())
            .update(&mut self.catalogue, id)
            .map(|_| ())
    }

    pub fn cascade(&mut self, id: StatisticId) -> Result<CascadeReport, CatalogueError> {
        Recomputer::new(&self.source)
            .with_options(fixed_now())
            .cascade(&mut self.catalogue, id)
    }

    /// Stored rows of a statistic.
    pub fn rows(&self, id: StatisticId) -> &[ResultRow] {
        &self.catalogue.get(id).unwrap().data
    }

    /// Stored rows of one kind.
    pub fn rows_of(&self, id: StatisticId, kind: RowKind) -> Vec<&ResultRow> {
        self.rows(id).iter().filter(|row| row.kind == kind).collect()
    }
}

/// Sample orders: (date, region, product, amount).
pub struct OrdersFixture;

impl OrdersFixture {
    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64)> {
        vec![
            ("2024-01-05", "North", "Apples", 10.0),
            ("2024-01-20", "South", "Pears", 5.0),
            ("2024-02-02", "North", "Pears", 7.0),
            ("2024-02-14", "East", "Apples", 12.0),
            ("2024-03-03", "South", "Apples", 20.0),
            ("2024-03-28", "North", "Plums", 3.0),
        ]
    }

    pub fn records() -> Vec<Record> {
        Self::data()
            .into_iter()
            .map(|(date, region, product, amt)| order(date, region, product, amt))
            .collect()
    }
}

pub fn order(date: &str, region: &str, product: &str, amt: f64) -> Record {
    Record::from_pairs([
        ("date", FieldValue::text(date)),
        ("region", FieldValue::text(region)),
        ("product", FieldValue::text(product)),
        ("amt", FieldValue::Number(amt)),
    ])
}

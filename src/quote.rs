// 4.0: quote resolver. last-known native bid/ask per instrument per bucket
// with carry-forward, converted to USD through the conversion map.
//
// 4.2 RateView is the single place conversion arithmetic happens. the rule,
// applied uniformly to fill pricing, realization and valuation: value
// entering/closing a long converts at the conversion instrument's bid, a
// short at its ask.

use crate::conversion::ConversionDescriptor;
use crate::types::{Instrument, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// External market-data row, one per instrument per bucket upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub time: Timestamp,
    pub instrument: Instrument,
    pub bid: Price,
    pub ask: Price,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QuoteError {
    #[error("no quote for {instrument} at or before bucket {bucket}")]
    MissingQuote {
        instrument: Instrument,
        bucket: Timestamp,
    },
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    time: Timestamp,
    bid: Price,
    ask: Price,
}

// 4.1: read-only board of bucketed quote series. built once per run and
// shared across instrument folds. carry-forward is a range lookup, never
// mutable state, so lookups stay deterministic under any access order.
#[derive(Debug, Clone)]
pub struct QuoteBoard {
    bucket_width_ms: i64,
    series: HashMap<Instrument, BTreeMap<i64, Sample>>,
}

impl QuoteBoard {
    pub fn new(bucket_width_ms: i64) -> Self {
        Self {
            bucket_width_ms,
            series: HashMap::new(),
        }
    }

    pub fn from_quotes(quotes: &[MarketQuote], bucket_width_ms: i64) -> Self {
        let mut board = Self::new(bucket_width_ms);
        for q in quotes {
            board.push(q);
        }
        board
    }

    // last value within the bucket wins, by quote time
    pub fn push(&mut self, quote: &MarketQuote) {
        let bucket = quote.time.bucket(self.bucket_width_ms).as_millis();
        let sample = Sample {
            time: quote.time,
            bid: quote.bid,
            ask: quote.ask,
        };
        self.series
            .entry(quote.instrument.clone())
            .or_default()
            .entry(bucket)
            .and_modify(|s| {
                if sample.time >= s.time {
                    *s = sample;
                }
            })
            .or_insert(sample);
    }

    // carry-forward lookup: the bucket's own sample, or the latest one before it
    pub fn latest(&self, instrument: &Instrument, bucket: Timestamp) -> Option<(Price, Price)> {
        let series = self.series.get(instrument)?;
        series
            .range(..=bucket.as_millis())
            .next_back()
            .map(|(_, s)| (s.bid, s.ask))
    }

    // buckets with a fresh (not carried) sample, for building the fold axis
    pub fn buckets(&self, instrument: &Instrument) -> impl Iterator<Item = i64> + '_ {
        self.series
            .get(instrument)
            .into_iter()
            .flat_map(|series| series.keys().copied())
    }

    pub fn bucket_width_ms(&self) -> i64 {
        self.bucket_width_ms
    }

    // 4.3: the conversion rate view for one bucket. passthrough is the
    // identity rate; otherwise the descriptor's rate instrument must have a
    // resolvable (possibly carried-forward) quote.
    pub fn resolve_rate(
        &self,
        descriptor: &ConversionDescriptor,
        bucket: Timestamp,
    ) -> Result<RateView, QuoteError> {
        match descriptor.rate_instrument() {
            None => Ok(RateView::identity()),
            Some(via) => {
                let (bid, ask) =
                    self.latest(via, bucket)
                        .ok_or_else(|| QuoteError::MissingQuote {
                            instrument: via.clone(),
                            bucket,
                        })?;
                Ok(RateView {
                    bid: bid.value(),
                    ask: ask.value(),
                    inverted: descriptor.is_inverted(),
                })
            }
        }
    }

    // 4.4: instrument bid/ask in USD. bid is the price a long closes at, so
    // it converts at the rate's bid; ask converts at the rate's ask.
    pub fn resolve_usd(
        &self,
        instrument: &Instrument,
        descriptor: &ConversionDescriptor,
        bucket: Timestamp,
    ) -> Result<ResolvedQuote, QuoteError> {
        let (bid, ask) = self
            .latest(instrument, bucket)
            .ok_or_else(|| QuoteError::MissingQuote {
                instrument: instrument.clone(),
                bucket,
            })?;
        let rate = self.resolve_rate(descriptor, bucket)?;
        Ok(ResolvedQuote {
            bid_usd: rate.buy_to_usd(bid.value()),
            ask_usd: rate.sell_to_usd(ask.value()),
            rate,
        })
    }
}

// One bucket's conversion rate, with the inversion convention baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateView {
    pub bid: Decimal,
    pub ask: Decimal,
    pub inverted: bool,
}

impl RateView {
    pub fn identity() -> Self {
        Self {
            bid: Decimal::ONE,
            ask: Decimal::ONE,
            inverted: false,
        }
    }

    fn apply(&self, native: Decimal, rate: Decimal) -> Decimal {
        if self.inverted {
            native / rate
        } else {
            native * rate
        }
    }

    // entering/closing a long leg: conversion bid
    pub fn buy_to_usd(&self, native: Decimal) -> Decimal {
        self.apply(native, self.bid)
    }

    // entering/closing a short leg: conversion ask
    pub fn sell_to_usd(&self, native: Decimal) -> Decimal {
        self.apply(native, self.ask)
    }

    // signed values: positive is long-side, negative short-side
    pub fn signed_to_usd(&self, native: Decimal) -> Decimal {
        if native >= Decimal::ZERO {
            self.buy_to_usd(native)
        } else {
            self.sell_to_usd(native)
        }
    }

    // side-neutral figures (volume) use the mid
    pub fn mid_to_usd(&self, native: Decimal) -> Decimal {
        self.apply(native, (self.bid + self.ask) / Decimal::TWO)
    }
}

// Instrument bid/ask expressed in USD, plus the rate that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQuote {
    pub bid_usd: Decimal,
    pub ask_usd: Decimal,
    pub rate: RateView,
}

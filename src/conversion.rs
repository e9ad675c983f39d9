// 3.0: conversion map. static lookup from instrument to its USD conversion
// descriptor. pure, no time dependency. unmapped instruments fall back to
// passthrough (already USD-denominated) with a data-quality warning.

use crate::types::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

// How an instrument's native prices become USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConversionDescriptor {
    // native quote currency is USD already
    Passthrough,
    // usd = native * rate(via)
    Direct { via: Instrument },
    // usd = native / rate(via)
    Inverted { via: Instrument },
    // cross pair split into legs; the quote-currency instrument carries the
    // USD rate (direct). the base leg is reserved for leg decomposition.
    Decomposed { base: Instrument, quote: Instrument },
}

impl ConversionDescriptor {
    // the instrument whose quotes supply the conversion rate, if any
    pub fn rate_instrument(&self) -> Option<&Instrument> {
        match self {
            ConversionDescriptor::Passthrough => None,
            ConversionDescriptor::Direct { via } => Some(via),
            ConversionDescriptor::Inverted { via } => Some(via),
            ConversionDescriptor::Decomposed { quote, .. } => Some(quote),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, ConversionDescriptor::Inverted { .. })
    }
}

// Row shape of the slowly-changing reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRow {
    pub instrument: Instrument,
    #[serde(default)]
    pub usd_instrument: Option<Instrument>,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub base_instrument: Option<Instrument>,
    #[serde(default)]
    pub quote_instrument: Option<Instrument>,
}

impl ConversionRow {
    fn descriptor(&self) -> ConversionDescriptor {
        if let (Some(base), Some(quote)) = (&self.base_instrument, &self.quote_instrument) {
            return ConversionDescriptor::Decomposed {
                base: base.clone(),
                quote: quote.clone(),
            };
        }
        match &self.usd_instrument {
            Some(via) if self.inverted => ConversionDescriptor::Inverted { via: via.clone() },
            Some(via) => ConversionDescriptor::Direct { via: via.clone() },
            None => ConversionDescriptor::Passthrough,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversionMap {
    entries: HashMap<Instrument, ConversionDescriptor>,
}

impl ConversionMap {
    pub fn new() -> Self {
        Self::default()
    }

    // deduplicates on instrument, last row wins (mirrors DISTINCT over the
    // reference table upstream)
    pub fn from_rows(rows: impl IntoIterator<Item = ConversionRow>) -> Self {
        let mut map = Self::new();
        for row in rows {
            let descriptor = row.descriptor();
            map.insert(row.instrument, descriptor);
        }
        map
    }

    pub fn insert(&mut self, instrument: Instrument, descriptor: ConversionDescriptor) {
        self.entries.insert(instrument, descriptor);
    }

    pub fn is_mapped(&self, instrument: &Instrument) -> bool {
        self.entries.contains_key(instrument)
    }

    // 3.1: the lookup. unmapped means already-USD; logged so the data-quality
    // gap is visible, since a genuinely foreign instrument missing its row
    // would silently misstate every USD figure downstream.
    pub fn resolve(&self, instrument: &Instrument) -> ConversionDescriptor {
        match self.entries.get(instrument) {
            Some(d) => d.clone(),
            None => {
                warn!(%instrument, "instrument missing from conversion map, assuming USD passthrough");
                ConversionDescriptor::Passthrough
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}


/// # Sina HK Derivative-Warrant Real-Time Comparison
///
/// Fetch real-time quotes of Hong Kong derivative warrants and their
/// benchmark index from the sina quote feed, join them against static
/// per-warrant reference data (exercise price, lot size, expiry date)
/// and compute the valuation ratios used to rank and compare warrants.
///
/// ## Supported indices
///
/// | Index | Feed symbol |
/// | ---- | ---- |
/// | Hang Seng Index | HSI |
/// | Hang Seng China Enterprises Index | HSCEI |
///

#[cfg(test)]
mod reqwest_mock;

use std::collections::HashMap;
use std::fmt;

#[cfg(not(test))]
use chrono::Local;
use chrono::NaiveDate;

use snafu::Snafu;

pub mod quote;
pub mod reference;
pub mod metrics;
pub mod watchlist;

pub use quote::QuoteRecord;
pub use reference::InstrumentReference;
pub use metrics::{
    EnrichedInstrument,
    Cell,
    Column,
    IndexStatus,
};
pub use watchlist::{
    WatchList,
    PeerTolerance,
};

/// Width of the numeric part of a sina HK request token, e.g. `rt_hk00700`.
pub const CODE_TOKEN_WIDTH: usize = 5;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("Quote feed unavailable: {}", info))]
    FeedUnavailable { info: String },

    #[snafu(display("Malformed quote feed entry: {}", info))]
    FeedFormatError { info: String },

    #[snafu(display("Failed to load reference data: {}", info))]
    ReferenceLoadError { info: String },

    #[snafu(display("Unknown instrument: {}", code))]
    UnknownInstrument { code: InstrumentCode },

    #[snafu(display("Value percent undefined for {}: ask and price are both zero", code))]
    DerivedMetricUndefined { code: InstrumentCode },
}

/// Instrument identifier in the quote feed.
///
/// Warrant codes are numeric and are zero-padded to [CODE_TOKEN_WIDTH]
/// digits in the request token; index symbols stay textual and are
/// embedded in the token unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrumentCode {
    Numeric ( u32 ),
    Symbolic ( Box<str> ),
}

impl InstrumentCode {
    /// Returns the `rt_hk`-prefixed token for the `list=` query parameter.
    ///
    /// Code 700 maps to `rt_hk00700`, 20360 to `rt_hk20360`, `HSI` to `rt_hkHSI`.
    pub fn request_token ( &self ) -> String {
        match self {
            InstrumentCode::Numeric ( code ) =>
                format ! ( "rt_hk{:0width$}", code, width = CODE_TOKEN_WIDTH ),
            InstrumentCode::Symbolic ( symbol ) =>
                format ! ( "rt_hk{}", symbol ),
        }
    }

    /// Returns [InstrumentCode] parsed from the key echoed by the feed.
    ///
    /// Integer conversion is attempted first; a failure is the expected
    /// case for symbolic codes and never an error.
    pub fn from_feed_key ( key: &str ) -> Self {
        match key.parse::<u32> ( ) {
            Ok ( code ) => InstrumentCode::Numeric ( code ),
            Err ( _ ) => InstrumentCode::Symbolic ( key.to_owned ( ).into_boxed_str ( ) ),
        }
    }
}

impl fmt::Display for InstrumentCode {
    fn fmt ( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        match self {
            InstrumentCode::Numeric ( code ) => write ! ( f, "{}", code ),
            InstrumentCode::Symbolic ( symbol ) => write ! ( f, "{}", symbol ),
        }
    }
}

impl From<u32> for InstrumentCode {
    fn from ( code: u32 ) -> Self {
        InstrumentCode::Numeric ( code )
    }
}

impl From<&str> for InstrumentCode {
    fn from ( symbol: &str ) -> Self {
        InstrumentCode::Symbolic ( symbol.to_owned ( ).into_boxed_str ( ) )
    }
}

/// Benchmark index of a warrant watch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketIndex {
    Hsi,
    Hscei,
}

impl MarketIndex {
    /// Feed symbol of the index.
    pub fn symbol ( &self ) -> &'static str {
        match self {
            MarketIndex::Hsi => "HSI",
            MarketIndex::Hscei => "HSCEI",
        }
    }

    /// Conventional reference-file name for the index' warrant universe.
    pub fn reference_file ( &self ) -> &'static str {
        match self {
            MarketIndex::Hsi => "hsi_data.csv",
            MarketIndex::Hscei => "hscei_data.csv",
        }
    }
}

/// Map type returned by the feed parser: one [QuoteRecord] per parsed entry.
pub type QuoteMap = HashMap<InstrumentCode, QuoteRecord>;

/// Map type produced by the reference loader.
pub type ReferenceMap = HashMap<InstrumentCode, InstrumentReference>;

/// Returns the current calendar date in the caller's local zone.
///
/// Days-to-maturity is pure date arithmetic against this value.
#[cfg(not(test))]
pub(crate) fn today ( ) -> NaiveDate {
    Local::now ( ).date_naive ( )
}

#[cfg(test)]
pub(crate) fn today ( ) -> NaiveDate {
    // pinned so maturity figures in tests are reproducible
    NaiveDate::from_ymd_opt ( 2021, 2, 1 ).unwrap ( )
}

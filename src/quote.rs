
/// # Sina real-time quote feed
///
/// One batched GET per call; the response body is GBK-encoded text of
/// `;`-separated entries, one per requested token:
///
/// ```text
/// var hq_str_rt_hk00700="TENCENT,腾讯控股,625.000,...";
/// ```
///
/// The 5 characters before the `="` marker echo the request key; the
/// quoted payload is comma-separated and only its first
/// [FEED_FIELD_COUNT] fields are part of the contract.

use crate::{
    Error,
    InstrumentCode,
    QuoteMap,
};

use log::debug;

#[cfg(not(test))]
use reqwest::blocking::Client;

#[cfg(test)]
use crate::reqwest_mock::Client;

/// Number of leading payload fields retained per entry.
pub const FEED_FIELD_COUNT: usize = 13;

/// Payload positions parsed as decimals; name fields sit before, the
/// remainder of the raw entry is discarded.
const NUMERIC_FIELD_RANGE: std::ops::RangeInclusive<usize> = 2..=12;

const MARKER: &str = "=\"";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";

macro_rules! QUOTE_FEED_URL {
    () => {
        "http://hq.sinajs.cn/list="
    };
}

/// One real-time snapshot of a warrant or an index, in feed order.
///
/// `reserved_1`/`reserved_2` carry provider-specific numerics between
/// `price` and `bid` whose meaning the feed does not document.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub name_eng: Box<str>,
    pub name_chi: Box<str>,
    pub today_open: f64,
    pub last_close: f64,
    pub today_high: f64,
    pub today_low: f64,
    pub price: f64,
    pub reserved_1: f64,
    pub reserved_2: f64,
    pub bid: f64,
    pub ask: f64,
    pub volume: f64,
    pub amount: f64,
}

/// Returns the batched feed URL for the given codes.
pub fn gen_url ( codes: &[InstrumentCode] ) -> String {
    format ! (
        "{base}{tokens}",
        base = QUOTE_FEED_URL ! ( ),
        tokens = codes.iter ( )
            .map ( InstrumentCode::request_token )
            .collect::<Vec<String>> ( )
            .join ( "," ),
    )
}

/// Fetches one batched request of real-time quotes.
///
/// Returns exactly one [QuoteRecord] per successfully parsed entry,
/// keyed by the code echoed in the entry. Transport failure or a
/// non-success status is [Error::FeedUnavailable]; a malformed entry is
/// [Error::FeedFormatError] and aborts the whole call.
pub fn fetch_quotes ( codes: &[InstrumentCode] ) -> Result<QuoteMap, Error> {
    let url = gen_url ( codes );
    debug ! ( "fetch_quotes: GET {}", url );

    let response = Client::new ( )
        .get ( url.as_str ( ) )
        .header ( "User-Agent", USER_AGENT )
        .send ( )
        .map_err ( |e| Error::FeedUnavailable { info: e.to_string ( ) } )?;

    let status = response.status ( );
    if ! status.is_success ( ) {
        return Err ( Error::FeedUnavailable {
            info: format ! ( "quote feed returned HTTP {}", status ),
        } );
    }

    // sina serves GBK regardless of the charset the client asks for
    let body = response
        .text_with_charset ( "GBK" )
        .map_err ( |e| Error::FeedUnavailable { info: e.to_string ( ) } )?;

    parse_feed ( body.as_str ( ) )
}

/// Parses a raw feed body into one record per entry.
pub fn parse_feed ( body: &str ) -> Result<QuoteMap, Error> {
    let mut quotes = QuoteMap::new ( );

    for entry in body.trim ( ).split ( ';' ) {
        if entry.trim ( ).is_empty ( ) {
            continue;
        }

        let ( code, record ) = parse_entry ( entry )?;
        debug ! ( "parse_feed: entry for {}", code );
        quotes.insert ( code, record );
    }

    Ok ( quotes )
}

/// Parses a single `key="payload"` entry.
fn parse_entry ( entry: &str ) -> Result<( InstrumentCode, QuoteRecord ), Error> {
    let marker = entry.find ( MARKER )
        .ok_or_else ( || Error::FeedFormatError {
            info: format ! ( "entry lacks the {:?} marker: {:.40}", MARKER, entry.trim ( ) ),
        } )?;

    let key = marker.checked_sub ( 5 )
        .and_then ( |start| entry.get ( start..marker ) )
        .ok_or_else ( || Error::FeedFormatError {
            info: format ! ( "request key shorter than 5 chars: {:.40}", entry.trim ( ) ),
        } )?;
    let code = InstrumentCode::from_feed_key ( key );

    let payload = entry [ marker + MARKER.len ( ).. ]
        .trim_end ( )
        .trim_end_matches ( '"' );
    let fields: Vec<&str> = payload.split ( ',' ).collect ( );

    if fields.len ( ) < FEED_FIELD_COUNT {
        return Err ( Error::FeedFormatError {
            info: format ! ( "entry for {} has {} fields, expected {}",
                code, fields.len ( ), FEED_FIELD_COUNT ),
        } );
    }

    let mut numeric = [ 0f64; FEED_FIELD_COUNT ];
    for idx in NUMERIC_FIELD_RANGE {
        numeric [ idx ] = fields [ idx ].parse::<f64> ( )
            .map_err ( |_| Error::FeedFormatError {
                info: format ! ( "entry for {} has non-numeric field {}: {:?}",
                    code, idx, fields [ idx ] ),
            } )?;
    }

    let record = QuoteRecord {
        name_eng: fields [ 0 ].to_owned ( ).into_boxed_str ( ),
        name_chi: fields [ 1 ].to_owned ( ).into_boxed_str ( ),
        today_open: numeric [ 2 ],
        last_close: numeric [ 3 ],
        today_high: numeric [ 4 ],
        today_low: numeric [ 5 ],
        price: numeric [ 6 ],
        reserved_1: numeric [ 7 ],
        reserved_2: numeric [ 8 ],
        bid: numeric [ 9 ],
        ask: numeric [ 10 ],
        volume: numeric [ 11 ],
        amount: numeric [ 12 ],
    };

    Ok ( ( code, record ) )
}

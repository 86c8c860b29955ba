
/// # Static per-warrant reference data
///
/// Canonical file schema (the only supported layout; older files with
/// split year/month/day columns or reordered columns are deprecated):
///
/// ```text
/// code,ex_price,lot_size,ex_date
/// 20360,"27,500.00",5000,2021-02-22
/// ```
///
/// `ex_price` is normalised to an integer index-point unit: thousands
/// separators and an all-zero decimal part are stripped, anything else
/// is rejected. `ex_date` is strictly `%Y-%m-%d`; this format carries a
/// 4-digit year and cannot be confused with a day-first layout.

use crate::{
    Error,
    InstrumentCode,
    ReferenceMap,
};

use std::path::Path;

use chrono::NaiveDate;

use log::debug;

use serde::Deserialize;

use regex::{
    Regex,
    RegexBuilder,
};

use lazy_static::lazy_static;

lazy_static ! {
    static ref RE_EX_PRICE : Regex = RegexBuilder::new ( r#"^\s*(\d[\d,]*?)(?:\.(0+))?\s*$"# )
        .build ( )
        .expect ( "Failed to create Regex pattern of the exercise price cell." );
}

const EX_DATE_FORMAT: &str = "%Y-%m-%d";

const EXPECTED_HEADER: [&str; 4] = [ "code", "ex_price", "lot_size", "ex_date" ];

/// Static attributes of one warrant, immutable for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReference {
    pub code: InstrumentCode,
    /// Exercise price in whole index points.
    pub ex_price: i64,
    /// Entitlement ratio of the warrant; always positive.
    pub lot_size: u32,
    pub ex_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    code: String,
    ex_price: String,
    lot_size: i64,
    ex_date: String,
}

/// Loads the reference table from a CSV file, keyed by instrument code.
///
/// Any malformed row, and any file not matching the canonical header,
/// fails the whole load with [Error::ReferenceLoadError].
pub fn load_references<P: AsRef<Path>> ( path: P ) -> Result<ReferenceMap, Error> {
    let path = path.as_ref ( );
    debug ! ( "load_references: {}", path.display ( ) );

    let mut reader = csv::ReaderBuilder::new ( )
        .has_headers ( true )
        .from_path ( path )
        .map_err ( |e| Error::ReferenceLoadError { info: e.to_string ( ) } )?;

    let header: Vec<&str> = reader.headers ( )
        .map_err ( |e| Error::ReferenceLoadError { info: e.to_string ( ) } )?
        .iter ( )
        .collect ( );
    if header != EXPECTED_HEADER {
        return Err ( Error::ReferenceLoadError {
            info: format ! ( "unsupported schema {:?}, expected {:?}", header, EXPECTED_HEADER ),
        } );
    }

    let mut references = ReferenceMap::new ( );

    for row in reader.deserialize::<RawReference> ( ) {
        let raw = row.map_err ( |e| Error::ReferenceLoadError { info: e.to_string ( ) } )?;

        let code = InstrumentCode::from_feed_key ( raw.code.trim ( ) );

        let ex_price = normalize_ex_price ( raw.ex_price.as_str ( ) )
            .ok_or_else ( || Error::ReferenceLoadError {
                info: format ! ( "invalid exercise price for {}: {:?}", code, raw.ex_price ),
            } )?;

        if raw.lot_size <= 0 {
            return Err ( Error::ReferenceLoadError {
                info: format ! ( "non-positive lot size for {}: {}", code, raw.lot_size ),
            } );
        }

        let ex_date = NaiveDate::parse_from_str ( raw.ex_date.trim ( ), EX_DATE_FORMAT )
            .map_err ( |_| Error::ReferenceLoadError {
                info: format ! ( "invalid expiry date for {}: {:?}, expected {}",
                    code, raw.ex_date, EX_DATE_FORMAT ),
            } )?;

        references.insert ( code.clone ( ), InstrumentReference {
            code,
            ex_price,
            lot_size: raw.lot_size as u32,
            ex_date,
        } );
    }

    Ok ( references )
}

/// Returns the integer exercise price, or None when the cell is not a
/// plain or comma-grouped integer with at most an all-zero decimal part.
fn normalize_ex_price ( cell: &str ) -> Option<i64> {
    RE_EX_PRICE.captures ( cell )
        .and_then ( |captures| captures.get ( 1 ) )
        .and_then ( |digits| digits.as_str ( ).replace ( ',', "" ).parse::<i64> ( ).ok ( ) )
}

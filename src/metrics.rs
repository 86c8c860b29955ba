
/// # Derived valuation metrics
///
/// Joins one refresh cycle's quotes with the reference table and the
/// index level fetched in the same cycle, and derives the breakeven,
/// intrinsic-value and maturity figures used for ranking.

use crate::{
    Error,
    InstrumentCode,
    QuoteMap,
    QuoteRecord,
    ReferenceMap,
};

use std::fmt;

use chrono::NaiveDate;

use log::debug;

/// Column order of the standard output projection.
pub const DEFAULT_COLUMNS: [Column; 7] = [
    Column::Code,
    Column::Bid,
    Column::Ask,
    Column::ExPrice,
    Column::BeRelAsk,
    Column::ValuePercent,
    Column::DaysToMaturity,
];

/// One warrant joined with its reference data and derived figures.
///
/// Breakeven levels are index points; `be_abs_*` is the absolute level
/// at which the warrant pays back its own cost, `be_rel_*` the same
/// level relative to where the index stood during the refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedInstrument {
    pub code: InstrumentCode,
    pub quote: QuoteRecord,
    pub ex_price: i64,
    pub lot_size: u32,
    pub ex_date: NaiveDate,
    pub be_abs_ask: f64,
    pub be_rel_ask: f64,
    pub be_abs_bid: f64,
    pub be_rel_bid: f64,
    /// Intrinsic value per warrant unit, floored at zero.
    pub value: f64,
    /// Intrinsic value over ask (over last price when no ask), as a
    /// rendered percentage, e.g. `20.0%`.
    pub value_percent: Box<str>,
    /// Calendar days until expiry; negative once expired, never clamped.
    pub days_to_maturity: i64,
}

/// Inner-joins quotes and references and derives all figures.
///
/// Rows are produced in `codes` order, which anchors the stable sort;
/// codes missing from either side are silently dropped.
pub fn build_table (
    codes: &[InstrumentCode],
    quotes: &QuoteMap,
    references: &ReferenceMap,
    index_level: f64,
) -> Result<Vec<EnrichedInstrument>, Error> {
    let today = crate::today ( );
    let mut table = Vec::with_capacity ( codes.len ( ) );

    for code in codes {
        let quote = match quotes.get ( code ) {
            Some ( quote ) => quote,
            None => {
                debug ! ( "build_table: no quote for {}, dropped", code );
                continue;
            },
        };
        let reference = match references.get ( code ) {
            Some ( reference ) => reference,
            None => {
                debug ! ( "build_table: no reference for {}, dropped", code );
                continue;
            },
        };

        let ex_price = reference.ex_price as f64;
        let lot_size = reference.lot_size as f64;

        let be_abs_ask = ex_price - quote.ask * lot_size;
        let be_abs_bid = ex_price - quote.bid * lot_size;

        let value = 0f64.max ( round_to ( ( ex_price - index_level ) / lot_size, 3 ) );

        let denominator = if quote.ask != 0.0 { quote.ask } else { quote.price };
        if denominator == 0.0 {
            return Err ( Error::DerivedMetricUndefined { code: code.clone ( ) } );
        }
        let value_percent = format_percent ( value / denominator * 100.0 );

        table.push ( EnrichedInstrument {
            code: code.clone ( ),
            quote: quote.clone ( ),
            ex_price: reference.ex_price,
            lot_size: reference.lot_size,
            ex_date: reference.ex_date,
            be_abs_ask,
            be_rel_ask: be_abs_ask - index_level,
            be_abs_bid,
            be_rel_bid: be_abs_bid - index_level,
            value,
            value_percent,
            days_to_maturity: reference.ex_date.signed_duration_since ( today ).num_days ( ),
        } );
    }

    Ok ( table )
}

/// Standard sort applied to every output: days to maturity ascending,
/// then exercise price, breakeven-rel-ask and breakeven-rel-bid, each
/// descending. Stable; ties beyond all four keys keep join order.
pub fn std_sort ( mut table: Vec<EnrichedInstrument> ) -> Vec<EnrichedInstrument> {
    table.sort_by ( |a, b| {
        a.days_to_maturity.cmp ( &b.days_to_maturity )
            .then_with ( || b.ex_price.cmp ( &a.ex_price ) )
            .then_with ( || b.be_rel_ask.total_cmp ( &a.be_rel_ask ) )
            .then_with ( || b.be_rel_bid.total_cmp ( &a.be_rel_bid ) )
    } );
    table
}

/// Column selector for [std_output].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Code,
    Bid,
    Ask,
    Price,
    ExPrice,
    LotSize,
    /// Rendered as an integer, truncated toward zero.
    BeRelAsk,
    BeRelBid,
    Value,
    ValuePercent,
    DaysToMaturity,
}

/// One projected output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Code ( InstrumentCode ),
    Int ( i64 ),
    Num ( f64 ),
    Text ( Box<str> ),
}

impl fmt::Display for Cell {
    fn fmt ( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        match self {
            Cell::Code ( code ) => write ! ( f, "{}", code ),
            Cell::Int ( value ) => write ! ( f, "{}", value ),
            Cell::Num ( value ) => write ! ( f, "{}", value ),
            Cell::Text ( text ) => write ! ( f, "{}", text ),
        }
    }
}

/// Projects rows down to ordered value tuples, one [Cell] per column.
///
/// This is the external presentation contract; [DEFAULT_COLUMNS] is the
/// conventional selection.
pub fn std_output ( table: &[EnrichedInstrument], columns: &[Column] ) -> Vec<Vec<Cell>> {
    table.iter ( )
        .map ( |row| {
            columns.iter ( )
                .map ( |column| match column {
                    Column::Code => Cell::Code ( row.code.clone ( ) ),
                    Column::Bid => Cell::Num ( row.quote.bid ),
                    Column::Ask => Cell::Num ( row.quote.ask ),
                    Column::Price => Cell::Num ( row.quote.price ),
                    Column::ExPrice => Cell::Int ( row.ex_price ),
                    Column::LotSize => Cell::Int ( row.lot_size as i64 ),
                    Column::BeRelAsk => Cell::Int ( row.be_rel_ask as i64 ),
                    Column::BeRelBid => Cell::Num ( row.be_rel_bid ),
                    Column::Value => Cell::Num ( row.value ),
                    Column::ValuePercent => Cell::Text ( row.value_percent.clone ( ) ),
                    Column::DaysToMaturity => Cell::Int ( row.days_to_maturity ),
                } )
                .collect ( )
        } )
        .collect ( )
}

/// Index low/high band over a trailing window, supplied by the
/// market-status page collaborator, presented against the live level.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStatus {
    pub level: f64,
    pub low: i64,
    pub high: i64,
}

impl IndexStatus {
    /// Position of the live level in the band: 0 at `low`, 1 at `high`.
    /// Not clamped; a degenerate band reports 0.
    pub fn range_position ( &self ) -> f64 {
        let span = ( self.high - self.low ) as f64;
        if span == 0.0 {
            0.0
        } else {
            ( self.level - self.low as f64 ) / span
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt ( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write ! ( f, "level {:.2} within [{}, {}]: {:.1}%",
            self.level, self.low, self.high, self.range_position ( ) * 100.0 )
    }
}

fn round_to ( value: f64, digits: u32 ) -> f64 {
    let scale = 10f64.powi ( digits as i32 );
    ( value * scale ).round ( ) / scale
}

/// Renders a percentage rounded to 2 decimals with at least one decimal
/// shown and no trailing zeros, matching the historical output (`20.0%`,
/// `33.33%`).
fn format_percent ( percent: f64 ) -> Box<str> {
    let rounded = round_to ( percent, 2 );
    let mut out = format ! ( "{}", rounded );
    if ! out.contains ( '.' ) {
        out.push_str ( ".0" );
    }
    out.push ( '%' );
    out.into_boxed_str ( )
}

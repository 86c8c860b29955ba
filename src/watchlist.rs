
/// # Warrant watch list
///
/// Owns the enriched table of one refresh cycle and answers sort,
/// peer-match and projection queries over it. Queries hand out clones,
/// never the live table, so a later refresh cannot mutate under a
/// caller. Not safe for concurrent refresh-while-query use; serialize
/// externally if that is needed.

use crate::{
    Error,
    InstrumentCode,
    MarketIndex,
    QuoteRecord,
    ReferenceMap,
    metrics::{
        self,
        Cell,
        EnrichedInstrument,
        IndexStatus,
        DEFAULT_COLUMNS,
    },
    quote,
    reference,
};

use log::debug;

/// Inclusive absolute-difference thresholds for [WatchList::peer_comp_similar].
///
/// A zero tolerance means exact match on that dimension; the default is
/// zero on both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerTolerance {
    pub ex_price: i64,
    pub days_to_maturity: i64,
}

pub struct WatchList {
    code_list: Vec<InstrumentCode>,
    index: MarketIndex,
    details: ReferenceMap,
    rt_index: QuoteRecord,
    rt_codes: Vec<EnrichedInstrument>,
}

impl WatchList {
    /// Builds a watch list with the conventional reference file of the
    /// index (e.g. `hsi_data.csv`), then performs the initial refresh.
    pub fn new ( code_list: Vec<InstrumentCode>, index: MarketIndex ) -> Result<Self, Error> {
        Self::with_reference_file ( code_list, index, index.reference_file ( ) )
    }

    /// Builds a watch list from an explicit reference file path.
    pub fn with_reference_file<P: AsRef<std::path::Path>> (
        code_list: Vec<InstrumentCode>,
        index: MarketIndex,
        reference_path: P,
    ) -> Result<Self, Error> {
        let details = reference::load_references ( reference_path )?;
        let ( rt_index, rt_codes ) = build_snapshot ( &code_list, index, &details )?;

        Ok ( WatchList {
            code_list,
            index,
            details,
            rt_index,
            rt_codes,
        } )
    }

    /// Re-fetches the index and the instrument quotes and rebuilds the
    /// table, returning the standard-sorted rows.
    ///
    /// Any error leaves the previously built table untouched; there is
    /// no partial apply.
    pub fn refresh ( &mut self ) -> Result<Vec<EnrichedInstrument>, Error> {
        let ( rt_index, rt_codes ) = build_snapshot ( &self.code_list, self.index, &self.details )?;

        self.rt_index = rt_index;
        self.rt_codes = rt_codes;

        Ok ( self.rt_codes.clone ( ) )
    }

    /// [WatchList::refresh] followed by the default output projection.
    pub fn refresh_std ( &mut self ) -> Result<Vec<Vec<Cell>>, Error> {
        self.refresh ( )?;
        Ok ( metrics::std_output ( &self.rt_codes, &DEFAULT_COLUMNS ) )
    }

    /// Index level the current table was built against.
    pub fn index_level ( &self ) -> f64 {
        self.rt_index.price
    }

    /// Snapshot of the benchmark index from the current cycle.
    pub fn index_snapshot ( &self ) -> &QuoteRecord {
        &self.rt_index
    }

    /// Current standard-sorted table.
    pub fn table ( &self ) -> &[EnrichedInstrument] {
        &self.rt_codes
    }

    /// Presents the live index level against a trailing low/high band
    /// obtained from the market-status page.
    pub fn index_status ( &self, low: i64, high: i64 ) -> IndexStatus {
        IndexStatus {
            level: self.index_level ( ),
            low,
            high,
        }
    }

    /// Returns the peers sharing the target's exact exercise price and
    /// days to maturity, standard-sorted. The target itself qualifies.
    pub fn peer_comp_same ( &self, target_code: &InstrumentCode ) -> Result<Vec<EnrichedInstrument>, Error> {
        self.peer_comp_similar ( target_code, PeerTolerance::default ( ) )
    }

    /// Returns the peers within the given inclusive thresholds on
    /// exercise price and days to maturity, standard-sorted.
    pub fn peer_comp_similar (
        &self,
        target_code: &InstrumentCode,
        tolerance: PeerTolerance,
    ) -> Result<Vec<EnrichedInstrument>, Error> {
        let target = self.rt_codes.iter ( )
            .find ( |row| &row.code == target_code )
            .ok_or_else ( || Error::UnknownInstrument { code: target_code.clone ( ) } )?;

        debug ! ( "peer_comp_similar: target {} ex_price={} days={} tolerance={:?}",
            target_code, target.ex_price, target.days_to_maturity, tolerance );

        let peers = self.rt_codes.iter ( )
            .filter ( |row| {
                ( row.ex_price - target.ex_price ).abs ( ) <= tolerance.ex_price
                    && ( row.days_to_maturity - target.days_to_maturity ).abs ( ) <= tolerance.days_to_maturity
            } )
            .cloned ( )
            .collect ( );

        Ok ( metrics::std_sort ( peers ) )
    }
}

/// Fetches and builds one full cycle: the index snapshot is fetched and
/// applied before any instrument quote so derived metrics never see a
/// stale level.
fn build_snapshot (
    code_list: &[InstrumentCode],
    index: MarketIndex,
    details: &ReferenceMap,
) -> Result<( QuoteRecord, Vec<EnrichedInstrument> ), Error> {
    let rt_index = fetch_index_snapshot ( index )?;
    debug ! ( "build_snapshot: {} at {}", index.symbol ( ), rt_index.price );

    let quotes = quote::fetch_quotes ( code_list )?;
    let table = metrics::build_table ( code_list, &quotes, details, rt_index.price )?;

    Ok ( ( rt_index, metrics::std_sort ( table ) ) )
}

/// Fetches the single-entry batch for the benchmark index.
fn fetch_index_snapshot ( index: MarketIndex ) -> Result<QuoteRecord, Error> {
    let quotes = quote::fetch_quotes ( &[ InstrumentCode::from ( index.symbol ( ) ) ] )?;

    // the echoed key of a symbolic token is contaminated by the prefix
    // (e.g. `hkHSI`), so take the sole entry rather than look it up
    quotes.into_iter ( )
        .map ( |( _, record )| record )
        .next ( )
        .ok_or_else ( || Error::FeedFormatError {
            info: format ! ( "index feed for {} returned no entry", index.symbol ( ) ),
        } )
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::tests::{
        feed_entry,
        hsi_payload,
        setup,
    };
    use crate::quote::gen_url;
    use crate::reqwest_mock::HTML_MAP;

    const REFERENCE_FILE: &str = "tests/data/hsi_data.csv";

    fn warrant_payload ( name: &str, price: f64, bid: f64, ask: f64 ) -> String {
        format ! (
            "{name},认购证,{price},{price},{price},{price},{price},0.000,0.000,{bid},{ask},1000000,495000",
            name = name, price = price, bid = bid, ask = ask,
        )
    }

    fn code_list ( ) -> Vec<InstrumentCode> {
        vec ! [
            InstrumentCode::Numeric ( 20360 ),
            InstrumentCode::Numeric ( 21000 ),
            InstrumentCode::Numeric ( 23106 ),
            InstrumentCode::Numeric ( 1699 ),
            InstrumentCode::Numeric ( 9999 ),
        ]
    }

    fn instruments_body ( ) -> String {
        format ! (
            "{}{}{}{}{}",
            feed_entry ( "rt_hk20360", warrant_payload ( "WARRANT A", 0.495, 0.49, 0.50 ).as_str ( ) ),
            feed_entry ( "rt_hk21000", warrant_payload ( "WARRANT B", 0.495, 0.48, 0.50 ).as_str ( ) ),
            feed_entry ( "rt_hk23106", warrant_payload ( "WARRANT C", 0.555, 0.55, 0.56 ).as_str ( ) ),
            feed_entry ( "rt_hk01699", warrant_payload ( "WARRANT D", 0.305, 0.30, 0.31 ).as_str ( ) ),
            feed_entry ( "rt_hk09999", warrant_payload ( "WARRANT E", 0.015, 0.01, 0.02 ).as_str ( ) ),
        )
    }

    fn map_feed ( ) {
        let index_url = gen_url ( &[ InstrumentCode::from ( "HSI" ) ] );
        let list_url = gen_url ( &code_list ( ) );
        HTML_MAP.with ( |html_map| {
            let mut map = html_map.borrow_mut ( );
            map.insert ( index_url.into_boxed_str ( ), feed_entry ( "rt_hkHSI", hsi_payload ( ) ) );
            map.insert ( list_url.into_boxed_str ( ), instruments_body ( ) );
        } );
    }

    fn unmap_instruments ( ) {
        let list_url = gen_url ( &code_list ( ) );
        HTML_MAP.with ( |html_map| {
            html_map.borrow_mut ( ).remove ( list_url.as_str ( ) );
        } );
    }

    fn watch_list ( ) -> WatchList {
        setup ( );
        map_feed ( );
        WatchList::with_reference_file ( code_list ( ), MarketIndex::Hsi, REFERENCE_FILE ).unwrap ( )
    }

    fn codes_of ( rows: &[EnrichedInstrument] ) -> Vec<u32> {
        rows.iter ( )
            .map ( |row| match row.code {
                InstrumentCode::Numeric ( code ) => code,
                _ => panic ! ( "unexpected symbolic code in table" ),
            } )
            .collect ( )
    }

    #[test]
    fn givenFullFeed_whenNew_thenTableStdSorted ( ) {
        let list = watch_list ( );

        assert_eq ! ( list.index_level ( ), 27000.0 );
        // maturity ascending, then strike descending, then bid tiebreak
        // between the two 27500-strike twins (21000 holds the better bid)
        assert_eq ! ( codes_of ( list.table ( ) ), vec ! [ 9999, 21000, 20360, 23106, 1699 ] );
    }

    #[test]
    fn givenExpiredRow_whenNew_thenNegativeMaturityKept ( ) {
        let list = watch_list ( );
        let expired = list.table ( ).iter ( )
            .find ( |row| row.code == InstrumentCode::Numeric ( 9999 ) )
            .unwrap ( );
        assert_eq ! ( expired.days_to_maturity, -17 );
    }

    #[test]
    fn givenRefresh_whenFeedUnchanged_thenSameTableReturned ( ) {
        let mut list = watch_list ( );
        let before = list.table ( ).to_vec ( );

        let after = list.refresh ( ).unwrap ( );

        assert_eq ! ( after, before );
    }

    #[test]
    fn givenInstrumentFetchFails_whenRefresh_thenPreviousTableRetained ( ) {
        let mut list = watch_list ( );
        let before = list.table ( ).to_vec ( );
        let level_before = list.index_level ( );

        // index URL still answers; the instrument batch does not
        unmap_instruments ( );

        let result = list.refresh ( );
        match result {
            Err ( Error::FeedUnavailable { .. } ) => ( ),
            other => panic ! ( "expected FeedUnavailable, got {:?}", other ),
        }

        assert_eq ! ( list.table ( ), before.as_slice ( ) );
        assert_eq ! ( list.index_level ( ), level_before );
    }

    #[test]
    fn givenRefreshStd_whenDefaultProjection_thenSevenCellRows ( ) {
        let mut list = watch_list ( );

        let output = list.refresh_std ( ).unwrap ( );

        assert_eq ! ( output.len ( ), 5 );
        for row in &output {
            assert_eq ! ( row.len ( ), DEFAULT_COLUMNS.len ( ) );
        }
        assert_eq ! ( output [ 0 ] [ 0 ], Cell::Code ( InstrumentCode::Numeric ( 9999 ) ) );
        // 20360: be_rel_ask = 27500 - 0.5*5000 - 27000, truncated
        assert_eq ! ( output [ 2 ] [ 4 ], Cell::Int ( -2000 ) );
        assert_eq ! ( output [ 2 ] [ 6 ], Cell::Int ( 21 ) );
    }

    #[test]
    fn givenTarget_whenPeerCompSame_thenExactStrikeAndMaturityPeers ( ) {
        let list = watch_list ( );

        let peers = list.peer_comp_same ( &InstrumentCode::Numeric ( 20360 ) ).unwrap ( );

        assert_eq ! ( codes_of ( &peers ), vec ! [ 21000, 20360 ] );
    }

    #[test]
    fn givenZeroTolerances_whenPeerCompSimilar_thenSameResultAsExactMatch ( ) {
        let list = watch_list ( );
        let target = InstrumentCode::Numeric ( 20360 );

        let exact = list.peer_comp_same ( &target ).unwrap ( );
        let similar = list.peer_comp_similar ( &target, PeerTolerance::default ( ) ).unwrap ( );

        assert_eq ! ( similar, exact );
    }

    #[test]
    fn givenStrikeTolerance_whenPeerCompSimilar_thenNearbyStrikesIncluded ( ) {
        let list = watch_list ( );

        let peers = list.peer_comp_similar (
            &InstrumentCode::Numeric ( 20360 ),
            PeerTolerance { ex_price: 700, days_to_maturity: 0 },
        ).unwrap ( );

        // 23106 sits 700 points below the target strike, same maturity
        assert_eq ! ( codes_of ( &peers ), vec ! [ 21000, 20360, 23106 ] );
    }

    #[test]
    fn givenMaturityTolerance_whenPeerCompSimilar_thenNearbyMaturitiesIncluded ( ) {
        let list = watch_list ( );

        let peers = list.peer_comp_similar (
            &InstrumentCode::Numeric ( 20360 ),
            PeerTolerance { ex_price: 0, days_to_maturity: 40 },
        ).unwrap ( );

        // 1699 expires 36 days after the target at the same strike
        assert_eq ! ( codes_of ( &peers ), vec ! [ 21000, 20360, 1699 ] );
    }

    #[test]
    fn givenUnknownTarget_whenPeerCompSame_thenUnknownInstrumentAndTableUnmodified ( ) {
        let list = watch_list ( );
        let before = list.table ( ).to_vec ( );

        let result = list.peer_comp_same ( &InstrumentCode::Numeric ( 123 ) );

        assert_eq ! (
            result,
            Err ( Error::UnknownInstrument { code: InstrumentCode::Numeric ( 123 ) } )
        );
        assert_eq ! ( list.table ( ), before.as_slice ( ) );
    }

    #[test]
    fn givenLiveLevel_whenIndexStatus_thenBandPresentation ( ) {
        let list = watch_list ( );

        let status = list.index_status ( 26800, 28600 );

        assert_eq ! ( status.level, 27000.0 );
        assert_eq ! ( status.low, 26800 );
        assert_eq ! ( status.high, 28600 );
        assert ! ( ( status.range_position ( ) - 200.0 / 1800.0 ).abs ( ) < 1e-12 );
    }
}

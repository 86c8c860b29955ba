use sina_hk_dw::{
    InstrumentCode,
    MarketIndex,
    WatchList,
};

pub fn main ( ) {
    env_logger::init ( );

    let mut codes: Vec<InstrumentCode> = std::env::args ( )
        .skip ( 1 )
        .map ( |arg| match arg.parse::<u32> ( ) {
            Ok ( code ) => InstrumentCode::Numeric ( code ),
            Err ( _ ) => InstrumentCode::from ( arg.as_str ( ) ),
        } )
        .collect ( );

    if codes.is_empty ( ) {
        codes = vec ! [
            InstrumentCode::Numeric ( 20360 ),
            InstrumentCode::Numeric ( 23106 ),
            InstrumentCode::Numeric ( 1699 ),
        ];
    }

    let mut list = WatchList::new ( codes, MarketIndex::Hsi )
        .expect ( "Failed to build the watch list" );

    println ! ( "{} at {}", MarketIndex::Hsi.symbol ( ), list.index_level ( ) );

    for row in list.refresh_std ( ).expect ( "Failed to refresh" ) {
        let cells: Vec<String> = row.iter ( ).map ( |cell| format ! ( "{}", cell ) ).collect ( );
        println ! ( "{}", cells.join ( "\t" ) );
    }
}

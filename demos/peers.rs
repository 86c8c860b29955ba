use sina_hk_dw::{
    InstrumentCode,
    MarketIndex,
    PeerTolerance,
    WatchList,
};

use std::io::stdin;

pub fn main ( ) {
    env_logger::init ( );

    let codes = vec ! [
        InstrumentCode::Numeric ( 20360 ),
        InstrumentCode::Numeric ( 23106 ),
        InstrumentCode::Numeric ( 1699 ),
    ];

    let list = WatchList::new ( codes, MarketIndex::Hsi )
        .expect ( "Failed to build the watch list" );

    let mut input = String::new ( );
    print ! ( "Type in warrant code: " );
    stdin ( ).read_line ( &mut input ).unwrap ( );

    let target = InstrumentCode::Numeric ( input.trim ( ).parse::<u32> ( ).unwrap ( ) );

    let peers = list.peer_comp_similar (
        &target,
        PeerTolerance { ex_price: 500, days_to_maturity: 14 },
    ).expect ( "Failed to query peers" );

    for row in peers {
        println ! ( "{}\t{}\t{}\t{}\t{}", row.code, row.quote.bid, row.quote.ask, row.ex_price, row.days_to_maturity );
    }
}

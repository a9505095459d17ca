//! Venue identifier lookup tables.
//!
//! Three parallel tables bind a [`Venue`] to its snapshot client, socket manager and adapter.
//! All three agree on the venue key; consumers resolve the triple and compose a pipeline.

use crate::{
    adapter::VenueAdapter,
    exchange::{
        MarketClient, SocketManager, binance::Binance, bingx::Bingx, bitget::Bitget,
        bitunix::Bitunix, bybit::Bybit, gate::Gate, hyperliquid::Hyperliquid, kcex::Kcex,
        mexc::Mexc, okx::Okx, xt::Xt,
    },
    session::VenueBinding,
};
use marketwire_instrument::Venue;
use marketwire_integration::protocol::http::RestClient;

use crate::exchange::{
    binance::BinanceClient, bingx::BingxClient, bitget::BitgetClient, bitunix::BitunixClient,
    bybit::BybitClient, gate::GateClient, hyperliquid::HyperliquidClient, kcex::KcexClient,
    mexc::MexcClient, okx::OkxClient, xt::XtClient,
};

/// Resolve the [`VenueBinding`] for a venue, `None` for auxiliary services.
pub fn binding(venue: Venue) -> Option<&'static dyn VenueBinding> {
    Some(match venue {
        Venue::Binance => &Binance,
        Venue::Bybit => &Bybit,
        Venue::Okx => &Okx,
        Venue::Bitget => &Bitget,
        Venue::Mexc => &Mexc,
        Venue::Gate => &Gate,
        Venue::Xt => &Xt,
        Venue::Bitunix => &Bitunix,
        Venue::Kcex => &Kcex,
        Venue::Bingx => &Bingx,
        Venue::Hyperliquid => &Hyperliquid,
        Venue::Coinmarketcap | Venue::Coinalyze | Venue::Deribit => return None,
    })
}

/// Resolve the [`VenueAdapter`] for a venue, `None` for auxiliary services.
pub fn adapter(venue: Venue) -> Option<&'static dyn VenueAdapter> {
    Some(match venue {
        Venue::Binance => &Binance,
        Venue::Bybit => &Bybit,
        Venue::Okx => &Okx,
        Venue::Bitget => &Bitget,
        Venue::Mexc => &Mexc,
        Venue::Gate => &Gate,
        Venue::Xt => &Xt,
        Venue::Bitunix => &Bitunix,
        Venue::Kcex => &Kcex,
        Venue::Bingx => &Bingx,
        Venue::Hyperliquid => &Hyperliquid,
        Venue::Coinmarketcap | Venue::Coinalyze | Venue::Deribit => return None,
    })
}

/// Resolve the [`SocketManager`] for a venue, `None` for auxiliary services.
pub fn socket_manager(venue: Venue) -> Option<&'static dyn SocketManager> {
    Some(match venue {
        Venue::Binance => &Binance,
        Venue::Bybit => &Bybit,
        Venue::Okx => &Okx,
        Venue::Bitget => &Bitget,
        Venue::Mexc => &Mexc,
        Venue::Gate => &Gate,
        Venue::Xt => &Xt,
        Venue::Bitunix => &Bitunix,
        Venue::Kcex => &Kcex,
        Venue::Bingx => &Bingx,
        Venue::Hyperliquid => &Hyperliquid,
        Venue::Coinmarketcap | Venue::Coinalyze | Venue::Deribit => return None,
    })
}

/// Construct the snapshot client for a venue over the provided [`RestClient`] pool, `None`
/// for auxiliary services (those carry their own credentialed constructors in
/// [`services`](crate::services)).
pub fn client(venue: Venue, rest: RestClient) -> Option<Box<dyn MarketClient>> {
    Some(match venue {
        Venue::Binance => Box::new(BinanceClient::new(rest)),
        Venue::Bybit => Box::new(BybitClient::new(rest)),
        Venue::Okx => Box::new(OkxClient::new(rest)),
        Venue::Bitget => Box::new(BitgetClient::new(rest)),
        Venue::Mexc => Box::new(MexcClient::new(rest)),
        Venue::Gate => Box::new(GateClient::new(rest)),
        Venue::Xt => Box::new(XtClient::new(rest)),
        Venue::Bitunix => Box::new(BitunixClient::new(rest)),
        Venue::Kcex => Box::new(KcexClient::new(rest)),
        Venue::Bingx => Box::new(BingxClient::new(rest)),
        Venue::Hyperliquid => Box::new(HyperliquidClient::new(rest)),
        Venue::Coinmarketcap | Venue::Coinalyze | Venue::Deribit => return None,
    })
}

/// The composed (client, socket manager, adapter) triple for a venue.
pub struct VenueTriple {
    pub client: Box<dyn MarketClient>,
    pub sockets: &'static dyn SocketManager,
    pub adapter: &'static dyn VenueAdapter,
}

impl std::fmt::Debug for VenueTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueTriple")
            .field("venue", &self.adapter.venue())
            .finish()
    }
}

/// Resolve the full triple for a venue, `None` for auxiliary services.
pub fn triple(venue: Venue, rest: RestClient) -> Option<VenueTriple> {
    Some(VenueTriple {
        client: client(venue, rest)?,
        sockets: socket_manager(venue)?,
        adapter: adapter(venue)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tables_agree_on_every_exchange() {
        for venue in Venue::exchanges().iter().copied() {
            let binding = binding(venue).unwrap();
            let adapter = adapter(venue).unwrap();
            let sockets = socket_manager(venue).unwrap();
            let client = client(venue, RestClient::default()).unwrap();

            assert_eq!(binding.venue(), venue);
            assert_eq!(adapter.venue(), venue);
            assert_eq!(sockets.venue(), venue);
            assert_eq!(client.venue(), venue);
        }
    }

    #[test]
    fn test_registry_rejects_auxiliary_services() {
        for venue in [Venue::Coinmarketcap, Venue::Coinalyze, Venue::Deribit] {
            assert!(binding(venue).is_none());
            assert!(adapter(venue).is_none());
            assert!(socket_manager(venue).is_none());
            assert!(client(venue, RestClient::default()).is_none());
        }
    }
}

//! MEXC spot push-stream Protocol-Buffer frames.
//!
//! After the spot migration to `wbs-api.mexc.com`, several public channels ship protobuf
//! binary frames instead of JSON. Only the subset of the `PushDataV3ApiWrapper` schema this
//! crate subscribes to is modelled: aggregated deals, klines and mini tickers.
//!
//! See docs: <https://mexcdevelop.github.io/apidocs/spot_v3_en/#websocket-market-streams>

use serde_json::{Value, json};

/// Envelope of every spot push frame.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PushDataV3ApiWrapper {
    #[prost(string, tag = "1")]
    pub channel: String,
    #[prost(string, optional, tag = "3")]
    pub symbol: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub symbol_id: Option<String>,
    #[prost(int64, optional, tag = "5")]
    pub create_time: Option<i64>,
    #[prost(int64, optional, tag = "6")]
    pub send_time: Option<i64>,
    #[prost(message, optional, tag = "308")]
    pub public_spot_kline: Option<PublicSpotKlineV3Api>,
    #[prost(message, optional, tag = "310")]
    pub public_mini_tickers: Option<PublicMiniTickersV3Api>,
    #[prost(message, optional, tag = "314")]
    pub public_aggre_deals: Option<PublicAggreDealsV3Api>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicAggreDealsV3Api {
    #[prost(message, repeated, tag = "1")]
    pub deals: Vec<PublicAggreDealsV3ApiItem>,
    #[prost(string, tag = "2")]
    pub event_type: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicAggreDealsV3ApiItem {
    #[prost(string, tag = "1")]
    pub price: String,
    #[prost(string, tag = "2")]
    pub quantity: String,
    /// 1 = buy, 2 = sell.
    #[prost(int32, tag = "3")]
    pub trade_type: i32,
    #[prost(int64, tag = "4")]
    pub time: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicSpotKlineV3Api {
    #[prost(string, tag = "1")]
    pub interval: String,
    /// Bar open, epoch seconds.
    #[prost(int64, tag = "2")]
    pub window_start: i64,
    #[prost(string, tag = "3")]
    pub opening_price: String,
    #[prost(string, tag = "4")]
    pub closing_price: String,
    #[prost(string, tag = "5")]
    pub highest_price: String,
    #[prost(string, tag = "6")]
    pub lowest_price: String,
    /// Base-asset volume.
    #[prost(string, tag = "7")]
    pub volume: String,
    /// Quote-asset amount.
    #[prost(string, tag = "8")]
    pub amount: String,
    /// Bar close, epoch seconds.
    #[prost(int64, tag = "9")]
    pub window_end: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicMiniTickersV3Api {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<PublicMiniTickerV3Api>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicMiniTickerV3Api {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(string, tag = "2")]
    pub price: String,
    /// 24h change rate, a fraction.
    #[prost(string, tag = "3")]
    pub rate: String,
    #[prost(string, tag = "4")]
    pub zoned_rate: String,
    #[prost(string, tag = "5")]
    pub high: String,
    #[prost(string, tag = "6")]
    pub low: String,
    /// Quote-asset volume.
    #[prost(string, tag = "7")]
    pub volume: String,
    #[prost(string, tag = "8")]
    pub quantity: String,
}

impl PushDataV3ApiWrapper {
    /// Re-shape the decoded frame into the JSON layout the adapter consumes, so protobuf and
    /// JSON venues flow through one queue type.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "channel": self.channel,
            "symbol": self.symbol,
            "sendTime": self.send_time,
        });

        if let Some(deals) = &self.public_aggre_deals {
            value["publicAggreDeals"] = json!({
                "eventType": deals.event_type,
                "deals": deals
                    .deals
                    .iter()
                    .map(|deal| {
                        json!({
                            "price": deal.price,
                            "quantity": deal.quantity,
                            "tradeType": deal.trade_type,
                            "time": deal.time,
                        })
                    })
                    .collect::<Vec<_>>(),
            });
        }

        if let Some(kline) = &self.public_spot_kline {
            value["publicSpotKline"] = json!({
                "interval": kline.interval,
                "windowStart": kline.window_start,
                "windowEnd": kline.window_end,
                "openingPrice": kline.opening_price,
                "closingPrice": kline.closing_price,
                "highestPrice": kline.highest_price,
                "lowestPrice": kline.lowest_price,
                "volume": kline.volume,
                "amount": kline.amount,
            });
        }

        if let Some(tickers) = &self.public_mini_tickers {
            value["publicMiniTickers"] = json!({
                "items": tickers
                    .items
                    .iter()
                    .map(|item| {
                        json!({
                            "symbol": item.symbol,
                            "price": item.price,
                            "rate": item.rate,
                            "volume": item.volume,
                        })
                    })
                    .collect::<Vec<_>>(),
            });
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_push_wrapper_decode_round_trip() {
        let wrapper = PushDataV3ApiWrapper {
            channel: "spot@public.aggre.deals.v3.api.pb@100ms@BTCUSDT".to_string(),
            symbol: Some("BTCUSDT".to_string()),
            symbol_id: None,
            create_time: None,
            send_time: Some(1700000000123),
            public_spot_kline: None,
            public_mini_tickers: None,
            public_aggre_deals: Some(PublicAggreDealsV3Api {
                deals: vec![PublicAggreDealsV3ApiItem {
                    price: "30000.1".to_string(),
                    quantity: "0.05".to_string(),
                    trade_type: 1,
                    time: 1700000000100,
                }],
                event_type: "spot@public.aggre.deals".to_string(),
            }),
        };

        let encoded = wrapper.encode_to_vec();
        let decoded = PushDataV3ApiWrapper::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded, wrapper);

        let value = decoded.to_value();
        assert_eq!(value["symbol"], "BTCUSDT");
        assert_eq!(value["publicAggreDeals"]["deals"][0]["tradeType"], 1);
    }
}

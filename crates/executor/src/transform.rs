//! Context threaded to payload transformation and the opaque payload
//! wrapper. The cost formulas themselves live downstream; here rows are
//! wrapped with the pricing context they will be transformed under.

use std::collections::BTreeMap;

use scanlens_core::TimeRange;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Total on-demand scan price for one observation window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalPrice {
    pub total_scan_price: f64,
}

/// Per-run inputs for payload transformation: the customer's discount
/// and the precomputed per-window scan totals.
#[derive(Clone, Debug, Default)]
pub struct TransformerContext {
    pub discount: f64,
    pub total_scan_price_per_period: BTreeMap<TimeRange, TotalPrice>,
}

/// Wraps raw warehouse rows with the transformation context for one
/// window.
pub fn to_payload(rows: Vec<Value>, ctx: &TransformerContext, time_range: TimeRange) -> Value {
    json!({
        "rows": rows,
        "discount": ctx.discount,
        "totalScanPrice": ctx
            .total_scan_price_per_period
            .get(&time_range)
            .map(|price| price.total_scan_price),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_rows_and_window_pricing() {
        let ctx = TransformerContext {
            discount: 0.2,
            total_scan_price_per_period: BTreeMap::from([(
                TimeRange::Week,
                TotalPrice { total_scan_price: 125.5 },
            )]),
        };

        let payload = to_payload(vec![json!({"slots": 4})], &ctx, TimeRange::Week);

        assert_eq!(payload["rows"], json!([{"slots": 4}]));
        assert_eq!(payload["discount"], json!(0.2));
        assert_eq!(payload["totalScanPrice"], json!(125.5));
    }

    #[test]
    fn missing_window_pricing_is_null_not_an_error() {
        let payload = to_payload(Vec::new(), &TransformerContext::default(), TimeRange::Day);

        assert_eq!(payload["totalScanPrice"], Value::Null);
    }
}

//! Currency tables and exact minor-unit conversions.
//!
//! Assets are written `CODE/precision` (`USD/2`, `JPY/0`). Conversions from
//! vendor decimal strings scale digits directly into a [`BigInt`]; no value
//! ever passes through a float.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use num_bigint::{BigInt, Sign};
use tokio::sync::{Mutex, RwLock};

use crate::error::{ErrorKind, PluginError};

/// `(code, decimals)` pairs a connector is able to represent.
pub type CurrencyTable = [(&'static str, u32)];

/// ISO 4217 currencies shared by most connectors.
pub const ISO4217: &CurrencyTable = &[
    ("AED", 2),
    ("AUD", 2),
    ("BGN", 2),
    ("BHD", 3),
    ("BRL", 2),
    ("CAD", 2),
    ("CHF", 2),
    ("CNY", 2),
    ("CZK", 2),
    ("DKK", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("HKD", 2),
    ("HUF", 2),
    ("IDR", 2),
    ("ILS", 2),
    ("INR", 2),
    ("ISK", 0),
    ("JOD", 3),
    ("JPY", 0),
    ("KRW", 0),
    ("KWD", 3),
    ("MXN", 2),
    ("MYR", 2),
    ("NOK", 2),
    ("NZD", 2),
    ("OMR", 3),
    ("PHP", 2),
    ("PLN", 2),
    ("RON", 2),
    ("SAR", 2),
    ("SEK", 2),
    ("SGD", 2),
    ("THB", 2),
    ("TND", 3),
    ("TRY", 2),
    ("USD", 2),
    ("ZAR", 2),
];

pub fn precision(table: &CurrencyTable, code: &str) -> Option<u32> {
    table
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, p)| *p)
}

pub fn format_asset(code: &str, precision: u32) -> String {
    format!("{}/{}", code.to_ascii_uppercase(), precision)
}

/// The asset for `code`, or `None` when the table does not support it.
pub fn asset_from_table(table: &CurrencyTable, code: &str) -> Option<String> {
    precision(table, code).map(|p| format_asset(code, p))
}

/// Split `CODE/precision` into its parts.
pub fn parse_asset(asset: &str) -> Result<(String, u32), PluginError> {
    let (code, precision) = asset
        .split_once('/')
        .ok_or_else(|| PluginError::invalid_request(format!("asset {asset:?} has no precision")))?;
    let precision = precision
        .parse::<u32>()
        .map_err(|_| PluginError::invalid_request(format!("asset {asset:?} has an invalid precision")))?;
    if !is_valid_asset(asset) {
        return Err(PluginError::invalid_request(format!("invalid asset {asset:?}")));
    }
    Ok((code.to_string(), precision))
}

/// Resolve an initiation asset against a connector's table. The precision in
/// the asset must match the table, otherwise amounts would be misread.
pub fn currency_and_precision(
    table: &CurrencyTable,
    asset: &str,
) -> Result<(String, u32), PluginError> {
    let (code, asset_precision) = parse_asset(asset)?;
    match precision(table, &code) {
        Some(p) if p == asset_precision => Ok((code, p)),
        Some(p) => Err(PluginError::invalid_request(format!(
            "asset {asset} does not match {code} precision {p}"
        ))),
        None => Err(PluginError::wrap(
            PluginError::wrap(format!("currency {code}"), ErrorKind::CurrencyNotSupported),
            ErrorKind::InvalidRequest,
        )),
    }
}

/// `[A-Z][A-Z0-9]{0,16}(_[A-Z]{1,16})?(/[0-9]{1,6})?`
pub fn is_valid_asset(asset: &str) -> bool {
    let (code, precision) = match asset.split_once('/') {
        Some((code, precision)) => (code, Some(precision)),
        None => (asset, None),
    };

    if let Some(precision) = precision {
        if precision.is_empty()
            || precision.len() > 6
            || !precision.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }
    }

    let (main, suffix) = match code.split_once('_') {
        Some((main, suffix)) => (main, Some(suffix)),
        None => (code, None),
    };

    let mut bytes = main.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_uppercase() => {}
        _ => return false,
    }
    if main.len() > 17
        || !bytes.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return false;
    }

    match suffix {
        Some(s) => !s.is_empty() && s.len() <= 16 && s.bytes().all(|b| b.is_ascii_uppercase()),
        None => true,
    }
}

/// Convert a vendor decimal string ("100.5") to minor units at `precision`.
///
/// Extra fractional digits are accepted only when they are zeros.
pub fn amount_from_decimal_str(amount: &str, precision: u32) -> Result<BigInt, PluginError> {
    let invalid = || PluginError::translation("amount", format!("invalid decimal {amount:?}"));

    let trimmed = amount.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let precision = precision as usize;
    let mut frac = frac_part.to_string();
    if frac.len() > precision {
        if frac[precision..].bytes().any(|b| b != b'0') {
            return Err(PluginError::translation(
                "amount",
                format!("{amount:?} has more than {precision} decimals"),
            ));
        }
        frac.truncate(precision);
    }
    while frac.len() < precision {
        frac.push('0');
    }

    let digits = format!("{int_part}{frac}");
    let digits = if digits.is_empty() { "0" } else { digits.as_str() };
    let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Render minor units back as a decimal string ("10001", 2 -> "100.01").
pub fn amount_to_decimal_str(amount: &BigInt, precision: u32) -> String {
    let negative = amount.sign() == Sign::Minus;
    let digits = amount.magnitude().to_string();
    let precision = precision as usize;

    let body = if precision == 0 {
        digits
    } else {
        let padded = format!("{digits:0>width$}", width = precision + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - precision);
        format!("{int_part}.{frac_part}")
    };

    if negative {
        format!("-{body}")
    } else {
        body
    }
}

struct Snapshot {
    decimals: Arc<HashMap<String, u32>>,
    fetched_at: Instant,
}

/// Lazily refreshed currency-decimals table shared by concurrent callers.
///
/// Reads take the snapshot lock only. A stale snapshot is reloaded under a
/// dedicated refresh mutex, so concurrent callers trigger a single load.
pub struct DecimalsCache {
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    refresh: Mutex<()>,
}

impl DecimalsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    async fn fresh(&self) -> Option<Arc<HashMap<String, u32>>> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < self.ttl)
            .map(|s| Arc::clone(&s.decimals))
    }

    /// Current table, calling `load` when the snapshot is missing or stale.
    pub async fn get_or_refresh<F, Fut>(&self, load: F) -> Result<Arc<HashMap<String, u32>>, PluginError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<String, u32>, PluginError>>,
    {
        if let Some(decimals) = self.fresh().await {
            return Ok(decimals);
        }

        let _refreshing = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(decimals) = self.fresh().await {
            return Ok(decimals);
        }

        let decimals = Arc::new(load().await?);
        *self.snapshot.write().await = Some(Snapshot {
            decimals: Arc::clone(&decimals),
            fetched_at: Instant::now(),
        });
        Ok(decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_format_and_lookup() {
        assert_eq!(format_asset("usd", 2), "USD/2");
        assert_eq!(asset_from_table(ISO4217, "JPY").as_deref(), Some("JPY/0"));
        assert_eq!(asset_from_table(ISO4217, "XXX"), None);
    }

    #[test]
    fn test_asset_validity() {
        assert!(is_valid_asset("USD/2"));
        assert!(is_valid_asset("USD"));
        assert!(is_valid_asset("USDC_ETH/6"));
        assert!(!is_valid_asset("usd/2"));
        assert!(!is_valid_asset("USD/"));
        assert!(!is_valid_asset("USD/two"));
        assert!(!is_valid_asset(""));
    }

    #[test]
    fn test_currency_and_precision() {
        assert_eq!(
            currency_and_precision(ISO4217, "EUR/2").unwrap(),
            ("EUR".to_string(), 2)
        );
        let err = currency_and_precision(ISO4217, "XXX/2").unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));
        assert!(err.is(ErrorKind::CurrencyNotSupported));
        assert!(currency_and_precision(ISO4217, "EUR/3").is_err());
    }

    #[test]
    fn test_decimal_string_to_minor_units() {
        assert_eq!(amount_from_decimal_str("100.01", 2).unwrap(), BigInt::from(10001));
        assert_eq!(amount_from_decimal_str("100.1", 2).unwrap(), BigInt::from(10010));
        assert_eq!(amount_from_decimal_str("100", 2).unwrap(), BigInt::from(10000));
        assert_eq!(amount_from_decimal_str("-5.5", 2).unwrap(), BigInt::from(-550));
        assert_eq!(amount_from_decimal_str("0.010", 2).unwrap(), BigInt::from(1));
        assert_eq!(amount_from_decimal_str("1500", 0).unwrap(), BigInt::from(1500));
        assert_eq!(
            amount_from_decimal_str("12345678901234567890.12", 2)
                .unwrap()
                .to_string(),
            "1234567890123456789012"
        );
        assert!(amount_from_decimal_str("100.001", 2).is_err());
        assert!(amount_from_decimal_str("1e5", 2).is_err());
        assert!(amount_from_decimal_str("", 2).is_err());
    }

    #[test]
    fn test_minor_units_to_decimal_string() {
        assert_eq!(amount_to_decimal_str(&BigInt::from(10001), 2), "100.01");
        assert_eq!(amount_to_decimal_str(&BigInt::from(5), 2), "0.05");
        assert_eq!(amount_to_decimal_str(&BigInt::from(-550), 2), "-5.50");
        assert_eq!(amount_to_decimal_str(&BigInt::from(1500), 0), "1500");
    }

    #[tokio::test]
    async fn test_decimals_cache_loads_once_while_fresh() {
        let cache = DecimalsCache::new(Duration::from_secs(60));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let table = cache
                .get_or_refresh(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(HashMap::from([("EUR".to_string(), 2)]))
                })
                .await
                .unwrap();
            assert_eq!(table.get("EUR"), Some(&2));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decimals_cache_reloads_when_stale() {
        let cache = DecimalsCache::new(Duration::ZERO);
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_refresh(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(HashMap::new())
                })
                .await
                .unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_decimals_cache_failed_load_keeps_nothing() {
        let cache = DecimalsCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_refresh(|| async { Err(PluginError::invalid_request("boom")) })
            .await;
        assert!(err.is_err());

        let table = cache
            .get_or_refresh(|| async { Ok(HashMap::from([("GBP".to_string(), 2)])) })
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }
}

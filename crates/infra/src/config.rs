//! Runtime configuration for the stock core.

/// Tunables read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockroomConfig {
    /// Extra attempts after an optimistic concurrency conflict.
    pub max_conflict_retries: u32,
    /// Used when a new variant does not carry its own threshold.
    pub default_low_stock_threshold: i64,
    /// Upper bound on movement history reads.
    pub movement_history_limit: usize,
    pub order_number_prefix: String,
    pub po_number_prefix: String,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            default_low_stock_threshold: 10,
            movement_history_limit: 50,
            order_number_prefix: "ORD".to_string(),
            po_number_prefix: "PO".to_string(),
        }
    }
}

impl StockroomConfig {
    /// Read `STOCKROOM_*` environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_conflict_retries: parse_or(
                &lookup,
                "STOCKROOM_MAX_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
            ),
            default_low_stock_threshold: parse_or(
                &lookup,
                "STOCKROOM_DEFAULT_LOW_STOCK_THRESHOLD",
                defaults.default_low_stock_threshold,
            ),
            movement_history_limit: parse_or(
                &lookup,
                "STOCKROOM_MOVEMENT_HISTORY_LIMIT",
                defaults.movement_history_limit,
            ),
            order_number_prefix: lookup("STOCKROOM_ORDER_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.order_number_prefix),
            po_number_prefix: lookup("STOCKROOM_PO_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.po_number_prefix),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: core::str::FromStr + core::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, fallback = %default, "ignoring unparsable config value");
                default
            }
        },
    }
}

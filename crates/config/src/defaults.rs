pub fn default_enabled() -> bool {
    true
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_metrics_port() -> u16 {
    9090
}

pub fn default_max_connections() -> u32 {
    20
}

pub fn default_max_apply_attempts() -> u32 {
    5
}

pub fn default_retry_backoff_ms() -> u64 {
    10
}

pub fn default_currency() -> String {
    "USD".to_string()
}

pub fn default_minor_unit_decimals() -> u32 {
    2
}

pub fn default_max_idempotency_key_length() -> usize {
    255
}

pub fn default_payments_timeout_ms() -> u64 {
    2000
}

pub fn default_log_level() -> String {
    "info".to_string()
}

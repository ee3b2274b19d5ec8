pub const ITEM_CACHE_REQUESTS_COUNTER: &str = "inventory_item_cache_requests_total";
pub const ITEM_CACHE_WRITE_ERRORS_COUNTER: &str = "inventory_item_cache_write_errors_total";
pub const ITEM_CACHE_INVALIDATION_ERRORS_COUNTER: &str =
    "inventory_item_cache_invalidation_errors_total";
pub const ITEM_DUPLICATE_REJECTIONS_COUNTER: &str = "inventory_item_duplicate_rejections_total";
pub const HTTP_REQUESTS_COUNTER: &str = "http_requests_total";
pub const HTTP_REQUESTS_DURATION: &str = "http_requests_duration_seconds";

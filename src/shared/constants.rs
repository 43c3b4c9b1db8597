/// Default number of reports returned by filtered listings
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of reports a single listing page may return
pub const MAX_LIMIT: i64 = 100;

/// Default search radius for location filtering, in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Sentinel category stored before classification and used whenever the
/// classifier cannot produce an answer
pub const CLASSIFICATION_PENDING: &str = "Classification Pending";

/// Header carrying the shared secret for privileged operations
pub const API_KEY_HEADER: &str = "x-api-key";

/// Number of reports shown in the dashboard's recent list
pub const DASHBOARD_RECENT_LIMIT: i64 = 10;

//! Constants used throughout the AllergoProba core crate.
//!
//! Defaults for configuration, storage layout names and notification limits live here so the
//! binaries and the core agree on them.

/// Directory name (under the data directory) holding order JSON files.
pub const ORDERS_DIR_NAME: &str = "orders";

/// Default public base URL used to build patient-facing page links.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8001";

/// Default Telegram bot username embedded in referral deep links.
pub const DEFAULT_BOT_USERNAME: &str = "allergoproba_bot";

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Deep-link host for referral artifacts.
pub const TELEGRAM_DEEP_LINK_BASE: &str = "https://t.me";

/// Upper bound on how long a single notification request may take.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// How many codes creation draws before giving up on a saturated code space.
pub const MAX_CODE_ATTEMPTS: usize = 64;

/// Prefix shown to patients in front of the numeric order code.
pub const ORDER_CODE_DISPLAY_PREFIX: &str = "ORD-";

/// Directory name (under the data directory) holding one marker file per allocated order id.
pub const IDS_DIR_NAME: &str = "ids";

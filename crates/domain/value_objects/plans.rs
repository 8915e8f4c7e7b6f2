/// Plan label for users without a paid subscription.
pub const FREE_PLAN_TYPE: &str = "free";

/// Plan label used when a subscription references a price missing from the catalog.
pub const FALLBACK_PLAN_TYPE: &str = "basic";

/// Minutes quota for free users and for plans without an explicit quota.
pub const DEFAULT_MONTHLY_MINUTES: i32 = 1000;

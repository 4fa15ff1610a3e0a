mod auth;
mod rate_limit;

pub use auth::{bearer_token, AuthUser, PaidUser};
pub use rate_limit::{build_limiter, extract_client_ip, rate_limit_middleware, IpRateLimiter};

use std::time::Duration;

use crate::requester::{Requester, RequesterBuilder};
use crate::retry::RetryPolicy;

#[macro_export]
/// Creates a mock web server, which responds with a predefined status when
/// handling a matching request
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// A retry policy with millisecond backoff so exhaustion tests stay fast
pub(crate) fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        ..RetryPolicy::default()
    }
}

/// A requester with a fast retry policy and an effectively unthrottled
/// localhost, for tests that are not about pacing
pub(crate) fn fast_requester() -> Requester {
    let requester = RequesterBuilder::builder()
        .policy(fast_policy())
        .build()
        .requester()
        .expect("Expected valid default requester");
    requester.limiter().set_rate("127.0.0.1", 1000.0);
    requester
}

use std::time::{Duration, Instant};

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Time spent in the report handlers, as a `Server-Timing` entry.
fn server_timing(elapsed: Duration) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("report;dur={:.3}", elapsed.as_secs_f64() * 1000.0)).ok()
}

/// Stamps every response with its handling time and logs report lookups.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let lookup = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    if let Some(value) = server_timing(elapsed) {
        response.headers_mut().insert("Server-Timing", value);
    }
    tracing::debug!(
        status = response.status().as_u16(),
        lookup,
        ms = elapsed.as_millis() as u64,
        "report lookup"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_timing_is_in_milliseconds() {
        let value = server_timing(Duration::from_micros(1_500)).unwrap();
        assert_eq!(value.to_str().unwrap(), "report;dur=1.500");
    }
}

use tokio::time::Instant;
use tracing::trace;

/// Logs how long one admin call took once it goes out of scope
pub(crate) struct RequestTimer<'a> {
    start: Instant,
    method: &'static str,
    path: &'a str,
}

impl<'a> RequestTimer<'a> {
    pub(crate) fn new(
        method: &'static str,
        path: &'a str,
    ) -> Self {
        Self {
            start: Instant::now(),
            method,
            path,
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        trace!(target: "timing", "[TIMING] {} {} took {} ms", self.method, self.path, elapsed.as_millis());
    }
}

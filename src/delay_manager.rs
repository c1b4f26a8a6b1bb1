use std::time::Duration;
use log::debug;

/// Fixed wait between navigating to a profile and reading its markup, giving
/// client-side rendering time to finish.
pub async fn render_wait(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!("Waiting for {:.1} seconds (Render Delay)...", delay.as_secs_f32());
    tokio::time::sleep(delay).await;
}

use std::time::Duration;

/// Retries an asynchronous operation up to `max_retries` times with a fixed
/// delay between attempts.
///
/// `handler` decides whether a result counts as success; the last result is
/// returned either way, so the caller keeps the final error when every
/// attempt fails.
pub async fn retry<A, B: std::future::Future<Output = A>>(
    f: impl Fn() -> B,
    handler: impl Fn(&A) -> bool,
    max_retries: u32,
    delay: Duration,
) -> A {
    let mut retries = 0;
    loop {
        retries += 1;
        let r: A = f().await;
        if handler(&r) || retries >= max_retries {
            return r;
        }
        tokio::time::sleep(delay).await;
    }
}

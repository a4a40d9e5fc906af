#[macro_export]
macro_rules! timer_debug {
    ($msg:literal,$block:expr) => {{
        let now = std::time::Instant::now();
        let result = $block;
        let elapsed = now.elapsed();

        tracing::debug!("{}: Took {:?}", $msg, elapsed);

        result
    }};
}

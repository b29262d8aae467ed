use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

pub(crate) const DEFAULT_THREAD_STACK_SIZE: usize = 16 * 1024 * 1024;

pub(crate) const DEFAULT_CONTEXT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub(crate) const DB_FILE_NAME: &str = "btc-observer.db";

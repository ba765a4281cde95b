// Userspace debugger
#[macro_export]
macro_rules! debug_process {
    ($($arg:tt)+) => {
        log::debug!("[Now: {} | P{}] {}", $crate::now(), $crate::rank(), format_args!($($arg)+));
    }
}

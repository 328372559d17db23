/// Logs a completed operation at info level, tagged so the terminal
/// formatter can tell it apart from ordinary progress messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::info!(status = "success", $($arg)*)
    };
}

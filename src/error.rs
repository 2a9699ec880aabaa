/// Turns a non-fatal error into a log line.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error as a warning under `target` and returns `None` in its place.
    fn ok_warn(self, target: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_warn(self, target: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!(target: target, "{err}");
                None
            }
        }
    }
}

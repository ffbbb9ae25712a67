/// Return early with an internal consistency error. These abort the
/// containing compilation unit and are never recovered locally.
#[macro_export]
macro_rules! internal_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::internal(format!($($arg)*)))
    };
}

macro_rules! hash_err {
    ($kind:expr, $($args:tt)*) => (
        $crate::hash_result::HashError::new($kind, format!($($args)*))
    )
}

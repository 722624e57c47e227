/// Creates a crate-level [`Error`] from a variant of any error enum that
/// converts into [`ErrorKind`]. Fields may use the shorthand syntax, every
/// field value goes through [`Into`].
///
/// ```ignore
/// err!(CacheError::EmptyFile { path })
/// ```
///
/// [`Error`]: crate::Error
/// [`ErrorKind`]: crate::error::ErrorKind
macro_rules! err {
    (@val $variant_ident:ident $field_val:expr) => ($field_val);
    (@val $variant_ident:ident) => ($variant_ident);
    ($variant_path:path $({
        $( $field_ident:ident $(: $field_val:expr)? ),*
        $(,)?
    })?) => {{
        use $variant_path as Variant;

        $crate::error::Error::from(
            Variant $({$(
                $field_ident: ::std::convert::Into::into(
                    $crate::error::err!(@val $field_ident $($field_val)?)
                )
            ),*})?
        )
    }};
}

/// Closure for `map_err` that puts the mapped error into the `source` field
/// of the variant, e.g. `map_err(err_ctx!(MapError::DecodeTile { tile }))`
macro_rules! err_ctx {
    ($variant_path:path $({ $($variant_fields:tt)* })?) => {
        |source| $crate::error::err!($variant_path { source, $($($variant_fields)*)? })
    };
}

/// Error for the conditions that no caller handles specifically. Accepts
/// [`format!`] arguments.
macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::error::err!($crate::error::ErrorKind::Fatal {
            message: format!($($arg)*),
            source: None,
        })
    };
}

pub(crate) use err;
pub(crate) use err_ctx;
pub(crate) use fatal;

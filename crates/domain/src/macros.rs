//! `Display`/`FromStr` for the domain's string-tagged enums
//!
//! ```rust
//! use carebridge_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum ToastVariant {
//!     Default,
//!     Destructive,
//! }
//!
//! impl_domain_status_conversions!(ToastVariant {
//!     Default => "default",
//!     Destructive => "destructive",
//! });
//!
//! assert_eq!("Destructive".parse::<ToastVariant>(), Ok(ToastVariant::Destructive));
//! ```

/// Map each variant to a lowercase tag. Parsing ignores ASCII case and
/// reports the enum name on failure.
///
/// Paths are fully qualified so call sites may shadow `Result`.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $tag,)+
                })
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($tag) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} '{}'", stringify!($enum_name), s))
            }
        }
    };
}

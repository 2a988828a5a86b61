//! Display/FromStr conversions for the small label enums in this crate
//!
//! Outcome states, fetch strategies and error scopes are all written to logs
//! and reports as lowercase strings and read back case-insensitively.
//!
//! # Example
//!
//! ```rust
//! use restsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Discover,
//!     Fetch,
//!     Persist,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Discover => "discover",
//!     Fetch => "fetch",
//!     Persist => "persist",
//! });
//!
//! assert_eq!(Phase::Fetch.to_string(), "fetch");
//! assert_eq!("PERSIST".parse::<Phase>(), Ok(Phase::Persist));
//! ```

/// Implements Display and FromStr for a fieldless enum
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Variant to lowercase label mapping
///
/// Parsing lowercases its input first, so labels must be lowercase.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Discover,
        Fetch,
        Persist,
    }

    impl_domain_status_conversions!(Phase {
        Discover => "discover",
        Fetch => "fetch",
        Persist => "persist",
    });

    #[test]
    fn labels_render_lowercase() {
        assert_eq!(Phase::Discover.to_string(), "discover");
        assert_eq!(format!("{}", Phase::Persist), "persist");
    }

    #[test]
    fn parsing_ignores_case() {
        assert_eq!(Phase::from_str("Fetch"), Ok(Phase::Fetch));
        assert_eq!(Phase::from_str("DISCOVER"), Ok(Phase::Discover));
    }

    #[test]
    fn unknown_label_names_the_enum() {
        let err = Phase::from_str("upload").unwrap_err();
        assert_eq!(err, "Invalid Phase: upload");
        assert!(Phase::from_str("").is_err());
    }
}

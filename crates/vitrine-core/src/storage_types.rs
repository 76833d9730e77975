use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Implements `as_str`, `Display` and case-insensitive `FromStr` from one name table.
macro_rules! named_choice {
    (@first $first:literal $(, $rest:literal)*) => { $first };
    ($ty:ident, $what:literal, { $($variant:ident => [$($name:literal),+]),+ $(,)? }) => {
        impl $ty {
            /// Canonical lower-case name, as accepted in configuration.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => named_choice!(@first $($name),+),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($($name)|+ => Ok($ty::$variant),)+
                    _ => Err(anyhow::anyhow!(concat!("Unknown ", $what, " `{}`"), s)),
                }
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Where blobs live. Lives in core because configuration picks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
    Memory,
}

named_choice!(StorageBackend, "storage backend", {
    S3 => ["s3"],
    Local => ["local"],
    Memory => ["memory"],
});

/// Event bus transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    /// In-process topic with per-subscription queues
    Memory,
    /// SNS topic fanned out to SQS queues
    Aws,
}

named_choice!(BusBackend, "bus backend", {
    Memory => ["memory"],
    Aws => ["aws"],
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

named_choice!(LogFormat, "log format", {
    Compact => ["compact", "text", "pretty"],
    Json => ["json"],
});

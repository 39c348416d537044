use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use diesel::{AsExpression, FromSqlRow};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const LAYOUT_KEY: &str = "layout";

#[derive(Debug)]
pub struct PoolInitializationError(pub String);

impl Display for PoolInitializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl std::error::Error for PoolInitializationError {}

/// Stores a closed enum in a `Text` column, rejecting unknown strings on load.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        "'{other}' is not a valid {}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl diesel::serialize::ToSql<Text, diesel::pg::Pg> for $name {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
            ) -> diesel::serialize::Result {
                use std::io::Write;

                out.write_all(self.as_str().as_bytes())?;
                Ok(diesel::serialize::IsNull::No)
            }
        }

        impl diesel::deserialize::FromSql<Text, diesel::pg::Pg> for $name {
            fn from_sql(bytes: diesel::pg::PgValue<'_>) -> diesel::deserialize::Result<Self> {
                let raw = std::str::from_utf8(bytes.as_bytes())?;
                Ok(raw.parse::<$name>()?)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Seated,
    Completed,
    Cancelled,
}

text_enum!(ReservationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Seated => "seated",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    OutOfService,
}

text_enum!(TableStatus {
    Available => "available",
    Occupied => "occupied",
    Reserved => "reserved",
    OutOfService => "out_of_service",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    Round,
    Square,
    Rectangle,
}

text_enum!(TableShape {
    Round => "round",
    Square => "square",
    Rectangle => "rectangle",
});

/// Public tables show up in the guest layout, staff tables only in the staff one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum TableVisibility {
    Public,
    Staff,
}

text_enum!(TableVisibility {
    Public => "public",
    Staff => "staff",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_storage_values() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), *status);
        }
        assert_eq!(TableStatus::OutOfService.to_string(), "out_of_service");
    }

    #[test]
    fn unknown_strings_are_rejected() {
        assert!(matches!(
            "done".parse::<ReservationStatus>(),
            Err(DomainError::Validation(_))
        ));
        assert!("hexagon".parse::<TableShape>().is_err());
        assert!("PUBLIC".parse::<TableVisibility>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TableStatus::OutOfService).unwrap();
        assert_eq!(json, "\"out_of_service\"");
        let status: ReservationStatus = serde_json::from_str("\"seated\"").unwrap();
        assert_eq!(status, ReservationStatus::Seated);
    }
}

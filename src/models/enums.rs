use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(EntityKind {
    Organization => "organization",
    Branch => "branch",
    Doctor => "doctor",
    Receptionist => "receptionist",
    BranchAdmin => "branch_admin",
    Patient => "patient",
});

impl EntityKind {
    /// The kind an entity of this kind must be parented under.
    /// Organizations are hierarchy roots and have no parent.
    pub fn parent_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Organization => None,
            Self::Branch => Some(Self::Organization),
            Self::Doctor | Self::Receptionist | Self::BranchAdmin | Self::Patient => {
                Some(Self::Branch)
            }
        }
    }
}

str_enum!(DeletionOrigin {
    None => "none",
    Direct => "direct",
    Cascaded => "cascaded",
});

str_enum!(AuditAction {
    Delete => "delete",
    Restore => "restore",
});

//! Status enums mapping to the SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed data in the corresponding
//! `*_statuses` table, and its name matches the `name` column.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Lookup-table `name` value.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            /// Parse from the lookup-table `name` value.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_status_enum! {
    /// Generated asset lifecycle status.
    AssetStatus {
        Pending = 1 => "pending",
        Generating = 2 => "generating",
        Completed = 3 => "completed",
        Review = 4 => "review",
        Approved = 5 => "approved",
        Rejected = 6 => "rejected",
        Failed = 7 => "failed",
        Archived = 8 => "archived",
    }
}

define_status_enum! {
    /// Post-approval pipeline run status. `NULL` in the row means never run.
    PipelineStatus {
        Processing = 1 => "processing",
        Completed = 2 => "completed",
        Failed = 3 => "failed",
    }
}

define_status_enum! {
    /// Generation queue entry status.
    QueueStatus {
        Pending = 1 => "pending",
        Processing = 2 => "processing",
        Completed = 3 => "completed",
        Failed = 4 => "failed",
    }
}

impl AssetStatus {
    /// Whether a row in this status may be approved.
    pub fn is_approvable(self) -> bool {
        matches!(self, Self::Completed | Self::Review)
    }

    /// Whether a row in this status may be rejected.
    pub fn is_rejectable(self) -> bool {
        matches!(self, Self::Completed | Self::Review | Self::Approved)
    }
}

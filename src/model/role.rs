use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Regular,
    Admin,
}

impl Role {
    /// Unknown role text is treated as the least privileged role.
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(Role::Regular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_text_round_trips_through_the_database_form() {
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert_eq!(Role::from_db("admin"), Role::Admin);
        assert_eq!(Role::from_db("regular"), Role::Regular);
        assert_eq!(Role::from_db("1"), Role::Regular);
    }
}

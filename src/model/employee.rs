use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "user_id": 3,
        "name": "Siti Rahma",
        "gender": "female",
        "email": "siti@company.com",
        "phone_number": "+628123456789",
        "photo_profile": null
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 3)]
    pub user_id: u64,

    #[schema(example = "Siti Rahma")]
    pub name: String,

    #[schema(example = "female")]
    pub gender: String,

    #[schema(example = "siti@company.com")]
    pub email: String,

    #[schema(example = "+628123456789")]
    pub phone_number: String,

    #[schema(nullable = true)]
    pub photo_profile: Option<String>,
}

/// Profile fields supplied when an administrator creates an employee.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub photo_profile: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
    pub name: String,
    pub email: String,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub photo_profile: Option<String>,
}

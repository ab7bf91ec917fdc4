//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    PasswordSalt,
    SetPath,
    PlanId,
    CreatedAt,
}

#[derive(Iden)]
pub enum Plan {
    Table,
    Id,
    Name,
    Cost,
    CreatedDate,
    UpdatedDate,
}

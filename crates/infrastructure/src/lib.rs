//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod postgres_assignment_repository;
mod postgres_authorization_repository;
mod postgres_role_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use postgres_assignment_repository::PostgresAssignmentRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_role_repository::{PostgresRoleRepository, ensure_administrator_role};
pub use postgres_user_repository::PostgresUserRepository;

//! User lifecycle ports and application service.
//!
//! Owns admin-driven user management plus email/password authentication.
//! Login failures use one generic message for every cause to prevent
//! account enumeration.

use std::sync::Arc;

use async_trait::async_trait;
use gatehouse_core::{AppError, AppResult, PrincipalIdentity};
use gatehouse_domain::{EmailAddress, RoleId, UserId, UserStatus, validate_password};

use crate::role_service::{AssignmentFilter, AssignmentRepository, RoleRepository};

/// User record returned by repository queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name, if provided.
    pub last_name: Option<String>,
    /// Canonical email address.
    pub email: String,
    /// Phone number, if provided.
    pub phone_no: Option<String>,
    /// Lifecycle state.
    pub status: UserStatus,
    /// Argon2id password hash, or `None` for accounts awaiting activation.
    pub password_hash: Option<String>,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last update timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Compact role projection attached to user reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSummary {
    /// Role identifier.
    pub role_id: RoleId,
    /// Role name.
    pub name: String,
}

/// A user together with its non-archived role assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithRoles {
    /// The user record.
    pub user: UserRecord,
    /// Roles attached through non-archived assignments.
    pub roles: Vec<RoleSummary>,
}

/// Values handed to the user repository on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    /// Given name.
    pub first_name: String,
    /// Family name, if provided.
    pub last_name: Option<String>,
    /// Canonical email address.
    pub email: String,
    /// Phone number, if provided.
    pub phone_no: Option<String>,
    /// Initial lifecycle state.
    pub status: UserStatus,
    /// Password hash when credentials were supplied at creation.
    pub password_hash: Option<String>,
}

/// Input payload for admin-driven user creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone_no: Option<String>,
    /// Initial role for the new user.
    pub role_id: RoleId,
    /// Optional initial password; without one the account stays pending.
    pub password: Option<String>,
}

/// Input payload for updating another user. Omitted fields are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserInput {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New phone number.
    pub phone_no: Option<String>,
    /// New lifecycle state (`active` or `pending`).
    pub status: Option<UserStatus>,
    /// Replacement role set, by role name.
    pub roles: Option<Vec<String>>,
}

/// Profile field changes handed to the user repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New phone number.
    pub phone_no: Option<String>,
    /// New lifecycle state.
    pub status: Option<UserStatus>,
}

/// Query parameters for paginated user listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    /// Maximum rows returned.
    pub take: i64,
    /// 1-based page number.
    pub page_no: i64,
    /// Optional case-insensitive name/email filter.
    pub search_text: Option<String>,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by email (case-insensitive), regardless of status.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user matching the email or, when given, the phone number.
    async fn find_by_email_or_phone(
        &self,
        email: &str,
        phone_no: Option<&str>,
    ) -> AppResult<Option<UserRecord>>;

    /// Finds an active user by id.
    async fn find_active_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Finds an active user by id together with its roles.
    async fn find_active_with_roles(&self, user_id: UserId) -> AppResult<Option<UserWithRoles>>;

    /// Lists non-deleted users with their roles, paginated and searchable.
    async fn list(&self, query: UserListQuery) -> AppResult<(Vec<UserWithRoles>, u64)>;

    /// Creates a new user record.
    ///
    /// Fails with `Conflict` when the email or phone number is taken.
    async fn create(&self, record: NewUserRecord) -> AppResult<UserRecord>;

    /// Applies profile field changes to a user.
    async fn update_profile(&self, user_id: UserId, changes: UserChanges) -> AppResult<()>;

    /// Replaces the stored password hash.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()>;

    /// Sets the lifecycle state of a user.
    async fn set_status(&self, user_id: UserId, status: UserStatus) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps the application layer free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Application service for user management and authentication.
#[derive(Clone)]
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn AssignmentRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn AssignmentRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            user_repository,
            role_repository,
            assignment_repository,
            password_hasher,
        }
    }

    /// Creates a user and attaches its initial role.
    ///
    /// Without a password the account starts `pending` and cannot log in
    /// until credentials are set through a later activation flow.
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<UserWithRoles> {
        let email = EmailAddress::new(input.email)?;

        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(self.password_hasher.hash_password(password)?)
            }
            None => None,
        };

        let existing = self
            .user_repository
            .find_by_email_or_phone(email.as_str(), input.phone_no.as_deref())
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "a user with this email or phone number already exists".to_owned(),
            ));
        }

        let role = self
            .role_repository
            .find_active_by_id(input.role_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("role '{}' was not found", input.role_id))
            })?;

        let status = if password_hash.is_some() {
            UserStatus::Active
        } else {
            UserStatus::Pending
        };

        let user = self
            .user_repository
            .create(NewUserRecord {
                first_name: input.first_name,
                last_name: input.last_name,
                email: email.into(),
                phone_no: input.phone_no,
                status,
                password_hash,
            })
            .await?;

        self.assignment_repository
            .create(user.id, role.role_id)
            .await?;

        Ok(UserWithRoles {
            user,
            roles: vec![RoleSummary {
                role_id: role.role_id,
                name: role.name,
            }],
        })
    }

    /// Lists non-deleted users matching the query.
    pub async fn list_users(&self, query: UserListQuery) -> AppResult<(Vec<UserWithRoles>, u64)> {
        self.user_repository.list(query).await
    }

    /// Returns one active user with its roles.
    pub async fn get_user(&self, user_id: UserId) -> AppResult<UserWithRoles> {
        self.user_repository
            .find_active_with_roles(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))
    }

    /// Updates another user's profile and, when a role list is supplied,
    /// reconciles the user's assignments against it: assignments for removed
    /// roles are archived, missing ones are created, unchanged ones are kept.
    pub async fn update_user(
        &self,
        user_id: UserId,
        input: UpdateUserInput,
    ) -> AppResult<UserWithRoles> {
        let existing = self
            .user_repository
            .find_active_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        if let Some(role_names) = input.roles {
            let roles = self
                .role_repository
                .find_active_by_names(&role_names)
                .await?;
            if roles.len() != role_names.len() {
                return Err(AppError::NotFound(
                    "one or more requested roles were not found".to_owned(),
                ));
            }

            self.reconcile_roles(existing.id, roles.iter().map(|role| role.role_id))
                .await?;
        }

        self.user_repository
            .update_profile(
                existing.id,
                UserChanges {
                    first_name: input.first_name,
                    last_name: input.last_name,
                    phone_no: input.phone_no,
                    status: input.status,
                },
            )
            .await?;

        self.get_user(existing.id).await
    }

    /// Changes a user's password.
    ///
    /// Only the account owner may do this, and the current password must
    /// verify first.
    pub async fn update_password(
        &self,
        user_id: UserId,
        actor: &PrincipalIdentity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if user_id.as_uuid() != actor.principal_id() {
            return Err(AppError::Unauthorized(
                "a password can only be changed by the account owner".to_owned(),
            ));
        }

        let user = self
            .user_repository
            .find_active_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        let Some(ref stored_hash) = user.password_hash else {
            return Err(AppError::Validation(
                "no password is set on this account".to_owned(),
            ));
        };

        let current_valid = self
            .password_hasher
            .verify_password(current_password, stored_hash)?;
        if !current_valid {
            return Err(AppError::Unauthorized(
                "current password is incorrect".to_owned(),
            ));
        }

        validate_password(new_password)?;

        let new_hash = self.password_hasher.hash_password(new_password)?;
        self.user_repository
            .update_password(user_id, &new_hash)
            .await
    }

    /// Archives a user and then archives its assignment edges.
    pub async fn archive_user(&self, user_id: UserId) -> AppResult<()> {
        let existing = self
            .user_repository
            .find_active_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' was not found")))?;

        self.user_repository
            .set_status(existing.id, UserStatus::Deleted)
            .await?;

        self.assignment_repository
            .archive(&AssignmentFilter::for_user(existing.id))
            .await?;

        Ok(())
    }

    /// Authenticates a user with email and password.
    ///
    /// Every failure mode returns the same generic `Unauthorized` error; a
    /// throwaway hash keeps response timing level when the account is
    /// missing or has no credentials.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserRecord> {
        let user = self.user_repository.find_by_email(email).await?;

        let Some(user) = user else {
            let _ = self.password_hasher.hash_password(password);
            return Err(invalid_credentials());
        };

        if user.status != UserStatus::Active {
            let _ = self.password_hasher.hash_password(password);
            return Err(invalid_credentials());
        }

        let Some(ref stored_hash) = user.password_hash else {
            let _ = self.password_hasher.hash_password(password);
            return Err(invalid_credentials());
        };

        let password_valid = self.password_hasher.verify_password(password, stored_hash)?;
        if !password_valid {
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    async fn reconcile_roles(
        &self,
        user_id: UserId,
        wanted: impl Iterator<Item = RoleId>,
    ) -> AppResult<()> {
        let wanted: Vec<RoleId> = wanted.collect();
        let current = self
            .assignment_repository
            .list_role_ids_for_user(user_id)
            .await?;

        for role_id in current
            .iter()
            .filter(|role_id| !wanted.contains(*role_id))
        {
            self.assignment_repository
                .archive(&AssignmentFilter {
                    user_id: Some(user_id),
                    role_id: Some(*role_id),
                })
                .await?;
        }

        for role_id in wanted
            .iter()
            .filter(|role_id| !current.contains(*role_id))
        {
            self.assignment_repository.create(user_id, *role_id).await?;
        }

        Ok(())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid email or password".to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use gatehouse_core::{AppError, AppResult, PrincipalIdentity};
    use gatehouse_domain::{CapabilityMap, RoleId, UserId, UserStatus};
    use tokio::sync::Mutex;

    use crate::role_service::{
        AssignmentFilter, AssignmentRepository, RoleAssignmentRecord, RoleChanges, RoleListQuery,
        RoleRecord, RoleRepository,
    };

    use super::{
        CreateUserInput, NewUserRecord, PasswordHasher, RoleSummary, UpdateUserInput, UserChanges,
        UserListQuery, UserRecord, UserRepository, UserService, UserWithRoles,
    };

    struct FakePasswordHasher;

    impl PasswordHasher for FakePasswordHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<UserRecord>>,
        assignments: Arc<FakeAssignmentRepository>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn find_by_email_or_phone(
            &self,
            email: &str,
            phone_no: Option<&str>,
        ) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| {
                    user.email == email
                        || (phone_no.is_some() && user.phone_no.as_deref() == phone_no)
                })
                .cloned())
        }

        async fn find_active_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id == user_id && user.status == UserStatus::Active)
                .cloned())
        }

        async fn find_active_with_roles(
            &self,
            user_id: UserId,
        ) -> AppResult<Option<UserWithRoles>> {
            let Some(user) = self.find_active_by_id(user_id).await? else {
                return Ok(None);
            };

            let roles = self
                .assignments
                .list_role_ids_for_user(user_id)
                .await?
                .into_iter()
                .map(|role_id| RoleSummary {
                    role_id,
                    name: role_id.to_string(),
                })
                .collect();

            Ok(Some(UserWithRoles { user, roles }))
        }

        async fn list(&self, _query: UserListQuery) -> AppResult<(Vec<UserWithRoles>, u64)> {
            let users: Vec<UserRecord> = self
                .users
                .lock()
                .await
                .iter()
                .filter(|user| user.status != UserStatus::Deleted)
                .cloned()
                .collect();
            let total = users.len() as u64;
            Ok((
                users
                    .into_iter()
                    .map(|user| UserWithRoles {
                        user,
                        roles: Vec::new(),
                    })
                    .collect(),
                total,
            ))
        }

        async fn create(&self, record: NewUserRecord) -> AppResult<UserRecord> {
            let user = UserRecord {
                id: UserId::new(),
                first_name: record.first_name,
                last_name: record.last_name,
                email: record.email,
                phone_no: record.phone_no,
                status: record.status,
                password_hash: record.password_hash,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            self.users.lock().await.push(user.clone());
            Ok(user)
        }

        async fn update_profile(&self, user_id: UserId, changes: UserChanges) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|user| user.id == user_id)
                .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;

            if let Some(first_name) = changes.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = changes.last_name {
                user.last_name = Some(last_name);
            }
            if let Some(phone_no) = changes.phone_no {
                user.phone_no = Some(phone_no);
            }
            if let Some(status) = changes.status {
                user.status = status;
            }
            Ok(())
        }

        async fn update_password(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|user| user.id == user_id)
                .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;
            user.password_hash = Some(password_hash.to_owned());
            Ok(())
        }

        async fn set_status(&self, user_id: UserId, status: UserStatus) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let user = users
                .iter_mut()
                .find(|user| user.id == user_id)
                .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;
            user.status = status;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRoleRepository {
        roles: Mutex<Vec<RoleRecord>>,
    }

    #[async_trait]
    impl RoleRepository for FakeRoleRepository {
        async fn list(&self, _query: RoleListQuery) -> AppResult<(Vec<RoleRecord>, u64)> {
            let roles = self.roles.lock().await.clone();
            let total = roles.len() as u64;
            Ok((roles, total))
        }

        async fn find_active_by_id(&self, role_id: RoleId) -> AppResult<Option<RoleRecord>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .find(|role| role.role_id == role_id && !role.archived)
                .cloned())
        }

        async fn find_active_by_names(&self, names: &[String]) -> AppResult<Vec<RoleRecord>> {
            Ok(self
                .roles
                .lock()
                .await
                .iter()
                .filter(|role| !role.archived && names.contains(&role.name))
                .cloned()
                .collect())
        }

        async fn create(
            &self,
            name: &str,
            description: Option<&str>,
            capabilities: &CapabilityMap,
        ) -> AppResult<RoleRecord> {
            let role = RoleRecord {
                role_id: RoleId::new(),
                name: name.to_owned(),
                description: description.map(str::to_owned),
                is_system: false,
                archived: false,
                capabilities: capabilities.clone(),
            };
            self.roles.lock().await.push(role.clone());
            Ok(role)
        }

        async fn update(&self, _role_id: RoleId, _changes: RoleChanges) -> AppResult<RoleRecord> {
            Err(AppError::Internal("not used in these tests".to_owned()))
        }

        async fn archive(&self, _role_id: RoleId) -> AppResult<()> {
            Err(AppError::Internal("not used in these tests".to_owned()))
        }
    }

    #[derive(Default)]
    struct FakeAssignmentRepository {
        edges: Mutex<Vec<(UserId, RoleId, bool)>>,
    }

    #[async_trait]
    impl AssignmentRepository for FakeAssignmentRepository {
        async fn create(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
            self.edges.lock().await.push((user_id, role_id, false));
            Ok(())
        }

        async fn archive(&self, filter: &AssignmentFilter) -> AppResult<u64> {
            let mut affected = 0;
            for (user_id, role_id, archived) in self.edges.lock().await.iter_mut() {
                if *archived {
                    continue;
                }
                if filter.user_id.is_none_or(|wanted| wanted == *user_id)
                    && filter.role_id.is_none_or(|wanted| wanted == *role_id)
                {
                    *archived = true;
                    affected += 1;
                }
            }
            Ok(affected)
        }

        async fn list(&self, filter: &AssignmentFilter) -> AppResult<Vec<RoleAssignmentRecord>> {
            Ok(self
                .edges
                .lock()
                .await
                .iter()
                .filter(|(user_id, role_id, archived)| {
                    !archived
                        && filter.user_id.is_none_or(|wanted| wanted == *user_id)
                        && filter.role_id.is_none_or(|wanted| wanted == *role_id)
                })
                .map(|(user_id, role_id, _)| RoleAssignmentRecord {
                    user_id: *user_id,
                    role_id: *role_id,
                    role_name: role_id.to_string(),
                    assigned_at: chrono::Utc::now(),
                })
                .collect())
        }

        async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
            Ok(self
                .edges
                .lock()
                .await
                .iter()
                .filter(|(edge_user_id, _, archived)| !archived && *edge_user_id == user_id)
                .map(|(_, role_id, _)| *role_id)
                .collect())
        }
    }

    struct Fixture {
        service: UserService,
        roles: Arc<FakeRoleRepository>,
        assignments: Arc<FakeAssignmentRepository>,
    }

    fn fixture() -> Fixture {
        let assignments = Arc::new(FakeAssignmentRepository::default());
        let users = Arc::new(FakeUserRepository {
            users: Mutex::new(Vec::new()),
            assignments: assignments.clone(),
        });
        let roles = Arc::new(FakeRoleRepository::default());
        let service = UserService::new(
            users,
            roles.clone(),
            assignments.clone(),
            Arc::new(FakePasswordHasher),
        );
        Fixture {
            service,
            roles,
            assignments,
        }
    }

    async fn seeded_role(fixture: &Fixture, name: &str) -> RoleRecord {
        let created = fixture
            .roles
            .create(name, None, &CapabilityMap::new())
            .await;
        match created {
            Ok(role) => role,
            Err(error) => panic!("role seeding failed: {error}"),
        }
    }

    fn create_input(role_id: RoleId, password: Option<&str>) -> CreateUserInput {
        CreateUserInput {
            first_name: "Ada".to_owned(),
            last_name: Some("Lovelace".to_owned()),
            email: "ada@example.com".to_owned(),
            phone_no: Some("+1000001".to_owned()),
            role_id,
            password: password.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn create_user_with_password_is_active_and_assigned() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        assert_eq!(created.user.status, UserStatus::Active);
        assert_eq!(created.roles.len(), 1);

        let edges = fixture.assignments.edges.lock().await;
        assert_eq!(edges.len(), 1);
    }

    #[tokio::test]
    async fn create_user_without_password_stays_pending() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "viewer").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, None))
            .await;
        assert!(created.is_ok_and(|created| created.user.status == UserStatus::Pending));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let first = fixture
            .service
            .create_user(create_input(role.role_id, None))
            .await;
        assert!(first.is_ok());

        let mut second_input = create_input(role.role_id, None);
        second_input.phone_no = Some("+1000002".to_owned());
        let second = fixture.service.create_user(second_input).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_role_fails_before_creating_the_user() {
        let fixture = fixture();

        let result = fixture
            .service
            .create_user(create_input(RoleId::new(), None))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let users = fixture.service.list_users(list_query()).await;
        assert!(users.is_ok_and(|(users, _)| users.is_empty()));
    }

    fn list_query() -> UserListQuery {
        UserListQuery {
            take: 10,
            page_no: 1,
            search_text: None,
        }
    }

    #[tokio::test]
    async fn role_reconciliation_archives_removed_and_adds_new() {
        let fixture = fixture();
        let editor = seeded_role(&fixture, "editor").await;
        let viewer = seeded_role(&fixture, "viewer").await;

        let created = fixture
            .service
            .create_user(create_input(editor.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        let updated = fixture
            .service
            .update_user(
                created.user.id,
                UpdateUserInput {
                    roles: Some(vec!["viewer".to_owned()]),
                    ..UpdateUserInput::default()
                },
            )
            .await;
        assert!(updated.is_ok());

        let edges = fixture.assignments.edges.lock().await;
        let active: Vec<RoleId> = edges
            .iter()
            .filter(|(_, _, archived)| !archived)
            .map(|(_, role_id, _)| *role_id)
            .collect();
        assert_eq!(active, vec![viewer.role_id]);

        let archived_count = edges.iter().filter(|(_, _, archived)| *archived).count();
        assert_eq!(archived_count, 1);
    }

    #[tokio::test]
    async fn unknown_role_name_in_update_is_not_found() {
        let fixture = fixture();
        let editor = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(editor.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        let result = fixture
            .service
            .update_user(
                created.user.id,
                UpdateUserInput {
                    roles: Some(vec!["ghost".to_owned()]),
                    ..UpdateUserInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn password_change_for_other_account_is_unauthorized() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        let other_actor =
            PrincipalIdentity::new(UserId::new().as_uuid(), "Other", "other@example.com");
        let result = fixture
            .service
            .update_password(
                created.user.id,
                &other_actor,
                "a-strong-passphrase",
                "another-strong-passphrase",
            )
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn password_change_requires_correct_current_password() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        let actor = PrincipalIdentity::new(
            created.user.id.as_uuid(),
            "Ada",
            created.user.email.as_str(),
        );

        let wrong = fixture
            .service
            .update_password(
                created.user.id,
                &actor,
                "not-the-password",
                "another-strong-passphrase",
            )
            .await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let right = fixture
            .service
            .update_password(
                created.user.id,
                &actor,
                "a-strong-passphrase",
                "another-strong-passphrase",
            )
            .await;
        assert!(right.is_ok());
    }

    #[tokio::test]
    async fn archive_user_cascades_to_assignments() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, Some("a-strong-passphrase")))
            .await;
        let created = match created {
            Ok(created) => created,
            Err(error) => panic!("user creation failed: {error}"),
        };

        assert!(fixture.service.archive_user(created.user.id).await.is_ok());

        let edges = fixture.assignments.edges.lock().await;
        assert!(edges.iter().all(|(_, _, archived)| *archived));

        drop(edges);
        let lookup = fixture.service.get_user(created.user.id).await;
        assert!(matches!(lookup, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn login_rejects_every_failure_with_generic_error() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, Some("a-strong-passphrase")))
            .await;
        assert!(created.is_ok());

        let unknown = fixture
            .service
            .login("nobody@example.com", "a-strong-passphrase")
            .await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));

        let wrong_password = fixture
            .service
            .login("ada@example.com", "not-the-password")
            .await;
        assert!(matches!(wrong_password, Err(AppError::Unauthorized(_))));

        let valid = fixture
            .service
            .login("ada@example.com", "a-strong-passphrase")
            .await;
        assert!(valid.is_ok());
    }

    #[tokio::test]
    async fn pending_account_cannot_log_in() {
        let fixture = fixture();
        let role = seeded_role(&fixture, "editor").await;

        let created = fixture
            .service
            .create_user(create_input(role.role_id, None))
            .await;
        assert!(created.is_ok());

        let result = fixture
            .service
            .login("ada@example.com", "a-strong-passphrase")
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

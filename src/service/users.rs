//! The users resource: generic CRUD plus password hashing, run under the
//! user decision table with the requester reloaded from the store.

use super::crud::Repository;
use super::validation::{body_to_map, RequestValidator};
use crate::auth::{AuthContext, PasswordHasher, Principal, Role};
use crate::error::AppError;
use crate::policy::{self, ListScope, UserPatch};
use crate::query::{ListQuery, Predicate, Projection, Record, Scalar};
use crate::resource::{User, USERS};
use crate::store::Store;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub struct UserService {
    users: Repository<User>,
    passwords: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, passwords: PasswordHasher) -> Self {
        UserService { users: Repository::new(store), passwords }
    }

    pub fn repository(&self) -> &Repository<User> {
        &self.users
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    /// The requester as currently stored. Tokens outlive role and enabled
    /// changes, so every decision starts here.
    pub async fn principal(&self, actor: &AuthContext) -> Result<Principal, AppError> {
        let record = self
            .users
            .fetch(actor.id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Your account no longer exists".into()))?;
        Principal::from_record(&record)
    }

    async fn target(&self, id: i64) -> Result<(Principal, Record), AppError> {
        let record = self
            .users
            .fetch(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user found with id {}", id)))?;
        Ok((Principal::from_record(&record)?, record))
    }

    /// Hash the password and store a new user with `role`. No policy check.
    pub async fn create_account(&self, body: &Value, role: Role) -> Result<Record, AppError> {
        let mut fields = body_to_map(body)?.clone();
        fields.remove("role");
        let password = match fields.remove("password") {
            Some(Value::String(p)) => p,
            Some(_) => return Err(AppError::Validation("password must be a string".into())),
            None => return Err(AppError::Validation("password is required".into())),
        };
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut record = RequestValidator::for_create(&USERS, &Value::Object(fields))?;
        if let Some(Value::String(email)) = record.get("email_address") {
            if self
                .users
                .fetch_by("email_address", Scalar::Text(email.clone()))
                .await?
                .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "A user with email_address {} already exists",
                    email
                )));
            }
        }

        let hash = self.passwords.hash_blocking(password).await?;
        record.insert("password_hash".into(), Value::String(hash));
        record.insert("role".into(), Value::String(role.to_string()));
        record.entry("enabled").or_insert(Value::Bool(true));
        record.insert("login_attempts".into(), Value::from(0));
        record.insert("last_login_attempt_at".into(), Value::Null);
        record.insert("created_at".into(), Scalar::DateTime(Utc::now()).to_json());

        let created = self.users.insert(record).await?;
        Ok(Projection::all().apply(&USERS, created))
    }

    pub async fn create(&self, actor: &AuthContext, body: &Value, projection: &Projection) -> Result<Record, AppError> {
        let actor = self.principal(actor).await?;
        projection.check(&USERS)?;
        let role = match body_to_map(body)?.get("role") {
            None | Some(Value::Null) => Role::Normal,
            Some(Value::String(s)) => s.parse()?,
            Some(_) => return Err(AppError::Validation("role must be a string".into())),
        };
        policy::can_create(&actor, role).into_result()?;
        let created = self.create_account(body, role).await?;
        Ok(projection.apply(&USERS, created))
    }

    pub async fn list(&self, actor: &AuthContext, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let actor = self.principal(actor).await?;
        let scope = match policy::list_scope(&actor) {
            ListScope::OnlySelf(id) => vec![Predicate::Eq { field: "id", value: Scalar::Int(id) }],
            ListScope::Roles(roles) => vec![Predicate::In {
                field: "role",
                values: roles.iter().map(|r| Scalar::Text(r.to_string())).collect(),
            }],
            ListScope::All => Vec::new(),
        };
        self.users.find_all_with(query, scope).await
    }

    pub async fn read(&self, actor: &AuthContext, id: i64, projection: &Projection) -> Result<Record, AppError> {
        let actor = self.principal(actor).await?;
        projection.check(&USERS)?;
        let (target, record) = self.target(id).await?;
        policy::can_read(&actor, &target).into_result()?;
        Ok(projection.apply(&USERS, record))
    }

    pub async fn update(
        &self,
        actor: &AuthContext,
        id: i64,
        body: &Value,
        projection: &Projection,
    ) -> Result<Record, AppError> {
        let actor = self.principal(actor).await?;
        projection.check(&USERS)?;
        let fields = body_to_map(body)?;
        let patch = UserPatch {
            role: fields.contains_key("role"),
            password: fields.contains_key("password"),
            enabled: fields.contains_key("enabled"),
        };
        let (target, _) = self.target(id).await?;
        policy::can_update(&actor, &target, patch).into_result()?;
        let changes = RequestValidator::for_update(&USERS, body)?;
        let updated = self.users.apply(id, changes).await?;
        Ok(projection.apply(&USERS, updated))
    }

    pub async fn delete(&self, actor: &AuthContext, id: i64, projection: &Projection) -> Result<Record, AppError> {
        let actor = self.principal(actor).await?;
        let (target, _) = self.target(id).await?;
        policy::can_delete(&actor, &target).into_result()?;
        self.users.delete(id, projection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashCost;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()), PasswordHasher::new(HashCost::cheap()))
    }

    async fn account(svc: &UserService, name: &str, role: Role) -> AuthContext {
        let rec = svc
            .create_account(
                &json!({
                    "display_name": name,
                    "email_address": format!("{}@example.com", name.to_lowercase()),
                    "password": "password123",
                }),
                role,
            )
            .await
            .unwrap();
        AuthContext { id: rec["id"].as_i64().unwrap(), display_name: name.into(), role }
    }

    #[tokio::test]
    async fn created_accounts_hide_credentials() {
        let svc = service();
        let tom = account(&svc, "Tom", Role::Normal).await;
        let rec = svc.read(&tom, tom.id, &Projection::all()).await.unwrap();
        assert_eq!(rec["role"], json!("NORMAL"));
        assert_eq!(rec["enabled"], json!(true));
        assert!(rec.get("password_hash").is_none());
        assert!(rec.get("login_attempts").is_none());
        assert!(rec.get("password").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let svc = service();
        account(&svc, "Tom", Role::Normal).await;
        let err = svc
            .create_account(
                &json!({"display_name": "Other", "email_address": "tom@example.com", "password": "password123"}),
                Role::Normal,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_is_scoped_by_role() {
        let svc = service();
        let root = account(&svc, "Root", Role::SuperAdmin).await;
        let admin = account(&svc, "Ada", Role::Admin).await;
        let tom = account(&svc, "Tom", Role::Normal).await;

        let q = ListQuery::default();
        assert_eq!(svc.list(&root, &q).await.unwrap().len(), 3);
        assert_eq!(svc.list(&admin, &q).await.unwrap().len(), 2);
        let mine = svc.list(&tom, &q).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["id"], json!(tom.id));
    }

    #[tokio::test]
    async fn stale_token_role_is_not_trusted() {
        let svc = service();
        let tom = account(&svc, "Tom", Role::Normal).await;
        let forged = AuthContext { role: Role::SuperAdmin, ..tom.clone() };
        let err = svc
            .create(
                &forged,
                &json!({"display_name": "X", "email_address": "x@example.com", "password": "password123"}),
                &Projection::all(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_applies_allowed_fields() {
        let svc = service();
        let admin = account(&svc, "Ada", Role::Admin).await;
        let tom = account(&svc, "Tom", Role::Normal).await;
        let rec = svc
            .update(&admin, tom.id, &json!({"display_name": "Thomas"}), &Projection::only(["display_name"]))
            .await
            .unwrap();
        assert_eq!(Value::Object(rec), json!({"display_name": "Thomas"}));

        let err = svc.update(&admin, tom.id, &json!({"enabled": false}), &Projection::all()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = svc.update(&tom, tom.id, &json!({"role": "ADMIN"}), &Projection::all()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn disabled_admin_is_denied() {
        let svc = service();
        let root = account(&svc, "Root", Role::SuperAdmin).await;
        let admin = account(&svc, "Ada", Role::Admin).await;
        let tom = account(&svc, "Tom", Role::Normal).await;
        svc.update(&root, admin.id, &json!({"enabled": false}), &Projection::all()).await.unwrap();
        let err = svc.delete(&admin, tom.id, &Projection::all()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        svc.delete(&root, tom.id, &Projection::all()).await.unwrap();
    }
}

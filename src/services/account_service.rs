// ============================================================================
// COMPTES : inscription, inscription par OTP, mots de passe
// ============================================================================
//
// Points d'attention:
//   - Unicité de l'email et du téléphone vérifiée par collection (role)
//   - Les comptes staff sont créés avec otp_required = true
//   - Le token de reset est envoyé en clair par email, seul son digest est stocké
//
// ============================================================================

use chrono::{Duration, Utc};
use sea_orm::*;
use validator::Validate;

use super::auth_service::{find_account, identity_of};
use super::mailer::Mailer;
use super::notifications;
use crate::config::Settings;
use crate::error::{ServiceError, ServiceResult};
use crate::models::accounts::{self, Role};
use crate::models::dto::{ChangePasswordRequest, Identity, RegisterRequest, ResetPasswordRequest, validation_messages};
use crate::models::pending_registrations;
use crate::utils::{otp, password};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

pub struct AccountService;

impl AccountService {
    /// Inscription directe dans la collection `role`
    pub async fn register(db: &DatabaseConnection, role: Role, request: RegisterRequest) -> ServiceResult<Identity> {
        let request = validated(request)?;
        ensure_available(db, role, &request.email, &request.phone).await?;

        let password_hash = password::hash_password(&request.password)?;
        let account = insert_account(db, role, &request.name, &request.email, &request.phone, password_hash, false).await?;

        tracing::info!(email = %account.email, role = %role, "account registered");
        Ok(identity_of(&account))
    }

    /// Étape 1 de l'inscription par OTP : met l'inscription en attente et envoie le code
    pub async fn stage_registration(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        settings: &Settings,
        role: Role,
        request: RegisterRequest,
    ) -> ServiceResult<()> {
        let request = validated(request)?;
        ensure_available(db, role, &request.email, &request.phone).await?;

        // une seule inscription en attente par (email, role)
        pending_registrations::Entity::delete_many()
            .filter(pending_registrations::Column::Email.eq(request.email.as_str()))
            .filter(pending_registrations::Column::Role.eq(role))
            .exec(db)
            .await?;

        let code = otp::generate_code();
        let now = Utc::now();
        pending_registrations::ActiveModel {
            role: Set(role),
            name: Set(request.name.clone()),
            email: Set(request.email.clone()),
            phone: Set(request.phone.clone()),
            password_hash: Set(password::hash_password(&request.password)?),
            otp_hash: Set(password::hash_password(&code)?),
            expires_at: Set(now + settings.auth.otp_ttl()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        mailer
            .send(notifications::registration_otp(
                &request.email,
                &request.name,
                &code,
                settings.auth.otp_ttl_minutes,
            ))
            .await?;

        tracing::info!(email = %request.email, role = %role, "registration otp sent");
        Ok(())
    }

    /// Étape 2 : code valide et non expiré -> compte créé, inscription en attente supprimée
    pub async fn confirm_registration(db: &DatabaseConnection, role: Role, email: &str, code: &str) -> ServiceResult<Identity> {
        let email = email.trim().to_lowercase();
        let code = code.trim();
        if email.is_empty() || code.is_empty() {
            return Err(ServiceError::validation("Email and OTP are required"));
        }

        let pending = pending_registrations::Entity::find()
            .filter(pending_registrations::Column::Email.eq(email.as_str()))
            .filter(pending_registrations::Column::Role.eq(role))
            .order_by_desc(pending_registrations::Column::CreatedAt)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::validation("OTP not found or expired"))?;

        if pending.expires_at <= Utc::now() {
            return Err(ServiceError::validation("OTP has expired"));
        }
        if !password::verify_password(code, &pending.otp_hash)? {
            return Err(ServiceError::validation("Invalid OTP"));
        }

        // un compte a pu être créé entre les deux étapes
        ensure_available(db, role, &pending.email, &pending.phone).await?;

        let account = insert_account(
            db,
            role,
            &pending.name,
            &pending.email,
            &pending.phone,
            pending.password_hash.clone(),
            true,
        )
        .await?;
        pending_registrations::Entity::delete_by_id(pending.id).exec(db).await?;

        tracing::info!(email = %account.email, role = %role, "account registered after otp");
        Ok(identity_of(&account))
    }

    /// Émet un token de reset (valide 1 h) et l'envoie sous forme de lien
    pub async fn forgot_password(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        settings: &Settings,
        role: Role,
        email: &str,
    ) -> ServiceResult<()> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ServiceError::validation("Email is required"));
        }

        let account = find_account(db, role, &email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let token = otp::generate_reset_token();
        let mut active: accounts::ActiveModel = account.into();
        active.reset_token_hash = Set(Some(otp::token_digest(&token)));
        active.reset_token_expires_at = Set(Some(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS)));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        let link = format!("{}/reset-password/{}", settings.app_base_url, token);
        mailer.send(notifications::reset_password(&email, &link)).await?;

        tracing::info!(email = %email, role = %role, "password reset link sent");
        Ok(())
    }

    /// Consomme le token de reset (usage unique)
    pub async fn reset_password(db: &DatabaseConnection, token: &str, request: ResetPasswordRequest) -> ServiceResult<()> {
        request
            .validate()
            .map_err(|e| ServiceError::Validation(validation_messages(&e)))?;
        // le lien envoyé ne porte pas le rôle : le rôle du body est seulement vérifié s'il est fourni
        let expected_role = request
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let invalid = || ServiceError::validation("Token is invalid or has expired");
        let account = accounts::Entity::find()
            .filter(accounts::Column::ResetTokenHash.eq(otp::token_digest(token.trim())))
            .one(db)
            .await?
            .ok_or_else(invalid)?;

        if expected_role.is_some_and(|role| role != account.role) {
            return Err(invalid());
        }
        if account.reset_token_expires_at.is_none_or(|expires_at| expires_at <= Utc::now()) {
            return Err(invalid());
        }

        let email = account.email.clone();
        let role = account.role;
        let previous = account.password_hash.clone();
        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(password::hash_password(&request.password)?);
        active.previous_password_hash = Set(Some(previous));
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        tracing::info!(email = %email, role = %role, "password reset");
        Ok(())
    }

    pub async fn change_password(db: &DatabaseConnection, account_id: i32, request: ChangePasswordRequest) -> ServiceResult<()> {
        request
            .validate()
            .map_err(|e| ServiceError::Validation(validation_messages(&e)))?;

        let account = accounts::Entity::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !password::verify_password(&request.current_password, &account.password_hash)? {
            return Err(ServiceError::Unauthorized("Current password is incorrect".to_string()));
        }

        let previous = account.password_hash.clone();
        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(password::hash_password(&request.new_password)?);
        active.previous_password_hash = Set(Some(previous));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        tracing::info!(account_id, "password changed");
        Ok(())
    }
}

fn validated(request: RegisterRequest) -> ServiceResult<RegisterRequest> {
    let request = request.normalized();
    request
        .validate()
        .map_err(|e| ServiceError::Validation(validation_messages(&e)))?;
    Ok(request)
}

/// 409 si l'email ou le téléphone existe déjà dans la collection
async fn ensure_available(db: &DatabaseConnection, role: Role, email: &str, phone: &str) -> ServiceResult<()> {
    let taken = accounts::Entity::find()
        .filter(accounts::Column::Role.eq(role))
        .filter(
            Condition::any()
                .add(accounts::Column::Email.eq(email))
                .add(accounts::Column::Phone.eq(phone)),
        )
        .count(db)
        .await?;

    if taken > 0 {
        tracing::info!(email = %email, role = %role, "registration rejected: email or phone already used");
        return Err(ServiceError::Conflict("Email or phone already used".to_string()));
    }
    Ok(())
}

async fn insert_account(
    db: &DatabaseConnection,
    role: Role,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: String,
    otp_verified: bool,
) -> ServiceResult<accounts::Model> {
    let now = Utc::now();
    Ok(accounts::ActiveModel {
        role: Set(role),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        phone: Set(phone.to_string()),
        password_hash: Set(password_hash),
        previous_password_hash: Set(None),
        otp_hash: Set(None),
        otp_expires_at: Set(None),
        otp_sent_at: Set(None),
        otp_verified: Set(otp_verified),
        otp_required: Set(role.is_staff()),
        reset_token_hash: Set(None),
        reset_token_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

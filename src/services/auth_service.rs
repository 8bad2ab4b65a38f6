// ============================================================================
// AUTHORIZER : mot de passe + OTP par email
// ============================================================================
//
// Workflow de connexion:
//   1. Compte cherché par (role, email), mot de passe vérifié
//   2. otp_required = false -> identité renvoyée directement
//   3. otp_required = true sans code -> un code est émis (hashé, expirant),
//      envoyé par email, et la réponse est OTP_REQUIRED
//   4. Avec code -> OTP_EXPIRED / OTP_INVALID ou succès (champs OTP vidés)
//
// Points d'attention:
//   - Un code encore valide envoyé il y a moins de OTP_RESEND_SECONDS n'est
//     pas renvoyé : OTP_REQUIRED avec retryAfter, aucun email
//   - Compte absent et mauvais mot de passe donnent la même erreur
//
// ============================================================================

use chrono::Utc;
use sea_orm::*;

use super::mailer::Mailer;
use super::notifications;
use crate::config::AuthConfig;
use crate::error::{AuthError, ServiceError, ServiceResult};
use crate::models::accounts::{self, Role};
use crate::models::dto::{Identity, LoginRequest, SendOtpRequest};
use crate::utils::{jwt, otp, password};

pub struct AuthService;

impl AuthService {
    pub async fn authorize(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        config: &AuthConfig,
        request: LoginRequest,
    ) -> ServiceResult<Identity> {
        let role = parse_role(request.role.as_deref())?;
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let account = find_account(db, role, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(&request.password, &account.password_hash)? {
            tracing::info!(email = %email, role = %role, "login rejected: bad password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !account.otp_required {
            return Ok(identity_of(&account));
        }

        match request.otp.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            None => Err(Self::challenge(db, mailer, config, account).await?.into()),
            Some(code) => {
                let account = Self::verify_otp(db, account, code).await?;
                Ok(identity_of(&account))
            }
        }
    }

    /// (Ré)émet un code de connexion et active otp_required sur le compte.
    /// Renvoie le délai d'attente si un code vient déjà d'être envoyé.
    pub async fn send_otp(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        config: &AuthConfig,
        request: SendOtpRequest,
    ) -> ServiceResult<Option<i64>> {
        let role = parse_role(request.role.as_deref())?;
        let email = request.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ServiceError::validation("Email is required"));
        }

        let account = find_account(db, role, &email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let account = if account.otp_required {
            account
        } else {
            let mut active: accounts::ActiveModel = account.into();
            active.otp_required = Set(true);
            active.update(db).await?
        };

        if let Some(retry_after) = resend_wait(config, &account) {
            tracing::info!(email = %email, retry_after, "otp resend suppressed");
            return Ok(Some(retry_after));
        }

        Self::issue_otp(db, mailer, config, account).await?;
        Ok(None)
    }

    /// Jeton de session signé pour une identité authentifiée
    pub fn session_token(identity: &Identity, config: &AuthConfig) -> ServiceResult<String> {
        Ok(jwt::generate_token(identity, &config.jwt_secret, config.session_ttl())?)
    }

    // Décide entre un nouvel envoi et un rappel du délai restant
    async fn challenge(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        config: &AuthConfig,
        account: accounts::Model,
    ) -> ServiceResult<AuthError> {
        if let Some(retry_after) = resend_wait(config, &account) {
            return Ok(AuthError::OtpRequired {
                retry_after: Some(retry_after),
            });
        }

        Self::issue_otp(db, mailer, config, account).await?;
        Ok(AuthError::OtpRequired { retry_after: None })
    }

    async fn issue_otp(
        db: &DatabaseConnection,
        mailer: &dyn Mailer,
        config: &AuthConfig,
        account: accounts::Model,
    ) -> ServiceResult<()> {
        let code = otp::generate_code();
        let now = Utc::now();
        let to = account.email.clone();

        let mut active: accounts::ActiveModel = account.into();
        active.otp_hash = Set(Some(password::hash_password(&code)?));
        active.otp_expires_at = Set(Some(now + config.otp_ttl()));
        active.otp_sent_at = Set(Some(now));
        active.otp_verified = Set(false);
        active.updated_at = Set(now);
        let account = active.update(db).await?;

        if let Err(err) = mailer.send(notifications::login_otp(&to, &code, config.otp_ttl_minutes)).await {
            // code jamais parti : pas de délai de renvoi sur la prochaine tentative
            tracing::warn!(email = %to, error = %err, "login otp not sent");
            let mut active: accounts::ActiveModel = account.into();
            active.otp_hash = Set(None);
            active.otp_expires_at = Set(None);
            active.otp_sent_at = Set(None);
            active.update(db).await?;
            return Err(err.into());
        }

        tracing::info!(email = %to, "login otp sent");
        Ok(())
    }

    async fn verify_otp(db: &DatabaseConnection, account: accounts::Model, code: &str) -> ServiceResult<accounts::Model> {
        let (Some(hash), Some(expires_at)) = (&account.otp_hash, account.otp_expires_at) else {
            return Err(AuthError::OtpInvalid.into());
        };

        if expires_at <= Utc::now() {
            return Err(AuthError::OtpExpired.into());
        }

        if !password::verify_password(code, hash)? {
            tracing::info!(email = %account.email, "login rejected: wrong otp");
            return Err(AuthError::OtpInvalid.into());
        }

        // le code ne peut servir qu'une fois
        let mut active: accounts::ActiveModel = account.into();
        active.otp_hash = Set(None);
        active.otp_expires_at = Set(None);
        active.otp_sent_at = Set(None);
        active.otp_verified = Set(true);
        active.updated_at = Set(Utc::now());
        Ok(active.update(db).await?)
    }
}

/// Secondes avant de pouvoir renvoyer un code encore valide, None si l'envoi est permis
fn resend_wait(config: &AuthConfig, account: &accounts::Model) -> Option<i64> {
    let (Some(_), Some(expires_at), Some(sent_at)) = (&account.otp_hash, account.otp_expires_at, account.otp_sent_at) else {
        return None;
    };

    let now = Utc::now();
    let resend_at = sent_at + config.otp_resend_interval();
    (expires_at > now && resend_at > now).then(|| (resend_at - now).num_seconds().max(1))
}

pub(crate) fn parse_role(raw: Option<&str>) -> ServiceResult<Role> {
    Role::from_optional(raw).map_err(|e| ServiceError::validation(e.to_string()))
}

pub(crate) async fn find_account(db: &DatabaseConnection, role: Role, email: &str) -> ServiceResult<Option<accounts::Model>> {
    Ok(accounts::Entity::find()
        .filter(accounts::Column::Role.eq(role))
        .filter(accounts::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub(crate) fn identity_of(account: &accounts::Model) -> Identity {
    Identity {
        id: account.id,
        email: account.email.clone(),
        name: account.name.clone(),
        role: account.role,
    }
}

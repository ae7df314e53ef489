use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::role::{Capability, Role};
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Decodes a bearer token into the caller. Only access tokens are accepted.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, AppError> {
        let claims = verify_token(token, secret)
            .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Your role is not allowed to do this"))
        }
    }

    /// Employee record the caller acts as
    pub fn employee_id(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or(AppError::Forbidden("No employee profile linked to this account"))
    }
}

pub(crate) fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header encoding".into()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must start with Bearer".into()))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on the protected scope
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(AppError::Unauthorized("Config missing".into()))),
        };

        ready(bearer_token(req).and_then(|token| AuthUser::from_token(token, &config.jwt_secret)))
    }
}

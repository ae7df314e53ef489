use serde::{Deserialize, Serialize};

/// JWT payload as minted by the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Username
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

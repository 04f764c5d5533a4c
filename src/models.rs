use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{role::Role, user::User};

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "budi")]
    pub username: String,
    #[schema(example = "rahasia")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{model::user::User, models::Claims};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_access_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        role: user.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user() -> User {
        User {
            id: "u-1".into(),
            username: "sari".into(),
            email: None,
            name: None,
            password: String::new(),
            role: Role::Kaprog,
            department_id: None,
            department_name: None,
            position: None,
            is_protected: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_carries_identity_and_role() {
        let token = generate_access_token(&user(), "secret", 900).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.username, "sari");
        assert_eq!(claims.role, Role::Kaprog);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&user(), "secret", 900).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}

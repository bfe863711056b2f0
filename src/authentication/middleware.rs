use std::convert::Infallible;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::{
    constants::{MAX_FORM_BYTES, SESSION_COOKIE},
    form::{Form, FormData},
};

use super::jwt::{JwtKey, SessionData};

#[derive(Debug)]
struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Rejects requests without a valid session cookie.
pub fn with_session(
    key: JwtKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::<String>(SESSION_COOKIE).and_then(move |session: String| {
        let key = key.clone();
        async move {
            match key.verify(&session) {
                Ok(data) => Ok(SessionData::from(data)),
                Err(_) => Err(warp::reject::custom(Unauthorized)),
            }
        }
    })
}

/// Anonymous requests and invalid sessions both yield `None`.
pub fn with_possible_session(
    key: JwtKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session
            .and_then(|session| key.verify(&session).ok())
            .map(SessionData::from)
    })
}

pub fn with_recipe_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_FORM_BYTES)
        .and(warp::body::json::<FormData>())
        .map(Form::from_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtSessionData;

    fn token(key: &JwtKey) -> String {
        let Ok(token) = key.sign(&JwtSessionData::new(5, "cook".to_string())) else {
            panic!("failed to sign");
        };
        token
    }

    #[tokio::test]
    async fn session_filter_reads_cookie() {
        let key = JwtKey::new(b"secret").unwrap();
        let cookie = format!("{SESSION_COOKIE}={}", token(&key));

        let session = warp::test::request()
            .header("cookie", cookie)
            .filter(&with_session(key.clone()))
            .await
            .unwrap();
        assert_eq!(session.user_id, 5);

        let missing = warp::test::request().filter(&with_session(key)).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn possible_session_allows_anonymous() {
        let key = JwtKey::new(b"secret").unwrap();

        let anonymous = warp::test::request()
            .filter(&with_possible_session(key.clone()))
            .await
            .unwrap();
        assert!(anonymous.is_none());

        let invalid = warp::test::request()
            .header("cookie", format!("{SESSION_COOKIE}=nope"))
            .filter(&with_possible_session(key.clone()))
            .await
            .unwrap();
        assert!(invalid.is_none());

        let viewer = warp::test::request()
            .header("cookie", format!("{SESSION_COOKIE}={}", token(&key)))
            .filter(&with_possible_session(key))
            .await
            .unwrap();
        assert_eq!(viewer.map(|v| v.user_id), Some(5));
    }

    #[tokio::test]
    async fn form_filter_parses_json_body() {
        let form = warp::test::request()
            .method("POST")
            .json(&serde_json::json!({"name": "Tea", "cooking_time": 5}))
            .filter(&with_recipe_form())
            .await
            .unwrap();

        assert_eq!(form.get_str("name").unwrap(), "Tea");
        assert_eq!(form.get_integer("cooking_time").unwrap(), 5);
    }
}

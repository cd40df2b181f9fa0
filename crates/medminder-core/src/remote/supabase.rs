//! Supabase client: GoTrue auth (`/auth/v1`) and PostgREST tables (`/rest/v1`).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::sync::Mutex;
use url::Url;

use super::HealthBackend;
use crate::error::RemoteError;
use crate::model::{Appointment, AppointmentStatus, Medicine, Session, User, UserProfile};

const MEDICINES: &str = "medicines";
const APPOINTMENTS: &str = "appointments";
const PROFILES: &str = "profiles";

const RETURN_ROWS: &str = "return=representation";

pub struct SupabaseClient {
    http: Client,
    base: Url,
    anon_key: String,
    access_token: Mutex<Option<String>>,
}

impl SupabaseClient {
    /// `base_url` is the project URL, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, RemoteError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            anon_key: anon_key.to_string(),
            access_token: Mutex::new(None),
        })
    }

    /// Resume a session from a stored access token.
    pub fn with_access_token(self, token: Option<String>) -> Self {
        self.set_access_token(token);
        self
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(self.base.join(path)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        Ok(self
            .http
            .request(method, self.endpoint(path)?)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer))
    }

    fn table(&self, method: Method, table: &str) -> Result<RequestBuilder, RemoteError> {
        self.request(method, &format!("rest/v1/{table}"))
    }

    /// Turn a non-success status into [`RemoteError::Status`] with the
    /// server's message.
    async fn check(resp: Response) -> Result<Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|k| v[*k].as_str().map(str::to_string))
            })
            .unwrap_or(body);
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = Self::check(req.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Write `body` and return the first row PostgREST echoes back.
    ///
    /// The request must already ask for the rows via a `Prefer` header.
    async fn write_one<B, T>(
        req: RequestBuilder,
        body: &B,
        entity: &'static str,
        id: &str,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let rows: Vec<T> = Self::fetch(req.json(body)).await?;
        rows.into_iter().next().ok_or_else(|| RemoteError::NotFound {
            entity,
            id: id.to_string(),
        })
    }

    fn parse_session(value: serde_json::Value) -> Result<Session, RemoteError> {
        if value.get("access_token").and_then(|t| t.as_str()).is_none() {
            return Err(RemoteError::Decode(
                "no session returned (email confirmation may be required)".into(),
            ));
        }
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HealthBackend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let req = self
            .request(Method::POST, "auth/v1/token")?
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let session = Self::parse_session(Self::fetch(req).await?)?;
        self.set_access_token(Some(session.access_token.clone()));
        tracing::info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let req = self
            .request(Method::POST, "auth/v1/signup")?
            .json(&json!({ "email": email, "password": password }));
        let session = Self::parse_session(Self::fetch(req).await?)?;
        self.set_access_token(Some(session.access_token.clone()));
        tracing::info!(user_id = %session.user.id, "signed up");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if self.access_token().is_none() {
            return Ok(());
        }
        let result = self.request(Method::POST, "auth/v1/logout")?.send().await;
        // The local session is gone even if the server call failed.
        self.set_access_token(None);
        Self::check(result?).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, RemoteError> {
        if self.access_token().is_none() {
            return Ok(None);
        }
        let resp = self.request(Method::GET, "auth/v1/user")?.send().await?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!("stored session rejected");
            return Ok(None);
        }
        let user = Self::check(resp)
            .await?
            .json::<User>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(user))
    }

    async fn get_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError> {
        let req = self.table(Method::GET, MEDICINES)?.query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
        ]);
        Self::fetch(req).await
    }

    async fn get_active_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError> {
        let req = self.table(Method::GET, MEDICINES)?.query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("is_active", "eq.true".to_string()),
        ]);
        Self::fetch(req).await
    }

    async fn add_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError> {
        let req = self.table(Method::POST, MEDICINES)?.header("Prefer", RETURN_ROWS);
        Self::write_one(req, medicine, "medicine", &medicine.id).await
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError> {
        let req = self
            .table(Method::PATCH, MEDICINES)?
            .header("Prefer", RETURN_ROWS)
            .query(&[("id", format!("eq.{}", medicine.id))]);
        Self::write_one(req, medicine, "medicine", &medicine.id).await
    }

    async fn delete_medicine(&self, medicine_id: &str) -> Result<(), RemoteError> {
        let req = self
            .table(Method::DELETE, MEDICINES)?
            .query(&[("id", format!("eq.{medicine_id}"))]);
        Self::check(req.send().await?).await?;
        Ok(())
    }

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, RemoteError> {
        let req = self.table(Method::GET, APPOINTMENTS)?.query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "date.asc,time.asc".to_string()),
        ]);
        Self::fetch(req).await
    }

    async fn get_upcoming_appointments(
        &self,
        user_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, RemoteError> {
        let req = self.table(Method::GET, APPOINTMENTS)?.query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("status", format!("eq.{}", AppointmentStatus::Scheduled)),
            ("date", format!("gte.{}", from.format("%Y-%m-%d"))),
            ("order", "date.asc,time.asc".to_string()),
        ]);
        Self::fetch(req).await
    }

    async fn add_appointment(&self, appointment: &Appointment) -> Result<Appointment, RemoteError> {
        let req = self.table(Method::POST, APPOINTMENTS)?.header("Prefer", RETURN_ROWS);
        Self::write_one(req, appointment, "appointment", &appointment.id).await
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, RemoteError> {
        let req = self
            .table(Method::PATCH, APPOINTMENTS)?
            .header("Prefer", RETURN_ROWS)
            .query(&[("id", format!("eq.{}", appointment.id))]);
        Self::write_one(req, appointment, "appointment", &appointment.id).await
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, RemoteError> {
        let req = self
            .table(Method::PATCH, APPOINTMENTS)?
            .header("Prefer", RETURN_ROWS)
            .query(&[("id", format!("eq.{appointment_id}"))]);
        Self::write_one(req, &json!({ "status": status }), "appointment", appointment_id).await
    }

    async fn delete_appointment(&self, appointment_id: &str) -> Result<(), RemoteError> {
        let req = self
            .table(Method::DELETE, APPOINTMENTS)?
            .query(&[("id", format!("eq.{appointment_id}"))]);
        Self::check(req.send().await?).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError> {
        let req = self
            .table(Method::GET, PROFILES)?
            .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))]);
        let rows: Vec<UserProfile> = Self::fetch(req).await?;
        rows.into_iter().next().ok_or_else(|| RemoteError::NotFound {
            entity: "profile",
            id: user_id.to_string(),
        })
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<UserProfile, RemoteError> {
        let req = self
            .table(Method::POST, PROFILES)?
            .header("Prefer", format!("resolution=merge-duplicates,{RETURN_ROWS}"));
        Self::write_one(req, profile, "profile", &profile.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn medicine_json() -> serde_json::Value {
        json!([{
            "id": "m1", "user_id": "u1", "name": "Aspirin", "dosage": "100mg",
            "frequency": "12", "times": ["08:00", "20:00"], "is_active": true,
            "start_date": "2024-01-01", "end_date": null, "notes": null
        }])
    }

    #[tokio::test]
    async fn sign_in_stores_access_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .match_header("apikey", "anon")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": "tok",
                    "refresh_token": "ref",
                    "user": {"id": "u1", "email": "a@b.c"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon").unwrap();
        let session = client.sign_in("a@b.c", "pw").await.unwrap();
        mock.assert_async().await;
        assert_eq!(session.user.id, "u1");
        assert_eq!(client.access_token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn sign_in_failure_carries_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon").unwrap();
        match client.sign_in("a@b.c", "bad").await {
            Err(RemoteError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(client.access_token().is_none());
    }

    #[tokio::test]
    async fn active_medicines_query_filters_by_user_and_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/medicines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "eq.u1".into()),
                Matcher::UrlEncoded("is_active".into(), "eq.true".into()),
            ]))
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(medicine_json().to_string())
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon")
            .unwrap()
            .with_access_token(Some("tok".into()));
        let meds = client.get_active_medicines("u1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].times, vec!["08:00", "20:00"]);
    }

    #[tokio::test]
    async fn upcoming_appointments_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/appointments")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "eq.scheduled".into()),
                Matcher::UrlEncoded("date".into(), "gte.2024-01-01".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon").unwrap();
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(client.get_upcoming_appointments("u1", from).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_with_no_rows_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/appointments")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.a9".into()))
            .match_header("prefer", "return=representation")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = SupabaseClient::new(&server.url(), "anon").unwrap();
        let err = client
            .update_appointment_status("a9", AppointmentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { entity: "appointment", .. }));
    }

    #[tokio::test]
    async fn current_user_without_token_skips_network() {
        let client = SupabaseClient::new("http://127.0.0.1:9", "anon").unwrap();
        assert!(client.current_user().await.unwrap().is_none());
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = SupabaseClient::new("https://example.supabase.co/project", "k").unwrap();
        assert_eq!(
            client.endpoint("rest/v1/medicines").unwrap().as_str(),
            "https://example.supabase.co/project/rest/v1/medicines"
        );
    }
}

//! Jenkins REST API client.
//!
//! Authenticates with HTTP basic auth (`username:api-token`). Jobs nested in
//! folders are addressed as `job/<folder>/job/<name>`; every path segment is
//! percent-encoded so names with spaces work.

use std::time::Duration;

use jenkins_relay_core::{BuildParameters, JobPath, QueueId};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::error::JenkinsError;
use super::types::{Artifact, BuildRecord, JobInfo, PluginInfo, PluginList, QueueItem};

/// Request timeout for Jenkins calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt kept in an error.
const MAX_ERROR_BODY: usize = 200;

/// Build selector used when the user doesn't name a build.
pub const LAST_BUILD: &str = "lastBuild";

/// Create the HTTP client shared by all Jenkins clients.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("jenkins-relay/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Jenkins client bound to one user's credentials.
#[derive(Clone)]
pub struct JenkinsClient {
    http: Client,
    base_url: String,
    username: String,
    token: SecretString,
}

impl std::fmt::Debug for JenkinsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl JenkinsClient {
    /// Create a client for `base_url` authenticating as `username`.
    #[must_use]
    pub fn new(http: Client, base_url: &Url, username: impl Into<String>, token: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            username: username.into(),
            token,
        }
    }

    /// Jenkins base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Jenkins username the client authenticates as.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// URL of a job, e.g. `{base}/job/folder/job/my%20job`.
    #[must_use]
    pub fn job_url(&self, job: &JobPath) -> String {
        let encoded = job
            .to_server_path()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/job/{encoded}", self.base_url)
    }

    /// URL of a build; `selector` is a build number or a permalink such as
    /// `lastBuild`.
    #[must_use]
    pub fn build_url(&self, job: &JobPath, selector: &str) -> String {
        format!("{}/{}", self.job_url(job), urlencoding::encode(selector))
    }

    /// Browser URL of a build's test report.
    #[must_use]
    pub fn test_report_url(&self, job: &JobPath, number: u64) -> String {
        format!("{}/testReport/", self.build_url(job, &number.to_string()))
    }

    /// Check that the credentials are accepted.
    ///
    /// # Errors
    ///
    /// Returns `JenkinsError::Unauthorized` if Jenkins rejects them.
    #[instrument(skip(self), fields(username = %self.username))]
    pub async fn verify(&self) -> Result<(), JenkinsError> {
        let url = format!("{}/api/json", self.base_url);
        Self::send("verify credentials", self.get(&url)).await?;
        Ok(())
    }

    /// Fetch job details, including declared parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the job doesn't exist or the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn job(&self, job: &JobPath) -> Result<JobInfo, JenkinsError> {
        let url = format!("{}/api/json", self.job_url(job));
        self.get_json("get job", &url).await
    }

    /// Fetch a build by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the build doesn't exist or the request fails.
    pub async fn build(&self, job: &JobPath, number: u64) -> Result<BuildRecord, JenkinsError> {
        self.build_by_selector(job, Some(&number.to_string())).await
    }

    /// Fetch a build by number or permalink; `None` means the last build.
    ///
    /// # Errors
    ///
    /// Returns an error if the build doesn't exist or the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn build_by_selector(
        &self,
        job: &JobPath,
        selector: Option<&str>,
    ) -> Result<BuildRecord, JenkinsError> {
        let url = format!(
            "{}/api/json",
            self.build_url(job, selector.unwrap_or(LAST_BUILD))
        );
        self.get_json("get build", &url).await
    }

    /// Queue a build, with parameters if any are given.
    ///
    /// Returns the queue item Jenkins created, or `None` when Jenkins didn't
    /// report one (an identical build is usually already waiting).
    ///
    /// # Errors
    ///
    /// Returns an error if Jenkins rejects the request.
    #[instrument(skip(self, parameters), fields(job = %job))]
    pub async fn trigger_build(
        &self,
        job: &JobPath,
        parameters: Option<&BuildParameters>,
    ) -> Result<Option<QueueId>, JenkinsError> {
        let request = match parameters.filter(|p| !p.is_empty()) {
            Some(parameters) => {
                let form: Vec<(&str, &str)> = parameters.iter().collect();
                self.post(&format!("{}/buildWithParameters", self.job_url(job)))
                    .form(&form)
            }
            None => self.post(&format!("{}/build", self.job_url(job))),
        };

        let response = Self::send("trigger build", request).await?;
        let queue_id = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(queue_id_from_location);

        debug!(queue_id = ?queue_id.map(|id| id.as_u64()), "Build requested");
        Ok(queue_id)
    }

    /// Fetch a build queue item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item doesn't exist or the request fails.
    #[instrument(skip(self), fields(queue_id = %id))]
    pub async fn queue_item(&self, id: QueueId) -> Result<QueueItem, JenkinsError> {
        let url = format!("{}/queue/item/{id}/api/json", self.base_url);
        self.get_json("get queue item", &url).await
    }

    /// Enable a disabled job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn enable_job(&self, job: &JobPath) -> Result<(), JenkinsError> {
        let url = format!("{}/enable", self.job_url(job));
        Self::send("enable job", self.post(&url)).await?;
        Ok(())
    }

    /// Disable a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn disable_job(&self, job: &JobPath) -> Result<(), JenkinsError> {
        let url = format!("{}/disable", self.job_url(job));
        Self::send("disable job", self.post(&url)).await?;
        Ok(())
    }

    /// Delete a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn delete_job(&self, job: &JobPath) -> Result<(), JenkinsError> {
        let url = format!("{}/doDelete", self.job_url(job));
        Self::send("delete job", self.post(&url)).await?;
        Ok(())
    }

    /// Abort a running build.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn abort_build(&self, job: &JobPath, number: u64) -> Result<(), JenkinsError> {
        let url = format!("{}/stop", self.build_url(job, &number.to_string()));
        Self::send("abort build", self.post(&url)).await?;
        Ok(())
    }

    /// Fetch the console log of a build.
    ///
    /// # Errors
    ///
    /// Returns an error if the build doesn't exist or the request fails.
    #[instrument(skip(self), fields(job = %job))]
    pub async fn console_text(&self, job: &JobPath, number: u64) -> Result<String, JenkinsError> {
        let url = format!("{}/consoleText", self.build_url(job, &number.to_string()));
        let response = Self::send("get console log", self.get(&url)).await?;
        response.text().await.map_err(|e| JenkinsError::Response {
            operation: "get console log",
            message: e.to_string(),
        })
    }

    /// Download an archived artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact doesn't exist or the request fails.
    #[instrument(skip(self, artifact), fields(job = %job, artifact = %artifact.file_name))]
    pub async fn download_artifact(
        &self,
        job: &JobPath,
        number: u64,
        artifact: &Artifact,
    ) -> Result<Vec<u8>, JenkinsError> {
        let path = artifact
            .relative_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/artifact/{path}",
            self.build_url(job, &number.to_string())
        );

        let response = Self::send("download artifact", self.get(&url)).await?;
        let bytes = response.bytes().await.map_err(|e| JenkinsError::Response {
            operation: "download artifact",
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Check whether a build published a test report.
    ///
    /// # Errors
    ///
    /// Returns an error for failures other than "not found".
    #[instrument(skip(self), fields(job = %job))]
    pub async fn has_test_report(&self, job: &JobPath, number: u64) -> Result<bool, JenkinsError> {
        let url = format!(
            "{}/testReport/api/json",
            self.build_url(job, &number.to_string())
        );
        match Self::send("get test report", self.get(&url)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List installed plugins.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn plugins(&self) -> Result<Vec<PluginInfo>, JenkinsError> {
        let url = format!("{}/pluginManager/api/json?depth=1", self.base_url);
        let list: PluginList = self.get_json("list plugins", &url).await?;
        Ok(list.plugins)
    }

    /// Restart Jenkins once running builds have finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn safe_restart(&self) -> Result<(), JenkinsError> {
        let url = format!("{}/safeRestart", self.base_url);
        Self::send("safe restart", self.post(&url)).await?;
        Ok(())
    }

    /// Create a job from a `config.xml` document.
    ///
    /// Nested jobs are created inside their parent folder, which must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if Jenkins rejects the config or the job exists.
    #[instrument(skip(self, config_xml), fields(job = %job))]
    pub async fn create_job(&self, job: &JobPath, config_xml: String) -> Result<(), JenkinsError> {
        let parent_url = job
            .parent()
            .map_or_else(|| self.base_url.clone(), |parent| self.job_url(&parent));

        let request = self
            .post(&format!("{parent_url}/createItem"))
            .query(&[("name", job.name())])
            .header(CONTENT_TYPE, "application/xml")
            .body(config_xml);
        Self::send("create job", request).await?;
        Ok(())
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.username, Some(self.token.expose_secret()))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .basic_auth(&self.username, Some(self.token.expose_secret()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<T, JenkinsError> {
        let response = Self::send(operation, self.get(url)).await?;
        response.json().await.map_err(|e| JenkinsError::Response {
            operation,
            message: e.to_string(),
        })
    }

    /// Send a request and map non-success statuses to errors.
    async fn send(
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, JenkinsError> {
        let response = request.send().await.map_err(|e| JenkinsError::Request {
            operation,
            message: e.without_url().to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(JenkinsError::NotFound { operation }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(JenkinsError::Unauthorized {
                operation,
                status: status.as_u16(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(JenkinsError::Status {
                    operation,
                    status: status.as_u16(),
                    body: body.chars().take(MAX_ERROR_BODY).collect(),
                })
            }
        }
    }
}

/// Extract the queue item id from a `Location` header such as
/// `https://jenkins/queue/item/42/`.
fn queue_id_from_location(location: &str) -> Option<QueueId> {
    let mut segments = location.trim_end_matches('/').rsplit('/');
    let id = segments.next()?.parse().ok()?;
    match (segments.next(), segments.next()) {
        (Some("item"), Some("queue")) => QueueId::new(id),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> JenkinsClient {
        JenkinsClient::new(
            Client::new(),
            &Url::parse("https://ci.example.org/").unwrap(),
            "alice",
            SecretString::from("api-token"),
        )
    }

    #[test]
    fn test_job_url_plain() {
        let job = JobPath::parse("jobname").unwrap();
        assert_eq!(client().job_url(&job), "https://ci.example.org/job/jobname");
    }

    #[test]
    fn test_job_url_folders_with_spaces() {
        let job = JobPath::parse("folder with spaces/and job").unwrap();
        assert_eq!(
            client().job_url(&job),
            "https://ci.example.org/job/folder%20with%20spaces/job/and%20job"
        );
    }

    #[test]
    fn test_build_and_report_urls() {
        let job = JobPath::parse("folder/jobname").unwrap();
        let client = client();
        assert_eq!(
            client.build_url(&job, LAST_BUILD),
            "https://ci.example.org/job/folder/job/jobname/lastBuild"
        );
        assert_eq!(
            client.test_report_url(&job, 22),
            "https://ci.example.org/job/folder/job/jobname/22/testReport/"
        );
    }

    #[test]
    fn test_queue_id_from_location() {
        assert_eq!(
            queue_id_from_location("https://ci.example.org/queue/item/42/").map(|id| id.as_u64()),
            Some(42)
        );
        assert_eq!(
            queue_id_from_location("https://ci.example.org/queue/item/42").map(|id| id.as_u64()),
            Some(42)
        );
        assert!(queue_id_from_location("https://ci.example.org/queue/item/0/").is_none());
        assert!(queue_id_from_location("https://ci.example.org/job/a/").is_none());
        assert!(queue_id_from_location("").is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug_output = format!("{:?}", client());
        assert!(debug_output.contains("alice"));
        assert!(!debug_output.contains("api-token"));
    }
}

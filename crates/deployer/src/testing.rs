use std::{
    collections::{HashMap, VecDeque},
    fs,
    net::SocketAddr,
    path::Path,
    sync::Mutex,
    time::SystemTime,
};

use common::beanstalk::{
    ApplicationVersion, ApplicationVersionRequest, EnvironmentHealth, EnvironmentRequest,
    LaunchedEnvironment,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{
    prompt::{Prompt, PromptError},
    provider::{Provider, ProviderError},
    session::Session,
};

/// Session with a known name, bucket and content hash.
pub(crate) fn test_session() -> Session {
    Session {
        region: String::from("eu-west-1"),
        app_name: String::from("app"),
        bucket: String::from(ScriptedProvider::BUCKET),
        content_hash: String::from("abcd"),
        archive_name: String::from("abcd.zip"),
        endpoint: None,
    }
}

/// Serve a single HTTP response with the provided body on a random local port.
pub(crate) async fn serve_once(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("unable to bind listener");
    let address = listener.local_addr().expect("unable to get local address");

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("unable to accept");

        let mut request = [0; 1024];
        let _ = stream.read(&mut request).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );

        stream
            .write_all(response.as_bytes())
            .await
            .expect("unable to write response");
    });

    address
}

/// In-memory [`Provider`] with scripted responses.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    state: Mutex<State>,
}

/// Scripted responses and recorded requests.
#[derive(Default)]
struct State {
    cname_answers: VecDeque<bool>,
    cname_error: Option<ProviderError>,
    checked_cnames: Vec<String>,
    without_bucket: bool,
    losing_uploads: bool,
    objects: HashMap<(String, String), Vec<u8>>,
    version: Option<ApplicationVersion>,
    version_requests: Vec<ApplicationVersionRequest>,
    environment: Option<LaunchedEnvironment>,
    environment_requests: Vec<EnvironmentRequest>,
    health: VecDeque<Result<Option<EnvironmentHealth>, ProviderError>>,
    health_requests: usize,
}

impl ScriptedProvider {
    pub(crate) const BUCKET: &'static str = "elasticbeanstalk-eu-west-1-000000000000";

    pub(crate) const CNAME: &'static str = "app.eu-west-1.elasticbeanstalk.invalid";

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("state lock is poisoned")
    }

    /// Answer CNAME availability checks in order. Once exhausted, every name is available.
    pub(crate) fn with_cname_answers<I: IntoIterator<Item = bool>>(self, answers: I) -> Self {
        self.state().cname_answers.extend(answers);
        self
    }

    pub(crate) fn with_cname_error(self, err: ProviderError) -> Self {
        self.state().cname_error = Some(err);
        self
    }

    pub(crate) fn without_bucket(self) -> Self {
        self.state().without_bucket = true;
        self
    }

    /// Accept uploads without storing them.
    pub(crate) fn losing_uploads(self) -> Self {
        self.state().losing_uploads = true;
        self
    }

    /// Respond with the provided version instead of echoing the request.
    pub(crate) fn with_version(self, version: ApplicationVersion) -> Self {
        self.state().version = Some(version);
        self
    }

    pub(crate) fn with_environment(self, environment: LaunchedEnvironment) -> Self {
        self.state().environment = Some(environment);
        self
    }

    /// Answer health requests in order. Once exhausted, the environment keeps launching.
    pub(crate) fn with_health<I>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Option<EnvironmentHealth>, ProviderError>>,
    {
        self.state().health.extend(responses);
        self
    }

    pub(crate) fn checked_cnames(&self) -> Vec<String> {
        self.state().checked_cnames.clone()
    }

    pub(crate) fn objects(&self) -> HashMap<(String, String), Vec<u8>> {
        self.state().objects.clone()
    }

    pub(crate) fn version_requests(&self) -> Vec<ApplicationVersionRequest> {
        self.state().version_requests.clone()
    }

    pub(crate) fn environment_requests(&self) -> Vec<EnvironmentRequest> {
        self.state().environment_requests.clone()
    }

    pub(crate) fn health_requests(&self) -> usize {
        self.state().health_requests
    }
}

impl Provider for ScriptedProvider {
    async fn cname_available(&self, cname_prefix: &str) -> Result<bool, ProviderError> {
        let mut state = self.state();

        if let Some(err) = state.cname_error.take() {
            return Err(err);
        }

        state.checked_cnames.push(cname_prefix.to_owned());

        Ok(state.cname_answers.pop_front().unwrap_or(true))
    }

    async fn storage_location(&self) -> Result<Option<String>, ProviderError> {
        Ok((!self.state().without_bucket).then(|| String::from(Self::BUCKET)))
    }

    async fn put_object(&self, bucket: &str, key: &str, path: &Path) -> Result<(), ProviderError> {
        let contents = fs::read(path).expect("unable to read uploaded file");
        let mut state = self.state();

        if !state.losing_uploads {
            state
                .objects
                .insert((bucket.to_owned(), key.to_owned()), contents);
        }

        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError> {
        Ok(self
            .state()
            .objects
            .contains_key(&(bucket.to_owned(), key.to_owned())))
    }

    async fn create_application_version(
        &self,
        request: &ApplicationVersionRequest,
    ) -> Result<ApplicationVersion, ProviderError> {
        let mut state = self.state();

        state.version_requests.push(request.clone());

        Ok(state.version.clone().unwrap_or_else(|| ApplicationVersion {
            application_name: Some(request.application_name.clone()),
            version_label: Some(request.version_label.clone()),
        }))
    }

    async fn create_environment(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<LaunchedEnvironment, ProviderError> {
        let mut state = self.state();

        state.environment_requests.push(request.clone());

        Ok(state
            .environment
            .clone()
            .unwrap_or_else(|| LaunchedEnvironment {
                status: Some(String::from("Launching")),
                cname: Some(String::from(Self::CNAME)),
            }))
    }

    async fn environment_health(
        &self,
        _environment_name: &str,
    ) -> Result<Option<EnvironmentHealth>, ProviderError> {
        let mut state = self.state();

        state.health_requests += 1;

        state.health.pop_front().unwrap_or_else(|| {
            Ok(Some(EnvironmentHealth {
                status: Some(String::from("Launching")),
                health: Some(String::from("Pending")),
            }))
        })
    }

    async fn environment_events(
        &self,
        environment_name: &str,
        _since: SystemTime,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(vec![format!("createEnvironment is starting for {environment_name}")])
    }
}

/// [`Prompt`] with predefined answers.
pub(crate) struct ScriptedPrompt {
    answers: VecDeque<String>,
    questions: Vec<String>,
}

impl ScriptedPrompt {
    pub(crate) fn new<'a, I: IntoIterator<Item = &'a str>>(answers: I) -> Self {
        Self {
            answers: answers.into_iter().map(str::to_owned).collect(),
            questions: Vec::new(),
        }
    }

    /// Questions asked so far.
    pub(crate) fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        self.questions.push(question.to_owned());

        Ok(self
            .answers
            .pop_front()
            .expect("prompt ran out of scripted answers"))
    }
}

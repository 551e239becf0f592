//! HTTP client for the coach service and the worker thread that bridges it
//! to the engine's channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender};
use serde::{de::DeserializeOwned, Serialize};

use crate::coach::types::{CoachError, FeedbackRequest, FeedbackResponse};
use crate::workout::types::Workout;

/// Default coach API base URL.
const DEFAULT_API_URL: &str = "https://api.veloce.training/v1";

/// Coach API client.
pub struct CoachClient {
    /// HTTP client
    http: reqwest::Client,
    /// Base URL for the API
    base_url: String,
    /// API key for authentication
    api_key: String,
    /// Whether the service was reachable on the last call
    online: AtomicBool,
}

impl CoachClient {
    /// Create a new coach client.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_URL.to_string())
    }

    /// Create a new coach client with a custom base URL.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url,
            api_key,
            online: AtomicBool::new(true),
        }
    }

    /// Whether the service was reachable on the last call.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Request mid-interval feedback.
    ///
    /// The response is stamped with the request's session id so the engine's
    /// stale-session guard works even against servers that omit it.
    pub async fn request_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, CoachError> {
        let mut response: FeedbackResponse = self.post("/feedback", request).await?;
        response.session = request.session;
        Ok(response)
    }

    /// Generate a workout from a free-text prompt.
    pub async fn generate_workout(&self, prompt: &str) -> Result<Workout, CoachError> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            prompt: &'a str,
        }

        let workout: Workout = self
            .post("/workouts/generate", &GenerateRequest { prompt })
            .await?;

        if workout.intervals.is_empty() {
            return Err(CoachError::ApiError(
                "Generated workout has no intervals".to_string(),
            ));
        }

        Ok(workout)
    }

    async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R, CoachError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    self.set_online(false);
                    CoachError::Offline
                } else {
                    CoachError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            self.set_online(true);
            let api_response: ApiResponse<R> = response
                .json()
                .await
                .map_err(|e| CoachError::SerializationError(e.to_string()))?;

            if api_response.success {
                api_response.data.ok_or_else(|| {
                    CoachError::ApiError("API returned success but no data".to_string())
                })
            } else {
                let error = api_response.error.unwrap_or_default();
                Err(CoachError::ApiError(error.message))
            }
        } else if status.is_server_error() {
            self.set_online(false);
            Err(CoachError::Offline)
        } else {
            Err(CoachError::ApiError(format!(
                "API returned status {}",
                status
            )))
        }
    }
}

/// Bridge the engine's fire-and-forget channels to the async client.
///
/// Runs on a dedicated thread so the engine never waits on HTTP. Failed
/// requests are logged and dropped; there is no retry, the next scheduled
/// feedback request supersedes them. The thread exits when the request
/// channel closes.
pub fn spawn_worker(
    client: CoachClient,
    request_rx: Receiver<FeedbackRequest>,
    response_tx: Sender<FeedbackResponse>,
    runtime: tokio::runtime::Handle,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while let Ok(request) = request_rx.recv() {
            match runtime.block_on(client.request_feedback(&request)) {
                Ok(response) => {
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Coach feedback request failed: {}", e),
            }
        }
        tracing::debug!("Coach worker stopped");
    })
}

/// API response wrapper.
#[derive(Debug, serde::Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<ApiError>,
}

/// API error details.
#[derive(Debug, Default, serde::Deserialize)]
#[allow(dead_code)]
struct ApiError {
    code: String,
    message: String,
}

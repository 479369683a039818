//! HTTP route handlers for the grading API.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use grader::core::types::{CheckOutcome, ValidationResult};
use grader::io::achievements::{Achievement, UnlockOutcome, UnlockedAchievement};
use grader::io::progress::{LessonProgress, ProgressLedger};
use grader::io::shares::SharedProject;
use grader::submit::{Grader, SubmissionError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/code/run", post(run_code))
        .route("/code/validate", post(validate_code))
        .route("/courses", get(list_courses))
        .route("/courses/{course_id}/progress", get(course_progress))
        .route("/courses/{course_id}/complete", post(complete_course))
        .route("/courses/user/{user_id}/progress", get(user_progress))
        .route("/achievements", get(list_achievements))
        .route("/achievements/user", get(user_achievements))
        .route("/achievements/{achievement_id}/unlock", post(unlock_achievement))
        .route("/projects/share", post(share_project))
        .route("/projects/share/{share_token}", get(shared_project))
        .route("/projects/user/projects", get(user_projects))
}

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!(err = %err, "{context}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Missing required parameters".to_string(),
            details: Some(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = Value::String(details);
        }
        (self.status, Json(body)).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    success: bool,
    output: String,
    errors: String,
}

/// POST /api/code/run - execute without scoring. No authentication.
async fn run_code(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let grader = state.grader.clone();
    let code = request.code.unwrap_or_default();
    let trace = tokio::task::spawn_blocking(move || grader.run(&code))
        .await
        .map_err(|err| ApiError::internal("Code run failed", err))??;

    Ok(Json(RunResponse {
        success: trace.succeeded,
        output: trace.output_text(),
        errors: trace.error_text(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "courseId")]
    lesson_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateResponse {
    valid: bool,
    output: String,
    errors: String,
    course_name: Option<String>,
    tests: Vec<CheckOutcome>,
    passed: usize,
    total: usize,
    achievement_id: Option<String>,
    achievement_name: Option<String>,
    message: String,
}

impl From<ValidationResult> for ValidateResponse {
    fn from(result: ValidationResult) -> Self {
        let message = summary_message(&result);
        Self {
            valid: result.overall_valid,
            output: result.output_text,
            errors: result.error_text,
            course_name: result.lesson_name,
            tests: result.checks,
            passed: result.passed_count,
            total: result.total_count,
            achievement_id: result.achievement_id,
            achievement_name: result.achievement_name,
            message,
        }
    }
}

fn summary_message(result: &ValidationResult) -> String {
    let (passed, total) = (result.passed_count, result.total_count);
    match (total, result.overall_valid) {
        (0, true) => "Code ran successfully!".to_string(),
        (0, false) => "Your code has errors, please check it".to_string(),
        (_, true) => format!("All tests passed! ({passed}/{total})"),
        (_, false) => format!("Keep going! Passed {passed}/{total} tests"),
    }
}

/// POST /api/code/validate - execute, score, and record any unlocked achievement.
async fn validate_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let grader = state.grader.clone();
    let progress = state.progress.clone();
    let code = request.code.unwrap_or_default();
    let lesson_id = request.lesson_id.unwrap_or_default();

    let result = tokio::task::spawn_blocking(move || {
        let result = grader.validate(&code, &lesson_id)?;
        if let Some(achievement_id) = &result.achievement_id {
            record_unlock(&grader, &user_id, achievement_id);
        }
        if result.lesson_name.is_some() {
            record_progress(&progress, &user_id, &lesson_id, result.overall_valid);
        }
        Ok::<_, SubmissionError>(result)
    })
    .await
    .map_err(|err| ApiError::internal("Code validation failed", err))??;

    Ok(Json(result.into()))
}

/// Unlock failures never fail a validation; the learner still gets the report.
fn record_unlock(grader: &Grader, user_id: &str, achievement_id: &str) {
    match grader.achievements().unlock(user_id, achievement_id) {
        Ok(UnlockOutcome::Unlocked { .. }) => {}
        Ok(UnlockOutcome::AlreadyUnlocked { .. }) => {
            info!(user_id, achievement_id, "achievement already unlocked");
        }
        Ok(UnlockOutcome::NotFound) => {
            warn!(achievement_id, "validated achievement missing from catalog");
        }
        Err(err) => error!(err = %err, user_id, achievement_id, "failed to record unlock"),
    }
}

/// Progress failures never fail a validation either.
fn record_progress(progress: &ProgressLedger, user_id: &str, lesson_id: &str, valid: bool) {
    if let Err(err) = progress.record_attempt(user_id, lesson_id, valid) {
        error!(err = %err, user_id, lesson_id, "failed to record progress");
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CourseSummary {
    id: String,
    name: String,
    checks: Vec<String>,
    achievement_name: Option<String>,
}

/// GET /api/courses - lessons with their check names, in table order.
async fn list_courses(State(state): State<AppState>) -> Json<Vec<CourseSummary>> {
    let courses = state
        .grader
        .rules()
        .lessons()
        .iter()
        .map(|lesson| CourseSummary {
            id: lesson.id.clone(),
            name: lesson.name.clone(),
            checks: lesson.checks.iter().map(|c| c.name.clone()).collect(),
            achievement_name: lesson.achievement.clone(),
        })
        .collect();
    Json(courses)
}

fn require_lesson(state: &AppState, lesson_id: &str) -> Result<(), ApiError> {
    if state.grader.rules().get(lesson_id).is_none() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Course not found"));
    }
    Ok(())
}

/// GET /api/courses/:id/progress - the caller's progress; `not_started` by default.
async fn course_progress(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<LessonProgress>, ApiError> {
    require_lesson(&state, &course_id)?;
    state
        .progress
        .get(&user_id, &course_id)
        .map(Json)
        .map_err(|err| ApiError::internal("Failed to get course progress", err))
}

#[derive(Debug, Serialize)]
struct CompleteResponse {
    success: bool,
    progress: LessonProgress,
}

/// POST /api/courses/:id/complete - mark a lesson completed for the caller.
async fn complete_course(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<CompleteResponse>, ApiError> {
    require_lesson(&state, &course_id)?;
    let progress = state.progress.clone();
    let progress = tokio::task::spawn_blocking(move || progress.mark_completed(&user_id, &course_id))
        .await
        .map_err(|err| ApiError::internal("Failed to complete course", err))?
        .map_err(|err| ApiError::internal("Failed to complete course", err))?;
    Ok(Json(CompleteResponse {
        success: true,
        progress,
    }))
}

/// GET /api/courses/user/:user_id/progress - all progress; callers see only their own.
async fn user_progress(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LessonProgress>>, ApiError> {
    if caller != user_id {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Forbidden"));
    }
    state
        .progress
        .list_for(&user_id)
        .map(Json)
        .map_err(|err| ApiError::internal("Failed to get progress", err))
}

/// GET /api/achievements - full catalog.
async fn list_achievements(State(state): State<AppState>) -> Json<Vec<Achievement>> {
    Json(state.grader.achievements().list())
}

/// GET /api/achievements/user - the caller's unlocked achievements.
async fn user_achievements(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<UnlockedAchievement>>, ApiError> {
    state
        .grader
        .achievements()
        .unlocked_by(&user_id)
        .map(Json)
        .map_err(|err| ApiError::internal("Failed to get user achievements", err))
}

/// POST /api/achievements/:id/unlock - explicit unlock for the caller.
async fn unlock_achievement(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(achievement_id): Path<String>,
) -> Result<Json<UnlockedAchievement>, ApiError> {
    let grader = state.grader.clone();
    let outcome = {
        let achievement_id = achievement_id.clone();
        tokio::task::spawn_blocking(move || grader.achievements().unlock(&user_id, &achievement_id))
            .await
            .map_err(|err| ApiError::internal("Failed to unlock achievement", err))?
            .map_err(|err| ApiError::internal("Failed to unlock achievement", err))?
    };

    let unlocked_at = match outcome {
        UnlockOutcome::Unlocked { unlocked_at } => unlocked_at,
        UnlockOutcome::AlreadyUnlocked { .. } => {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                "Achievement already unlocked",
            ));
        }
        UnlockOutcome::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, "Achievement not found"));
        }
    };

    let achievement = state
        .grader
        .achievements()
        .find_by_id(&achievement_id)
        .map_err(|err| ApiError::internal("Failed to unlock achievement", err))?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Achievement not found"))?;

    Ok(Json(UnlockedAchievement {
        achievement,
        unlocked_at,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "courseId")]
    lesson_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResponse {
    id: String,
    share_token: String,
    share_url: String,
}

/// POST /api/projects/share - publish a read-only snapshot of the caller's code.
async fn share_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, ApiError> {
    let code = request.code.filter(|c| !c.is_empty());
    let lesson_id = request.lesson_id.filter(|l| !l.is_empty());
    let (Some(code), Some(lesson_id)) = (code, lesson_id) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Missing required parameters",
        ));
    };
    require_lesson(&state, &lesson_id)?;

    let shares = state.shares.clone();
    let project = tokio::task::spawn_blocking(move || {
        shares.create(&user_id, &lesson_id, &code, request.title.as_deref())
    })
    .await
    .map_err(|err| ApiError::internal("Failed to create share", err))?
    .map_err(|err| ApiError::internal("Failed to create share", err))?;

    Ok(Json(ShareResponse {
        share_url: format!("{}/share/{}", state.public_url, project.share_token),
        id: project.id,
        share_token: project.share_token,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SharedProjectView {
    #[serde(flatten)]
    project: SharedProject,
    course_name: Option<String>,
}

impl SharedProjectView {
    fn new(state: &AppState, project: SharedProject) -> Self {
        let course_name = state
            .grader
            .rules()
            .get(&project.lesson_id)
            .map(|lesson| lesson.name.clone());
        Self {
            project,
            course_name,
        }
    }
}

/// GET /api/projects/share/:token - a shared snapshot. No authentication.
async fn shared_project(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
) -> Result<Json<SharedProjectView>, ApiError> {
    let project = state
        .shares
        .get(&share_token)
        .map_err(|err| ApiError::internal("Failed to get share", err))?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Project not found"))?;
    Ok(Json(SharedProjectView::new(&state, project)))
}

/// GET /api/projects/user/projects - the caller's snapshots, newest first.
async fn user_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<SharedProjectView>>, ApiError> {
    let projects = state
        .shares
        .list_for(&user_id)
        .map_err(|err| ApiError::internal("Failed to get user projects", err))?;
    Ok(Json(
        projects
            .into_iter()
            .map(|project| SharedProjectView::new(&state, project))
            .collect(),
    ))
}

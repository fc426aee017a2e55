use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use crate::db::{FeedQuery, NewPost};
use crate::error::JambleError;
use crate::handlers::{Pagination, parse_id};
use crate::middleware::{AuthUser, JsonBody, QueryParams};
use crate::router::JambleState;
use crate::types::{FeedPost, Post, PostId, PostType, UserId, validate};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePostRequest {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub user_id: Option<String>,
}

/// Fetch a post and make sure `caller` owns it.
async fn owned_post(
    state: &JambleState,
    id: PostId,
    caller: UserId,
) -> Result<Post, JambleError> {
    let post = state
        .posts
        .get(id)
        .await?
        .ok_or(JambleError::NotFound("post"))?;
    if post.user_id != caller {
        return Err(JambleError::Forbidden(
            "You can only modify your own posts".to_string(),
        ));
    }
    Ok(post)
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, JambleError> {
    let (Some(content), Some(post_type), Some(reference_id)) = (
        req.content.as_deref(),
        req.post_type.as_deref(),
        req.reference_id.as_deref(),
    ) else {
        return Err(JambleError::validation(
            "All fields are required: content, type, reference_id",
        ));
    };
    let new = NewPost {
        content: validate::post_content(content)?,
        post_type: post_type.trim().parse::<PostType>().map_err(JambleError::Validation)?,
        reference_id: validate::reference_id(reference_id)?,
    };

    let post = state.posts.create(user_id, new).await?;
    info!(user_id = %user_id, post_id = %post.id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<JambleState>,
    AuthUser(_): AuthUser,
    QueryParams(params): QueryParams<FeedParams>,
) -> Result<Json<Vec<FeedPost>>, JambleError> {
    let (limit, offset) = Pagination {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve()?;
    let author = params.user_id.as_deref().map(parse_id).transpose()?;
    let posts = state
        .posts
        .feed(FeedQuery {
            author,
            limit,
            offset,
        })
        .await?;
    Ok(Json(posts))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<JambleState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Post>, JambleError> {
    let post = state
        .posts
        .get(parse_id(&id)?)
        .await?
        .ok_or(JambleError::NotFound("post"))?;
    Ok(Json(post))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> Result<Json<Post>, JambleError> {
    let id = parse_id(&id)?;
    owned_post(&state, id, user_id).await?;
    let content = validate::post_content(req.content.as_deref().unwrap_or_default())?;
    let post = state
        .posts
        .update_content(id, &content)
        .await?
        .ok_or(JambleError::NotFound("post"))?;
    Ok(Json(post))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, JambleError> {
    let id = parse_id(&id)?;
    owned_post(&state, id, user_id).await?;
    if !state.posts.delete_owned(id, user_id).await? {
        return Err(JambleError::NotFound("post"));
    }
    info!(user_id = %user_id, post_id = %id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

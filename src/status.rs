use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;

/// Every response the gateway can give, success or failure, has a fixed
/// status code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    Conflict,
    FailedFileSave,
    InternalServerError,
}

impl Outcome {
    pub const fn status(self) -> StatusCode {
        match self {
            Outcome::Created => StatusCode::CREATED,
            Outcome::Unauthorized => StatusCode::UNAUTHORIZED,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::Conflict => StatusCode::CONFLICT,
            Outcome::FailedFileSave | Outcome::InternalServerError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Outcome::Created => "ファイルのアップロードが完了しました",
            Outcome::Unauthorized => "APIキーで認証する必要があります",
            Outcome::NotFound => "指定したファイルは見当たりませんでした",
            Outcome::MethodNotAllowed => "PUT以外の操作を行なうことはできません",
            Outcome::Conflict => "同名のファイルが既に存在します。別の名前を検討してください",
            Outcome::FailedFileSave => "ファイルの保存に失敗しました",
            Outcome::InternalServerError => {
                "不明なエラーが発生しました。運営者に問い合わせてください"
            }
        }
    }
}

/// Wire envelope shared by every JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JsonResponse {
    pub status: u16,
    pub message: &'static str,
}

impl From<Outcome> for JsonResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            status: outcome.status().as_u16(),
            message: outcome.message(),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        (self.status(), Json(JsonResponse::from(self))).into_response()
    }
}

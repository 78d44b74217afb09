use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{pagination::Pagination, stats::StatsData};

/// The success envelope shared by every single-resource and message response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    timestamp: jiff::Timestamp,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            timestamp: jiff::Timestamp::now(),
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self { status: StatusCode::CREATED, ..Self::ok(data) }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            timestamp: jiff::Timestamp::now(),
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// `GET /movies`: page numbering with `pageSize`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    success: bool,
    page: u64,
    page_size: u64,
    count: usize,
    data: Vec<T>,
    timestamp: jiff::Timestamp,
}

impl<T> PageResponse<T> {
    pub fn new(page: Pagination, data: Vec<T>) -> Self {
        Self {
            success: true,
            page: page.page,
            page_size: page.page_size,
            count: data.len(),
            data,
            timestamp: jiff::Timestamp::now(),
        }
    }
}

/// `GET /movies/page`: page numbering with `limit` and the derived offset.
#[derive(Debug, Serialize)]
pub struct OffsetPageResponse<T> {
    success: bool,
    page: u64,
    limit: u64,
    offset: u64,
    count: usize,
    data: Vec<T>,
    timestamp: jiff::Timestamp,
}

impl<T> OffsetPageResponse<T> {
    pub fn new(page: Pagination, data: Vec<T>) -> Self {
        Self {
            success: true,
            page: page.page,
            limit: page.page_size,
            offset: page.offset(),
            count: data.len(),
            data,
            timestamp: jiff::Timestamp::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    success: bool,
    grouped_by: &'static str,
    data: StatsData,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    timestamp: jiff::Timestamp,
}

impl StatsResponse {
    pub fn new(grouped_by: &'static str, data: StatsData) -> Self {
        Self {
            success: true,
            grouped_by,
            count: data.group_count(),
            data,
            timestamp: jiff::Timestamp::now(),
        }
    }
}

impl<T: Serialize> IntoResponse for PageResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> IntoResponse for OffsetPageResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for StatsResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stats::{Dimension, GroupCount, GroupKey};

    #[test]
    fn offset_page_reports_derived_offset() {
        let body = OffsetPageResponse::new(Pagination { page: 3, page_size: 10 }, vec![1, 2]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["offset"], 20);
        assert_eq!(value["limit"], 10);
        assert_eq!(value["count"], 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn stats_envelope_counts_groups() {
        let data = StatsData::Groups(vec![GroupCount {
            dimension: Dimension::Genre,
            key: GroupKey::Text("Action".into()),
            count: 2,
        }]);
        let value = serde_json::to_value(StatsResponse::new("genre", data)).unwrap();
        assert_eq!(value["groupedBy"], "genre");
        assert_eq!(value["count"], 1);
        assert_eq!(value["data"], json!([{"genre": "Action", "count": 2}]));
    }

    #[test]
    fn message_only_response_omits_data() {
        let value = serde_json::to_value(ApiResponse::message("Movie deleted")).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("data").is_none());
    }
}

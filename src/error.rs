//! Error taxonomy for the integration layer.
//!
//! Only [`Error::NotFound`] is intercepted at the HTTP boundary and turned
//! into a 404 response. Everything coming out of the driver crosses this
//! layer unchanged through [`Error::Database`].

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or malformed configuration at initialization. Fatal, no retry.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The same extension instance was initialized twice on one application.
    #[error("extension already initialized on this application")]
    AlreadyInitialized,

    /// A connection was looked up before `init_app` ran on this application.
    #[error("extension is not initialized on this application")]
    NotInitialized,

    /// A query expected to yield a document yielded none.
    #[error("{}", message.as_deref().unwrap_or("document not found"))]
    NotFound { message: Option<String> },

    /// A query expected to yield exactly one document matched several.
    #[error("query matched more than one document")]
    MultipleResultsFound,

    /// Rejected pagination input. `page` must be >= 1 and `per_page` > 0.
    #[error("invalid pagination parameters: page={page}, per_page={per_page}")]
    InvalidPagination { page: u64, per_page: u64 },

    /// Any other failure from the driver, propagated unchanged.
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

impl Error {
    pub fn not_found() -> Self {
        Self::NotFound { message: None }
    }

    pub fn not_found_msg(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: Some(message.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "axum")]
mod http {
    use super::Error;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};

    impl IntoResponse for Error {
        fn into_response(self) -> Response {
            match self {
                Error::NotFound { message } => (
                    StatusCode::NOT_FOUND,
                    message.unwrap_or_else(|| "Not Found".to_owned()),
                )
                    .into_response(),
                // A page number past any representable range is a miss from
                // the client's point of view.
                Error::InvalidPagination { .. } => {
                    (StatusCode::NOT_FOUND, "Not Found".to_owned()).into_response()
                }
                other => {
                    tracing::error!(error = %other, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_owned(),
                    )
                        .into_response()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn not_found_message_is_optional() {
        assert_eq!(Error::not_found().to_string(), "document not found");
        assert_eq!(
            Error::not_found_msg("no such ticket").to_string(),
            "no such ticket"
        );
        assert!(Error::not_found().is_not_found());
        assert!(!Error::MultipleResultsFound.is_not_found());
    }

    #[cfg(feature = "axum")]
    mod http {
        use crate::error::Error;
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        #[tokio::test]
        async fn not_found_renders_404_with_message() {
            let response = Error::not_found_msg("no such ticket").into_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);

            let body = axum::body::to_bytes(response.into_body(), 1024)
                .await
                .unwrap();
            assert_eq!(&body[..], b"no such ticket");
        }

        #[tokio::test]
        async fn invalid_pagination_renders_404() {
            let response = Error::InvalidPagination {
                page: 0,
                per_page: 10,
            }
            .into_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        #[tokio::test]
        async fn other_errors_render_500() {
            let response = Error::AlreadyInitialized.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

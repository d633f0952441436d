use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AsHeaderName, HeaderMap, REFERER, USER_AGENT};
use axum::http::request::Parts;
use wormhole_core::ClickMeta;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Request metadata attached to a recorded click.
///
/// The client address is the first `X-Forwarded-For` entry if present,
/// otherwise the socket peer when the server runs with connect info.
#[derive(Debug, Clone, Default)]
pub struct ClickContext(pub ClickMeta);

fn header_value(headers: &HeaderMap, name: impl AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_value(headers, X_FORWARDED_FOR)?
        .split(',')
        .map(str::trim)
        .find(|hop| !hop.is_empty())
        .map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for ClickContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let client_address = forwarded_for(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(ClickContext(ClickMeta {
            referrer: header_value(&parts.headers, REFERER),
            user_agent: header_value(&parts.headers, USER_AGENT),
            client_address,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> ClickMeta {
        let (mut parts, _) = request.into_parts();
        let ClickContext(meta) = ClickContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        meta
    }

    #[tokio::test]
    async fn reads_headers_and_first_forwarded_hop() {
        let request = Request::builder()
            .header(REFERER, "https://news.example/post")
            .header(USER_AGENT, "curl/8.0")
            .header(X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();

        let meta = extract(request).await;
        assert_eq!(meta.referrer.as_deref(), Some("https://news.example/post"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.client_address.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let mut request = Request::builder().body(()).unwrap();
        let peer: SocketAddr = "198.51.100.2:51234".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        let meta = extract(request).await;
        assert_eq!(meta.client_address.as_deref(), Some("198.51.100.2"));
        assert_eq!(meta.referrer, None);
    }

    #[tokio::test]
    async fn missing_everything_is_empty() {
        let meta = extract(Request::builder().body(()).unwrap()).await;
        assert_eq!(meta, ClickMeta::default());
    }
}

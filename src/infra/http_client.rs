use crate::app::ports::HttpFetcher;
use crate::common::error::{Result, ScraperError};
use crate::config::HttpConfig;
use crate::url_guard;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const MAX_REDIRECTS: usize = 5;

/// Redirects are never followed by reqwest itself. `get_text` walks them so
/// every hop goes through the URL guard, DNS check included.
fn client_builder(config: &HttpConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .redirect(Policy::none())
}

/// Where a redirect response points, resolved against the URL that sent it.
fn redirect_target(current: &Url, resp: &reqwest::Response) -> Result<Url> {
    let location = resp
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ScraperError::Status {
            url: current.to_string(),
            status: resp.status().as_u16(),
        })?;
    current
        .join(location.trim())
        .map_err(|_| ScraperError::UnsafeUrl(location.trim().to_string()))
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    resolve_hosts: bool,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = client_builder(config).build()?;
        Ok(Self {
            client,
            resolve_hosts: config.resolve_hosts,
        })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(skip(self))]
    async fn get_text(&self, url: &str) -> Result<String> {
        let mut current = Url::parse(url).map_err(|_| ScraperError::UnsafeUrl(url.to_string()))?;
        let mut hops = 0usize;
        let resp = loop {
            let resp = self.client.get(current.clone()).send().await?;
            if !resp.status().is_redirection() {
                break resp;
            }
            hops += 1;
            if hops > MAX_REDIRECTS {
                warn!(hops, url = %current, "too many redirects");
                return Err(ScraperError::Status {
                    url: current.to_string(),
                    status: resp.status().as_u16(),
                });
            }
            let next = redirect_target(&current, &resp)?;
            url_guard::check_fetchable(&next, self.resolve_hosts).await?;
            debug!(from = %current, to = %next, "following redirect");
            current = next;
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                url: current.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().await?;
        debug!(bytes = body.len(), "fetched page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Redirect;
    use axum::routing::get;
    use axum::Router;

    /// Serves `app` on a loopback port. Only the first request targets it
    /// directly, so the guard still applies to every redirect hop.
    fn serve(app: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = hyper::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    fn fetcher(resolve_hosts: bool) -> ReqwestFetcher {
        let config = HttpConfig {
            resolve_hosts,
            ..HttpConfig::default()
        };
        ReqwestFetcher {
            client: client_builder(&config).no_proxy().build().unwrap(),
            resolve_hosts,
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "hello" }))
            .route("/missing", get(|| async { (axum::http::StatusCode::NOT_FOUND, "gone") }))
            .route("/to-localhost", get(|| async { Redirect::temporary("http://localhost./admin") }))
            .route("/to-metadata", get(|| async { Redirect::permanent("http://169.254.169.254/latest/") }))
            .route("/relative", get(|| async { Redirect::to("/ok") }))
    }

    #[test]
    fn builds_from_default_config() {
        assert!(ReqwestFetcher::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn plain_responses_are_returned() {
        let base = serve(app());
        let body = fetcher(false).get_text(&format!("{}/ok", base)).await.unwrap();
        assert_eq!(body, "hello");

        let err = fetcher(false)
            .get_text(&format!("{}/missing", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn redirect_to_trailing_dot_localhost_is_refused() {
        let base = serve(app());
        for resolve_hosts in [false, true] {
            let err = fetcher(resolve_hosts)
                .get_text(&format!("{}/to-localhost", base))
                .await
                .unwrap_err();
            assert!(err.is_security_rejection(), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn redirect_hops_are_guarded_like_scraped_links() {
        let base = serve(app());
        let err = fetcher(true)
            .get_text(&format!("{}/to-metadata", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::UnsafeUrl(ref u) if u.contains("169.254.169.254")));

        // relative hops resolve against the loopback origin and are refused too
        let err = fetcher(false)
            .get_text(&format!("{}/relative", base))
            .await
            .unwrap_err();
        assert!(err.is_security_rejection());
    }
}

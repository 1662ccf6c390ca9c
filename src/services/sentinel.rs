use std::time::Duration;

use reqwest::Client;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub main: bool,
    pub alt: bool,
}

impl ServerStatus {
    pub fn any_up(&self) -> bool {
        self.main || self.alt
    }
}

/// Checks whether the search servers answer at all before a suite runs.
pub struct Sentinel {
    client: Client,
    main_url: String,
    alt_url: String,
}

impl Sentinel {
    pub fn new(main_url: &str, alt_url: &str) -> Self {
        let client = Client::builder()
            .timeout(CHECK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {:?}", e);
                Client::new()
            });

        Sentinel {
            client,
            main_url: main_url.to_string(),
            alt_url: alt_url.to_string(),
        }
    }

    /// Any HTTP answer below 500 counts as up.
    pub async fn is_up(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(res) => {
                let status = res.status();
                log::info!("{} answered with {}", url, status);
                !status.is_server_error()
            }
            Err(e) => {
                log::warn!("{} is unreachable: {}", url, e);
                false
            }
        }
    }

    pub async fn check_servers(&self) -> ServerStatus {
        let main = self.is_up(&self.main_url).await;
        let alt = self.is_up(&self.alt_url).await;

        log::info!(
            "Main server: {}, Alternative server: {}",
            if main { "UP" } else { "DOWN" },
            if alt { "UP" } else { "DOWN" }
        );
        ServerStatus { main, alt }
    }

    /// The first server that answers, main before alternate.
    pub fn active_url(&self, status: &ServerStatus) -> Option<&str> {
        match (status.main, status.alt) {
            (true, _) => Some(&self.main_url),
            (false, true) => Some(&self.alt_url),
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const REFUSED: &str = "http://localhost:59995";

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status).set_body_string("ok"))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn answering_server_is_up() {
        let server = server_answering(200).await;
        let sentinel = Sentinel::new(&server.uri(), REFUSED);

        assert!(sentinel.is_up(&server.uri()).await);
    }

    #[tokio::test]
    async fn client_error_still_counts_as_up() {
        let server = server_answering(404).await;
        let sentinel = Sentinel::new(&server.uri(), REFUSED);

        assert!(sentinel.is_up(&server.uri()).await);
    }

    #[tokio::test]
    async fn server_error_is_down() {
        let server = server_answering(503).await;
        let sentinel = Sentinel::new(&server.uri(), REFUSED);

        assert!(!sentinel.is_up(&server.uri()).await);
    }

    #[tokio::test]
    async fn refused_connection_is_down() {
        let sentinel = Sentinel::new(REFUSED, REFUSED);

        assert!(!sentinel.is_up(REFUSED).await);
    }

    #[tokio::test]
    async fn falls_back_to_alternate() {
        let alt = server_answering(200).await;
        let sentinel = Sentinel::new(REFUSED, &alt.uri());

        let status = sentinel.check_servers().await;

        assert_eq!(status, ServerStatus { main: false, alt: true });
        assert_eq!(sentinel.active_url(&status), Some(alt.uri().as_str()));
    }

    #[tokio::test]
    async fn main_wins_when_both_are_up() {
        let main = server_answering(200).await;
        let alt = server_answering(200).await;
        let sentinel = Sentinel::new(&main.uri(), &alt.uri());

        let status = sentinel.check_servers().await;

        assert_eq!(sentinel.active_url(&status), Some(main.uri().as_str()));
    }

    #[test]
    fn both_down_has_no_active_url() {
        let sentinel = Sentinel::new("http://a", "http://b");
        let status = ServerStatus {
            main: false,
            alt: false,
        };

        assert!(!status.any_up());
        assert_eq!(sentinel.active_url(&status), None);
    }
}

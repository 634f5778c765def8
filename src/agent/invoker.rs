//! Agent 调用器：对单个 Agent 发起一次带截止时间的 POST
//!
//! 所有失败都转为 AgentResponse 里的 InvokeError，不向调用方抛出：
//! - URL 校验失败 / 请求体编码失败：直接返回，不发起网络请求
//! - 连接失败、超时：transport-failure，且不会去读取不存在的响应体
//!
//! 每次调用单独构建 reqwest::Client，超时配置与连接失败互不影响。
//!
//! 当前的 SnakeRequest 只含字符串、整数与数组，编码实际不会失败；
//! serialization-failure 分支保留给请求体扩展后可能出现的不可编码字段。

use std::net::IpAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::agent::request::build_snake_request;
use crate::core::{Deadline, Expired, InvokeError};
use crate::model::{Game, GameTick, Snake};

/// 一个 Agent 在本回合的结果：原始响应体或错误
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub snake: Snake,
    /// HTTP 状态码（仅在收到响应时存在）
    pub status: Option<u16>,
    pub result: Result<Bytes, InvokeError>,
    pub elapsed: Duration,
}

impl AgentResponse {
    pub fn failed(snake: Snake, err: InvokeError, elapsed: Duration) -> Self {
        Self {
            snake,
            status: None,
            result: Err(err),
            elapsed,
        }
    }

    pub fn snake_id(&self) -> &str {
        &self.snake.id
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&InvokeError> {
        self.result.as_ref().err()
    }
}

/// 校验 Agent 根地址：必须能解析、http/https、带主机名
pub fn parse_agent_url(raw: &str) -> Result<Url, InvokeError> {
    let url = Url::parse(raw.trim()).map_err(|_| InvokeError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(InvokeError::InvalidUrl(raw.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(InvokeError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// `<base>/<path>`，两侧多余的 `/` 会被去掉
pub fn agent_endpoint(base: &Url, path: &str) -> Result<Url, InvokeError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|_| InvokeError::InvalidUrl(joined))
}

/// 调用 `snake.url` 下的 `path`；请求体为对局 + 回合 + 自身身份
pub async fn invoke(
    path: &str,
    snake: &Snake,
    game: &Game,
    tick: &GameTick,
    deadline: &Deadline,
) -> AgentResponse {
    let started = Instant::now();
    let outcome = call(path, snake, game, tick, deadline).await;
    let elapsed = started.elapsed();

    match outcome {
        Ok((status, body)) => {
            tracing::debug!(
                snake_id = %snake.id,
                path,
                status,
                bytes = body.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "agent responded"
            );
            AgentResponse {
                snake: snake.clone(),
                status: Some(status),
                result: Ok(body),
                elapsed,
            }
        }
        Err(e) => {
            match &e {
                InvokeError::Serialization(_) => {
                    tracing::error!(snake_id = %snake.id, error = %e, "error while encoding snake request");
                }
                _ => {
                    tracing::warn!(
                        snake_id = %snake.id,
                        url = %snake.url,
                        path,
                        error = %e,
                        "error POSTing to snake"
                    );
                }
            }
            AgentResponse::failed(snake.clone(), e, elapsed)
        }
    }
}

async fn call(
    path: &str,
    snake: &Snake,
    game: &Game,
    tick: &GameTick,
    deadline: &Deadline,
) -> Result<(u16, Bytes), InvokeError> {
    let base = parse_agent_url(&snake.url)?;
    let endpoint = agent_endpoint(&base, path)?;

    let body = encode_request(&build_snake_request(game, tick, snake))?;

    let remaining = deadline.remaining();
    if remaining.is_zero() || deadline.is_expired() {
        return Err(InvokeError::timeout("deadline expired before dispatch"));
    }

    let mut builder = Client::builder().timeout(remaining);
    if is_loopback(&endpoint) {
        // 本机 Agent 不走环境变量里的代理
        builder = builder.no_proxy();
    }
    let client = builder
        .build()
        .map_err(|e| InvokeError::transport(format!("client build: {}", e)))?;

    let exchange = async {
        let resp = client
            .post(endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        // 只有请求成功才读取响应体
        let status = resp.status().as_u16();
        let data = resp.bytes().await.map_err(map_reqwest_error)?;
        Ok::<_, InvokeError>((status, data))
    };

    match deadline.run(exchange).await {
        Ok(res) => res,
        Err(Expired::TimedOut) => Err(InvokeError::timeout(format!(
            "no response within {:?}",
            remaining
        ))),
        Err(Expired::Cancelled) => Err(InvokeError::transport("call cancelled")),
    }
}

/// 编码请求体；失败映射为 serialization-failure
pub fn encode_request<T: Serialize>(request: &T) -> Result<Vec<u8>, InvokeError> {
    serde_json::to_vec(request).map_err(|e| InvokeError::Serialization(e.to_string()))
}

fn is_loopback(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .map_or(false, |ip| ip.is_loopback())
}

fn map_reqwest_error(e: reqwest::Error) -> InvokeError {
    if e.is_timeout() {
        InvokeError::timeout(e.to_string())
    } else {
        InvokeError::transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(url: &str) -> (Game, GameTick, Snake) {
        let snake = Snake::new("s1", url, "one");
        let game = Game {
            id: "g".into(),
            width: 11,
            height: 11,
            snakes: vec![snake.clone()],
        };
        let tick = GameTick::initial(&game, vec![]);
        (game, tick, snake)
    }

    #[test]
    fn test_parse_agent_url() {
        assert!(parse_agent_url("http://127.0.0.1:8080").is_ok());
        assert!(parse_agent_url("https://snake.example.com/api").is_ok());
        assert!(parse_agent_url("").is_err());
        assert!(parse_agent_url("not a url").is_err());
        assert!(parse_agent_url("ftp://example.com").is_err());
        assert!(parse_agent_url("127.0.0.1:8080").is_err());
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("board contains a NaN coordinate"))
        }
    }

    #[test]
    fn test_encode_request_failure_is_tagged() {
        let err = encode_request(&Unencodable).unwrap_err();
        assert_eq!(err.tag(), "serialization-failure");
        assert!(err.to_string().contains("NaN coordinate"));

        let (game, tick, snake) = fixture("http://127.0.0.1:1");
        let body = encode_request(&build_snake_request(&game, &tick, &snake)).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["you"]["id"], "s1");
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback(&parse_agent_url("http://127.0.0.1:9").unwrap()));
        assert!(is_loopback(&parse_agent_url("http://localhost:9").unwrap()));
        assert!(is_loopback(&parse_agent_url("http://[::1]:9").unwrap()));
        assert!(!is_loopback(&parse_agent_url("http://snake.example.com").unwrap()));
    }

    #[test]
    fn test_agent_endpoint_joins_slashes() {
        let base = parse_agent_url("http://localhost:9000/api/").unwrap();
        assert_eq!(
            agent_endpoint(&base, "/move").unwrap().as_str(),
            "http://localhost:9000/api/move"
        );
        let base = parse_agent_url("http://localhost:9000").unwrap();
        assert_eq!(
            agent_endpoint(&base, "start").unwrap().as_str(),
            "http://localhost:9000/start"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_short_circuits() {
        let (game, tick, snake) = fixture("::bogus::");
        let deadline = Deadline::after(Duration::from_millis(100));
        let resp = invoke("move", &snake, &game, &tick, &deadline).await;
        assert_eq!(resp.error().map(|e| e.tag()), Some("invalid-url"));
        assert_eq!(resp.status, None);
        assert!(resp.elapsed < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        // 绑定后立即释放端口，连接会被拒绝
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (game, tick, snake) = fixture(&format!("http://127.0.0.1:{}", port));
        let deadline = Deadline::after(Duration::from_millis(500));
        let resp = invoke("move", &snake, &game, &tick, &deadline).await;
        assert_eq!(resp.error().map(|e| e.tag()), Some("transport-failure"));
        assert!(resp.data().is_none());
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_network() {
        let (game, tick, snake) = fixture("http://127.0.0.1:1");
        let deadline = Deadline::after(Duration::from_millis(100));
        deadline.cancel();
        let resp = invoke("move", &snake, &game, &tick, &deadline).await;
        assert!(resp.error().unwrap().is_timeout());
    }
}
